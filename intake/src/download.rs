//! Forced downloads of files on disk.

use std::path::Path;

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, header},
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::errors::{Error, Result};

/// Serve the file at `path` as an attachment named `display_name`.
///
/// Content type, ranges and conditional requests are handled by `ServeFile`. A missing file
/// yields its `404` response, without the attachment header.
pub async fn download_static_file(request: Request, path: impl AsRef<Path>, display_name: &str) -> Result<Response> {
    let disposition = content_disposition(display_name)?;

    let response = ServeFile::new(path.as_ref())
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    let mut response = response.map(Body::new);

    if response.status().is_success() {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}

fn content_disposition(display_name: &str) -> Result<HeaderValue> {
    let cleaned: String = display_name
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{cleaned}\""))
        .map_err(|_| Error::invalid_input(format!("file name {display_name:?} cannot be used in a header")))
}
