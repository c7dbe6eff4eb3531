use reqwest::{StatusCode, header::CONTENT_TYPE};
use serde::Serialize;
use tracing::debug;

use crate::errors::{Error, Result};

/// POST `payload` as JSON to `uri`.
///
/// Uses `client` when given, otherwise a default client. The response is returned unread along
/// with its status; non-2xx statuses are not errors.
pub async fn push_json<T: Serialize + ?Sized>(
    uri: &str,
    payload: &T,
    client: Option<&reqwest::Client>,
) -> Result<(reqwest::Response, StatusCode)> {
    let body = serde_json::to_vec(payload).map_err(Error::Serialization)?;

    let default_client;
    let client = match client {
        Some(client) => client,
        None => {
            default_client = reqwest::Client::new();
            &default_client
        }
    };

    let response = client
        .post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| Error::io(format!("push JSON to {uri}"), e))?;

    let status = response.status();
    debug!(uri = %uri, status = %status, "Pushed JSON payload");
    Ok((response, status))
}
