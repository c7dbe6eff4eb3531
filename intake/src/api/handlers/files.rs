use axum::{
    Json,
    extract::{Multipart, Path, Request, State},
    http::StatusCode,
    response::Response,
};

use crate::AppState;
use crate::download::download_static_file;
use crate::errors::{Error, Result};
use crate::json::{self, Envelope};
use crate::upload::{self, IngestFailure, UploadedFile};

/// Store every file part of the form. Responds `201` with the stored records.
///
/// If a later part fails after earlier ones were written, the error envelope carries the records
/// that were stored in its `data` field.
pub async fn upload_files(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    match upload::ingest(multipart, &state.config.upload_dir, &state.config.uploads).await {
        Ok(stored) => {
            tracing::info!(files = stored.len(), "Upload completed");
            json::encode(StatusCode::CREATED, &stored, None)
        }
        Err(IngestFailure { stored, error }) if !stored.is_empty() => {
            tracing::warn!(
                stored = stored.len(),
                error = %error,
                "Upload failed after storing some files"
            );
            let data = serde_json::to_value(&stored).map_err(Error::Serialization)?;
            let envelope = Envelope::error(error.user_message()).with_data(data);
            json::encode(error.status_code(), &envelope, None)
        }
        Err(failure) => Err(failure.into()),
    }
}

/// Store the single file of the form. Responds `201` with its record.
pub async fn upload_one(State(state): State<AppState>, multipart: Multipart) -> Result<(StatusCode, Json<UploadedFile>)> {
    let stored = upload::ingest_one(multipart, &state.config.upload_dir, &state.config.uploads).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Download a stored file as an attachment.
pub async fn download_file(State(state): State<AppState>, Path(name): Path<String>, request: Request) -> Result<Response> {
    if !is_plain_file_name(&name) {
        return Err(Error::invalid_input(format!("invalid file name {name:?}")));
    }

    let path = state.config.upload_dir.join(&name);
    tracing::debug!(file = %name, path = %path.display(), "Serving download");
    download_static_file(request, path, &name).await
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
