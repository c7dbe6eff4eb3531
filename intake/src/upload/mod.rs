//! Multipart upload ingestion.
//!
//! [`ingest`] reads a whole `multipart/form-data` request under a combined size ceiling, then
//! writes each file part into a target directory after checking its sniffed content type against
//! an allow-list. Parts are handled strictly in the order the client sent them.

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use bon::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::errors::{Error, Result};

pub mod form;
pub mod sniff;
mod store;

pub use form::{FormFile, MultipartForm};
pub use store::ensure_dir;

/// Default combined size ceiling for an upload form: 1 GiB.
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 1024 * 1024 * 1024;

/// Rules applied to every ingestion call.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadPolicy {
    /// Ceiling on the combined size of all parts of one form, in bytes
    #[builder(default = DEFAULT_MAX_TOTAL_BYTES)]
    pub max_total_bytes: u64,
    /// Sniffed content types accepted for storage. Empty accepts everything.
    #[builder(default)]
    pub allowed_content_types: Vec<String>,
    /// Store under a random name (keeping the extension) instead of the client's name
    #[builder(default = true)]
    pub rename_on_store: bool,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl UploadPolicy {
    /// Whether a sniffed content type passes the allow-list.
    ///
    /// Entries match case-insensitively against either the full sniffed value
    /// (`text/plain; charset=utf-8`) or its essence (`text/plain`).
    pub fn allows(&self, content_type: &str) -> bool {
        if self.allowed_content_types.is_empty() {
            return true;
        }
        let essence = sniff::essence(content_type);
        self.allowed_content_types
            .iter()
            .map(|allowed| allowed.trim())
            .any(|allowed| allowed.eq_ignore_ascii_case(content_type) || allowed.eq_ignore_ascii_case(essence))
    }
}

/// A file that was written to the target directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadedFile {
    /// Name of the file inside the target directory
    pub stored_name: String,
    /// Client-supplied name, reduced to its final path component
    pub original_name: String,
    pub size_bytes: u64,
}

/// A failed ingestion, with the files already written before the failure.
#[derive(Debug, ThisError)]
#[error("{error}")]
pub struct IngestFailure {
    pub stored: Vec<UploadedFile>,
    pub error: Error,
}

impl From<Error> for IngestFailure {
    fn from(error: Error) -> Self {
        Self {
            stored: Vec::new(),
            error,
        }
    }
}

impl From<IngestFailure> for Error {
    fn from(failure: IngestFailure) -> Self {
        failure.error
    }
}

/// Ingest every file part of `multipart` into `target_dir`.
///
/// The directory is created if needed and the whole form is parsed (enforcing
/// `max_total_bytes`) before any file is written. On failure the records of files already
/// stored are returned alongside the error; those files stay on disk.
pub async fn ingest(
    multipart: Multipart,
    target_dir: impl AsRef<Path>,
    policy: &UploadPolicy,
) -> std::result::Result<Vec<UploadedFile>, IngestFailure> {
    let target_dir = target_dir.as_ref();
    ensure_dir(target_dir).await?;
    let form = MultipartForm::parse(multipart, policy.max_total_bytes).await?;
    ingest_form(form, target_dir, policy).await
}

/// Ingest the single file of `multipart`, failing with `NoFileProvided` if there is none.
///
/// Every file part is processed; when several are sent, the first record is returned.
pub async fn ingest_one(multipart: Multipart, target_dir: impl AsRef<Path>, policy: &UploadPolicy) -> Result<UploadedFile> {
    let stored = ingest(multipart, target_dir, policy).await?;
    stored.into_iter().next().ok_or(Error::NoFileProvided)
}

/// Persist an already-parsed form. All blocking file I/O runs on one blocking task.
pub async fn ingest_form(
    form: MultipartForm,
    target_dir: impl AsRef<Path>,
    policy: &UploadPolicy,
) -> std::result::Result<Vec<UploadedFile>, IngestFailure> {
    let target_dir: PathBuf = target_dir.as_ref().to_path_buf();
    let policy = policy.clone();
    let files = form.into_files();

    tracing::debug!(parts = files.len(), dir = %target_dir.display(), "Ingesting upload form");

    let task = tokio::task::spawn_blocking(move || {
        let mut stored = Vec::with_capacity(files.len());
        for mut part in files {
            match store::store_part(&mut part, &target_dir, &policy) {
                Ok(record) => stored.push(record),
                Err(error) => return Err(IngestFailure { stored, error }),
            }
        }
        Ok(stored)
    });

    match task.await {
        Ok(result) => result,
        Err(join_err) => Err(Error::io("join upload task", join_err).into()),
    }
}
