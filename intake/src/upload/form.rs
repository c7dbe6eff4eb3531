//! Multipart form parsing with a combined size ceiling.
//!
//! The whole form is read before anything is written to the target directory, so an oversized
//! request is rejected before any file is created. File parts are spooled (memory first, then a
//! temporary file) so they can be sniffed and then copied from the start. The memory budget is
//! shared by the whole form: once earlier parts have used it up, later parts go straight to disk.

use std::io::Write;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use tempfile::SpooledTempFile;

use crate::errors::{Error, Result};

/// Bytes of a form's file parts kept in memory, in total, before spooling to temporary files.
pub const SPOOL_MEMORY_BYTES: usize = 32 * 1024 * 1024;

/// A file part of a parsed form.
#[derive(Debug)]
pub struct FormFile {
    pub(super) field_name: String,
    pub(super) file_name: String,
    pub(super) size_bytes: u64,
    pub(super) content: SpooledTempFile,
}

impl FormFile {
    /// Build a part from bytes already in hand. `file_name` is reduced to its final component.
    pub fn from_bytes(field_name: impl Into<String>, file_name: &str, bytes: &[u8]) -> Result<Self> {
        let mut content = SpooledTempFile::new(SPOOL_MEMORY_BYTES);
        content.write_all(bytes).map_err(|e| Error::io("spool form file", e))?;
        Ok(Self {
            field_name: field_name.into(),
            file_name: base_name(file_name)?,
            size_bytes: bytes.len() as u64,
            content,
        })
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Client-supplied file name with any directory components removed
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// File parts of a multipart request, in the order the client sent them.
#[derive(Debug, Default)]
pub struct MultipartForm {
    files: Vec<FormFile>,
}

impl MultipartForm {
    /// Read every part of `multipart`, failing with `PayloadTooLarge` as soon as the combined
    /// size of all parts (file and text) exceeds `max_total_bytes`.
    pub async fn parse(multipart: Multipart, max_total_bytes: u64) -> Result<Self> {
        Self::parse_with_memory_budget(multipart, max_total_bytes, SPOOL_MEMORY_BYTES).await
    }

    async fn parse_with_memory_budget(
        mut multipart: Multipart,
        max_total_bytes: u64,
        memory_budget: usize,
    ) -> Result<Self> {
        let mut files = Vec::new();
        let mut total_size = 0u64;
        let mut in_memory = 0usize;

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, max_total_bytes))?
        {
            let field_name = field.name().unwrap_or("").to_string();
            // Parts without a file name are plain form values
            let file_name = field.file_name().filter(|name| !name.is_empty()).map(str::to_string);
            let remaining = memory_budget.saturating_sub(in_memory);
            let mut spool = file_name.as_ref().map(|_| SpooledTempFile::new(remaining));
            let mut part_size = 0u64;

            while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, max_total_bytes))? {
                part_size += chunk.len() as u64;
                total_size += chunk.len() as u64;

                // Check size limit incrementally to fail fast
                if total_size > max_total_bytes {
                    tracing::warn!(
                        field = %field_name,
                        total_size = total_size,
                        max_total_bytes = max_total_bytes,
                        "Multipart form size limit exceeded, aborting upload"
                    );
                    return Err(too_large(max_total_bytes));
                }

                if let Some(spool) = spool.as_mut() {
                    spool.write_all(&chunk).map_err(|e| Error::io("spool multipart part", e))?;
                }
            }

            match (file_name, spool) {
                (Some(file_name), Some(content)) => {
                    if !content.is_rolled() {
                        in_memory += part_size as usize;
                    }
                    tracing::debug!(
                        field = %field_name,
                        file_name = %file_name,
                        size = part_size,
                        on_disk = content.is_rolled(),
                        "Parsed file part"
                    );
                    files.push(FormFile {
                        field_name,
                        file_name: base_name(&file_name)?,
                        size_bytes: part_size,
                        content,
                    });
                }
                _ => {
                    tracing::debug!(field = %field_name, size = part_size, "Skipping non-file form field");
                }
            }
        }

        Ok(Self { files })
    }

    pub fn files(&self) -> &[FormFile] {
        &self.files
    }

    pub fn into_files(self) -> Vec<FormFile> {
        self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl From<Vec<FormFile>> for MultipartForm {
    fn from(files: Vec<FormFile>) -> Self {
        Self { files }
    }
}

fn too_large(limit: u64) -> Error {
    Error::PayloadTooLarge {
        message: format!("the uploaded file is too big (limit {limit} bytes)"),
        limit,
    }
}

fn multipart_error(err: MultipartError, limit: u64) -> Error {
    // Body limits enforced further down the stack surface as 413 here
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limit)
    } else {
        Error::io("parse multipart form", err)
    }
}

/// Final path component of a client-supplied file name.
fn base_name(name: &str) -> Result<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(Error::invalid_input(format!("invalid file name {name:?}")));
    }
    Ok(base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{Request, header};
    use std::io::{Read, Seek, SeekFrom};

    const BOUNDARY: &str = "intake-test-boundary";

    async fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Multipart {
        let mut body = Vec::new();
        for (name, file_name, bytes) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    fn read_back(file: &mut FormFile) -> Vec<u8> {
        let mut bytes = Vec::new();
        file.content.seek(SeekFrom::Start(0)).unwrap();
        file.content.read_to_end(&mut bytes).unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_parse_keeps_file_parts_in_order() {
        let mp = multipart(&[
            ("purpose", None, &b"gallery"[..]),
            ("file", Some("dir/first.txt"), &b"first"[..]),
            ("file", Some("second.txt"), &b"second"[..]),
        ])
        .await;

        let form = MultipartForm::parse(mp, 1024).await.unwrap();

        assert!(!form.is_empty());
        let names: Vec<_> = form.files().iter().map(FormFile::file_name).collect();
        assert_eq!(names, ["first.txt", "second.txt"]);
        assert_eq!(form.files()[1].size_bytes(), 6);
    }

    #[tokio::test]
    async fn test_parse_without_file_parts_is_empty() {
        let mp = multipart(&[("purpose", None, &b"nothing attached"[..])]).await;

        let form = MultipartForm::parse(mp, 1024).await.unwrap();
        assert!(form.is_empty());
        assert!(form.files().is_empty());
    }

    #[tokio::test]
    async fn test_parse_rejects_form_over_total_limit() {
        let mp = multipart(&[
            ("file", Some("a.txt"), &[b'a'; 600][..]),
            ("file", Some("b.txt"), &[b'b'; 600][..]),
        ])
        .await;

        let err = MultipartForm::parse(mp, 1000).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
    }

    #[tokio::test]
    async fn test_memory_budget_is_shared_by_all_parts() {
        let budget = 1024;
        let first = [b'a'; 600];
        let second = [b'b'; 600];
        let third = [b'c'; 300];
        let mp = multipart(&[
            ("file", Some("a.txt"), &first[..]),
            ("file", Some("b.txt"), &second[..]),
            ("file", Some("c.txt"), &third[..]),
        ])
        .await;

        let form = MultipartForm::parse_with_memory_budget(mp, u64::MAX, budget).await.unwrap();
        let mut files = form.into_files();

        let in_memory: u64 = files
            .iter()
            .filter(|f| !f.content.is_rolled())
            .map(FormFile::size_bytes)
            .sum();
        assert!(in_memory <= budget as u64, "in memory: {in_memory}");
        // The first part fits, the second does not fit in what is left
        assert!(!files[0].content.is_rolled());
        assert!(files[1].content.is_rolled());

        // Spooled parts read back whole wherever they ended up
        assert_eq!(read_back(&mut files[0]), first);
        assert_eq!(read_back(&mut files[1]), second);
        assert_eq!(read_back(&mut files[2]), third);
    }

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("./testdata/img.png").unwrap(), "img.png");
        assert_eq!(base_name(r"C:\Users\me\report.pdf").unwrap(), "report.pdf");
        assert_eq!(base_name("plain.txt").unwrap(), "plain.txt");
    }

    #[test]
    fn test_base_name_rejects_traversal_and_empty_names() {
        for name in ["", "uploads/", "..", "a/..", "."] {
            let err = base_name(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "name: {name:?}");
        }
    }

    #[test]
    fn test_form_file_from_bytes() {
        let file = FormFile::from_bytes("file", "nested/dir/notes.txt", b"hello").unwrap();
        assert_eq!(file.field_name(), "file");
        assert_eq!(file.file_name(), "notes.txt");
        assert_eq!(file.size_bytes(), 5);
    }
}
