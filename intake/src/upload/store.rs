//! Writing sniffed, allow-listed parts into the target directory.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, info, warn};

use super::form::FormFile;
use super::sniff::{SNIFF_LEN, detect_content_type};
use super::{UploadPolicy, UploadedFile};
use crate::errors::{Error, Result};
use crate::naming;

/// Create `path` (and its parents) if it does not already exist.
pub async fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);

    builder.create(path).await.map_err(|source| Error::Directory {
        path: path.to_path_buf(),
        source,
    })
}

/// Sniff, check and persist a single part. Blocking; call from a blocking context.
pub(super) fn store_part(part: &mut FormFile, dir: &Path, policy: &UploadPolicy) -> Result<UploadedFile> {
    let FormFile { file_name, content, .. } = part;

    content
        .seek(SeekFrom::Start(0))
        .map_err(|e| Error::io("rewind upload part", e))?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    content
        .by_ref()
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .map_err(|e| Error::io("read upload part", e))?;

    let content_type = detect_content_type(&head);
    if !policy.allows(content_type) {
        debug!(file_name = %file_name, content_type = content_type, "Rejecting upload with disallowed content type");
        return Err(Error::UnsupportedFileType {
            content_type: content_type.to_string(),
        });
    }

    content
        .seek(SeekFrom::Start(0))
        .map_err(|e| Error::io("rewind upload part", e))?;

    let stored_name = naming::stored_name(file_name, policy.rename_on_store);
    let target = dir.join(&stored_name);

    let out = File::create(&target).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => Error::Directory {
            path: dir.to_path_buf(),
            source,
        },
        _ => Error::io(format!("create {}", target.display()), source),
    })?;

    let size_bytes =
        write_or_remove(out, &target, content).map_err(|e| Error::io(format!("write {}", target.display()), e))?;

    info!(
        original_name = %file_name,
        stored_name = %stored_name,
        size_bytes = size_bytes,
        content_type = content_type,
        "Stored uploaded file"
    );

    Ok(UploadedFile {
        stored_name,
        original_name: file_name.clone(),
        size_bytes,
    })
}

/// Copy `content` into the freshly created `out` at `target`, removing the file if the copy fails.
fn write_or_remove(mut out: File, target: &Path, content: &mut impl Read) -> io::Result<u64> {
    let written = io::copy(content, &mut out).and_then(|n| out.sync_all().map(|()| n));
    if written.is_err() {
        drop(out);
        if let Err(remove_err) = fs::remove_file(target) {
            warn!(path = %target.display(), error = %remove_err, "Failed to remove partial upload");
        }
    }
    written
}
