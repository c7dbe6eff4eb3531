use std::io::Read;

use axum::body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use super::JsonCodecPolicy;
use crate::errors::{Error, Result};

/// Decode a complete in-memory body.
pub fn decode_slice<T: DeserializeOwned>(bytes: &[u8], policy: &JsonCodecPolicy) -> Result<T> {
    if bytes.len() as u64 > policy.max_body_bytes {
        return Err(too_large(policy.max_body_bytes));
    }
    if bytes.iter().all(|b| is_json_whitespace(*b)) {
        return Err(Error::EmptyBody);
    }

    let mut de = serde_json::Deserializer::from_slice(bytes);
    let mut first_ignored: Option<String> = None;
    let mut record_ignored = |path: serde_ignored::Path| {
        if first_ignored.is_none() {
            first_ignored = Some(path.to_string());
        }
    };

    let decoded: std::result::Result<T, _> =
        serde_path_to_error::deserialize(serde_ignored::Deserializer::new(&mut de, &mut record_ignored));
    let unknown = first_ignored.filter(|_| !policy.allow_unknown_fields);
    let value = match (decoded, unknown) {
        (Ok(value), None) => value,
        (Ok(_), Some(field)) => return Err(Error::UnknownField { field }),
        // An unknown key that came before a bad value is the error reported
        (Err(err), Some(field)) if err.inner().classify() == Category::Data => {
            return Err(Error::UnknownField { field });
        }
        (Err(err), _) => {
            let path = err.path().to_string();
            return Err(classify(err.into_inner(), &path, bytes));
        }
    };

    de.end().map_err(|_| Error::MultipleJsonValues)?;
    Ok(value)
}

/// Decode from a blocking reader, reading at most `max_body_bytes + 1` bytes.
pub fn decode_reader<T: DeserializeOwned, R: Read>(reader: R, policy: &JsonCodecPolicy) -> Result<T> {
    let mut buf = Vec::new();
    reader
        .take(policy.max_body_bytes.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|e| Error::io("read JSON body", e))?;
    decode_slice(&buf, policy)
}

/// Collect a request body under the size ceiling and decode it.
pub async fn decode_body<T: DeserializeOwned>(body: Body, policy: &JsonCodecPolicy) -> Result<T> {
    let limit = usize::try_from(policy.max_body_bytes).unwrap_or(usize::MAX);
    let collected = Limited::new(body, limit).collect().await.map_err(|err| {
        if is_length_limit(&*err) {
            too_large(policy.max_body_bytes)
        } else {
            Error::io("read JSON body", err)
        }
    })?;
    decode_slice(&collected.to_bytes(), policy)
}

fn too_large(limit: u64) -> Error {
    Error::PayloadTooLarge {
        message: format!("body must not be larger than {limit} bytes"),
        limit,
    }
}

fn is_length_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(cause) = current {
        if cause.is::<LengthLimitError>() {
            return true;
        }
        current = cause.source();
    }
    false
}

fn is_json_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

/// Map a serde_json failure onto the error taxonomy. `path` is where decoding stopped, `.` at
/// the root.
fn classify(err: serde_json::Error, path: &str, bytes: &[u8]) -> Error {
    match err.classify() {
        Category::Io => Error::io("read JSON body", err),
        Category::Eof => Error::MalformedJson { offset: None },
        Category::Syntax => Error::MalformedJson {
            offset: byte_offset(bytes, err.line(), err.column()),
        },
        Category::Data => {
            let message = err.to_string();
            if let Some(name) = unknown_field_name(&message) {
                return Error::UnknownField {
                    field: join_path(path, name),
                };
            }
            if message.starts_with("invalid type") {
                return Error::TypeMismatch {
                    field: (path != ".").then(|| path.to_string()),
                    offset: byte_offset(bytes, err.line(), err.column()),
                };
            }
            Error::InvalidValue {
                detail: strip_position(&message).to_string(),
            }
        }
    }
}

// "unknown field `fooo`, expected `foo`"
fn unknown_field_name(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("unknown field `")?;
    rest.split_once('`').map(|(name, _)| name)
}

fn join_path(path: &str, field: &str) -> String {
    if path == "." {
        field.to_string()
    } else if path == field || path.ends_with(&format!(".{field}")) {
        path.to_string()
    } else {
        format!("{path}.{field}")
    }
}

fn strip_position(message: &str) -> &str {
    message.rfind(" at line ").map(|idx| &message[..idx]).unwrap_or(message)
}

/// Byte offset just past the character at 1-based `line`/`column`.
fn byte_offset(bytes: &[u8], line: usize, column: usize) -> Option<u64> {
    if line == 0 {
        return None;
    }
    let line_start = if line == 1 {
        0
    } else {
        bytes
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .nth(line - 2)
            .map(|(idx, _)| idx + 1)?
    };
    Some(((line_start + column).min(bytes.len())) as u64)
}
