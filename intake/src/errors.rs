use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

use crate::json::encode_error;

/// Boxed lower-level cause carried by [`Error::Io`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stable classification of every failure the crate returns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    PayloadTooLarge,
    UnsupportedFileType,
    Directory,
    Io,
    NoFileProvided,
    MalformedJson,
    TypeMismatch,
    UnknownField,
    EmptyBody,
    MultipleJsonValues,
    InvalidValue,
    Serialization,
    InvalidInput,
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Combined upload form or JSON body exceeded its configured ceiling
    #[error("{message}")]
    PayloadTooLarge { message: String, limit: u64 },

    /// Sniffed content type is not in the allow-list
    #[error("the uploaded file type {content_type} is not permitted")]
    UnsupportedFileType { content_type: String },

    /// Target directory is missing and could not be created
    #[error("upload directory {} is not available", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stream read/seek/copy or network failure
    #[error("failed to {operation}")]
    Io {
        operation: String,
        #[source]
        source: BoxError,
    },

    /// A single file was expected but the form carried none
    #[error("no file was provided")]
    NoFileProvided,

    #[error("body contains badly-formed JSON{}", at_character(.offset))]
    MalformedJson { offset: Option<u64> },

    #[error("{}", type_mismatch_message(.field, .offset))]
    TypeMismatch { field: Option<String>, offset: Option<u64> },

    /// Input field that the target type does not declare (strict mode)
    #[error("body contains unknown key {field:?}")]
    UnknownField { field: String },

    #[error("body must not be empty")]
    EmptyBody,

    #[error("body must contain only one JSON value")]
    MultipleJsonValues,

    /// Well-formed JSON the target type still refuses (missing field, unknown variant, ...)
    #[error("error unmarshalling JSON: {detail}")]
    InvalidValue { detail: String },

    /// Outbound payload could not be serialized
    #[error("failed to serialize JSON payload")]
    Serialization(#[source] serde_json::Error),

    /// Caller-supplied argument rejected by a helper
    #[error("{message}")]
    InvalidInput { message: String },
}

fn at_character(offset: &Option<u64>) -> String {
    offset.map(|offset| format!(" (at character {offset})")).unwrap_or_default()
}

fn type_mismatch_message(field: &Option<String>, offset: &Option<u64>) -> String {
    match field {
        Some(field) => format!("body contains incorrect JSON type for field {field:?}"),
        None => format!("body contains incorrect JSON type{}", at_character(offset)),
    }
}

impl Error {
    pub fn io(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Io {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Error::UnsupportedFileType { .. } => ErrorKind::UnsupportedFileType,
            Error::Directory { .. } => ErrorKind::Directory,
            Error::Io { .. } => ErrorKind::Io,
            Error::NoFileProvided => ErrorKind::NoFileProvided,
            Error::MalformedJson { .. } => ErrorKind::MalformedJson,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::UnknownField { .. } => ErrorKind::UnknownField,
            Error::EmptyBody => ErrorKind::EmptyBody,
            Error::MultipleJsonValues => ErrorKind::MultipleJsonValues,
            Error::InvalidValue { .. } => ErrorKind::InvalidValue,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    /// Suggested HTTP status for this error. Callers are free to pick their own.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::UnsupportedFileType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::Directory | ErrorKind::Io | ErrorKind::Serialization => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::NoFileProvided
            | ErrorKind::MalformedJson
            | ErrorKind::TypeMismatch
            | ErrorKind::UnknownField
            | ErrorKind::EmptyBody
            | ErrorKind::MultipleJsonValues
            | ErrorKind::InvalidValue
            | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Directory { .. } | Error::Io { .. } | Error::Serialization(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match self.kind() {
            ErrorKind::Directory | ErrorKind::Io | ErrorKind::Serialization => {
                tracing::error!("Internal service error: {}", self.chain_message());
            }
            ErrorKind::PayloadTooLarge | ErrorKind::UnsupportedFileType => {
                tracing::warn!("Rejected payload: {}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let message = self.user_message();

        encode_error(&message, Some(status)).unwrap_or_else(|_| (status, message).into_response())
    }
}

impl Error {
    // Flattens the source chain into one line for logging.
    fn chain_message(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}

/// Type alias for helper operation results
pub type Result<T> = std::result::Result<T, Error>;
