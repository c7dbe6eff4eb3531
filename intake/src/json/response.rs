use std::fmt::Display;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Error, Result};

/// Standard wrapper for error (and optionally success) JSON responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub error: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Serialize `payload` into a JSON response with `status`.
///
/// `Content-Type: application/json` is set first; any `headers` given replace values of the same
/// name, content type included.
pub fn encode<T: Serialize + ?Sized>(status: StatusCode, payload: &T, headers: Option<HeaderMap>) -> Result<Response> {
    let body = serde_json::to_vec(payload).map_err(Error::Serialization)?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(headers) = headers {
        let target = response.headers_mut();
        for name in headers.keys() {
            target.remove(name);
        }
        for (name, value) in &headers {
            target.append(name, value.clone());
        }
    }

    Ok(response)
}

/// Write `err` as an error [`Envelope`], defaulting to `400 Bad Request`.
pub fn encode_error<E: Display + ?Sized>(err: &E, status: Option<StatusCode>) -> Result<Response> {
    let status = status.unwrap_or(StatusCode::BAD_REQUEST);
    encode(status, &Envelope::error(err.to_string()), None)
}
