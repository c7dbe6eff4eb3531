//! Strict JSON request decoding and JSON response encoding.
//!
//! Decoding enforces a body size ceiling, optionally rejects fields the target type does not
//! declare, and refuses bodies carrying more than one JSON value. Every failure is classified
//! into an [`Error`](crate::errors::Error) variant a handler can act on.

use bon::Builder;
use serde::{Deserialize, Serialize};

mod decode;
mod extract;
mod push;
mod response;

pub use decode::{decode_body, decode_reader, decode_slice};
pub use extract::StrictJson;
pub use push::push_json;
pub use response::{Envelope, encode, encode_error};

/// Default JSON body ceiling: 1 MiB.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Rules applied to every JSON decode.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonCodecPolicy {
    #[builder(default = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: u64,
    /// Accept (and drop) input fields the target type does not declare.
    ///
    /// Strict mode only sees keys that serde skips while walking the document. Keys consumed by
    /// `#[serde(flatten)]` fields, untagged enums or internally tagged enums are buffered first and
    /// dropped without an error. Use `#[serde(deny_unknown_fields)]` on the inner types where
    /// that matters (it is not supported together with `flatten`).
    #[builder(default)]
    pub allow_unknown_fields: bool,
}

impl Default for JsonCodecPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}
