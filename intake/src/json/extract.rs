use axum::extract::{FromRef, FromRequest, Request};
use serde::de::DeserializeOwned;

use super::{JsonCodecPolicy, decode_body};
use crate::errors::Error;

/// JSON body extractor that decodes with the [`JsonCodecPolicy`] held in router state.
///
/// Unlike `axum::Json`, the body is bounded by the policy, unknown fields are rejected unless the
/// policy allows them, and trailing values are an error. Rejections are [`Error`]s, so they
/// render as the standard envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictJson<T>(pub T);

impl<T, S> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    JsonCodecPolicy: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let policy = JsonCodecPolicy::from_ref(state);
        decode_body(req.into_body(), &policy).await.map(StrictJson)
    }
}
