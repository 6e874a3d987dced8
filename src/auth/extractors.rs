use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// JSON body extractor that never rejects on bad JSON.
///
/// A body that is missing, not JSON, or does not match `T` yields
/// `T::default()`, so handlers see it the same way as an empty object and
/// report the missing fields themselves.
pub struct LenientJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for LenientJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let value = match serde_json::from_slice::<T>(&bytes) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, len = bytes.len(), "unparseable json body, treating as empty");
                T::default()
            }
        };
        Ok(LenientJson(value))
    }
}
