//! JSON request bodies.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::response::Response;
use axum::async_trait;
use groundwork_core::Error;
use groundwork_infra::Scope;
use groundwork_observability::Logger;
use serde::de::DeserializeOwned;

use crate::respond::error_response;

/// Decode a JSON body. Malformed input is an input error, not a server fault.
pub fn decode_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body)
        .map_err(|err| Error::wrap_input(err, "Failed to unmarshal request body"))
}

/// Extractor decoding the request body with [`decode_json_body`].
///
/// Rejections are rendered the same way handler errors are.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let scope = req
            .extensions()
            .get::<Scope>()
            .cloned()
            .unwrap_or_else(|| Scope::new(Logger::current()));

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| {
                error_response(&scope, &Error::wrap(rejection, "Failed to read request body"))
            })?;

        decode_json_body(&bytes)
            .map(JsonBody)
            .map_err(|err| error_response(&scope, &err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::Origin;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Input {
        title: String,
    }

    #[test]
    fn decodes_valid_json() {
        let input: Input = decode_json_body(br#"{"title":"x"}"#).unwrap();
        assert_eq!(input, Input { title: "x".into() });
    }

    #[test]
    fn malformed_json_is_an_input_error() {
        let err = decode_json_body::<Input>(b"{title").unwrap_err();
        assert_eq!(err.origin(), Origin::Input);
        assert!(!err.internal());
        assert!(!err.warning());
        assert_eq!(err.message(), "Failed to unmarshal request body");
        assert!(err.base().has_cause::<serde_json::Error>());
    }
}
