//! Mapping handler results onto HTTP responses.
//!
//! | handler result | status | body |
//! |----------------|--------|------|
//! | `Ok(Some(v))` | 200 | `v` as JSON |
//! | `Ok(None)` | 204 | empty |
//! | `Err(e)`, `e.internal()` | 500 | `e.message()` as text |
//! | `Err(e)`, input error | 400 | `e.message()` as text |
//!
//! Only the message reaches the client. The full error, with its stack and
//! cause, goes to the scope's logger.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use groundwork_core::Error;
use groundwork_infra::Scope;
use groundwork_observability::LogLevel;
use serde::Serialize;

pub fn respond<T: Serialize>(scope: &Scope, result: Result<Option<T>, Error>) -> Response {
    match result {
        Ok(Some(value)) => json_response(scope, &value),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(scope, &err),
    }
}

/// Log `err` at warn or error by its severity and render it.
pub fn error_response(scope: &Scope, err: &Error) -> Response {
    scope.logger().report(err, "Error returned from handler func");
    (status_for(err), err.message().to_string()).into_response()
}

pub fn status_for(err: &Error) -> StatusCode {
    if err.internal() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    }
}

fn json_response<T: Serialize>(scope: &Scope, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response(),
        Err(cause) => {
            let err = Error::wrap(cause, "Error marshalling JSON response");
            scope
                .logger()
                .log_error(LogLevel::Error, &err, "Error writing JSON response to handler");
            (StatusCode::INTERNAL_SERVER_ERROR, err.message().to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use groundwork_observability::{InMemorySink, Logger};
    use serde::ser::Error as _;
    use std::io;
    use tracing::level_filters::LevelFilter;

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn capture() -> (InMemorySink, Scope) {
        let sink = InMemorySink::new();
        let scope = Scope::new(Logger::new(sink.dispatch(LevelFilter::INFO)));
        (sink, scope)
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialize"))
        }
    }

    #[tokio::test]
    async fn some_value_is_json() {
        let (_sink, scope) = capture();
        let response = respond(&scope, Ok(Some(serde_json::json!({ "id": 3 }))));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_text(response).await, r#"{"id":3}"#);
    }

    #[tokio::test]
    async fn none_is_no_content() {
        let (_sink, scope) = capture();
        let response = respond::<()>(&scope, Ok(None));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn input_errors_are_bad_requests_logged_as_warnings() {
        let (sink, scope) = capture();
        let response = respond::<()>(&scope, Err(Error::new_input("id must be numeric")));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "id must be numeric");
        let events = sink.events();
        assert_eq!(events[0]["level"], "WARN");
        assert_eq!(events[0]["message"], "Error returned from handler func");
    }

    #[tokio::test]
    async fn internal_errors_expose_only_the_message() {
        let (sink, scope) = capture();
        let cause = io::Error::other("password=hunter2 rejected");
        let response = respond::<()>(&scope, Err(Error::wrap_db(cause, "Error running Select")));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Error running Select");
        let events = sink.events();
        assert_eq!(events[0]["level"], "ERROR");
        assert_eq!(events[0]["inner_error"], "password=hunter2 rejected");
    }

    #[tokio::test]
    async fn serialization_failure_is_logged_and_internal() {
        let (sink, scope) = capture();
        let response = respond(&scope, Ok(Some(Unserializable)));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Error marshalling JSON response");
        assert_eq!(sink.events()[0]["origin"], "application");
    }
}
