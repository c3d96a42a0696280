use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use groundwork_infra::Scope;
use groundwork_observability::Logger;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct ScopeState {
    pub logger: Logger,
}

impl ScopeState {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

/// Build the request's [`Scope`] and store it in the request extensions.
///
/// The request id comes from `x-request-id` when the client sent one and is
/// echoed on the response. The scope's cancellation token fires when this
/// future is dropped, which is what hyper does when the client goes away.
pub async fn scope_middleware(
    State(state): State<ScopeState>,
    mut req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let token = CancellationToken::new();
    let _cancel_on_drop = token.clone().drop_guard();

    let scope = Scope::new(state.logger.clone())
        .with_cancellation(token)
        .with_request_id(request_id.as_str());
    scope.logger().in_scope(|| {
        tracing::debug!(method = %req.method(), path = %req.uri().path(), "Request received");
    });
    req.extensions_mut().insert(scope);

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use crate::context::RequestScope;

    fn router() -> Router {
        Router::new()
            .route(
                "/id",
                get(|scope: RequestScope| async move {
                    scope.request_id().unwrap_or_default().to_string()
                }),
            )
            .layer(axum::middleware::from_fn_with_state(
                ScopeState::new(Logger::disabled()),
                scope_middleware,
            ))
    }

    #[tokio::test]
    async fn propagates_the_client_request_id() {
        let response = router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/id")
                    .header(REQUEST_ID_HEADER, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "abc-123");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"abc-123");
    }

    #[tokio::test]
    async fn generates_an_id_when_absent() {
        let response = router()
            .oneshot(axum::http::Request::builder().uri("/id").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn missing_middleware_is_an_internal_error() {
        let response = Router::new()
            .route("/id", get(|_scope: RequestScope| async { "unreachable" }))
            .oneshot(axum::http::Request::builder().uri("/id").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
