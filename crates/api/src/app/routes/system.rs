use axum::extract::State;
use axum::response::Response;

use crate::app::dto::HealthResponse;
use crate::app::{services, AppState};
use crate::context::RequestScope;
use crate::respond::respond;

pub async fn health(State(app): State<AppState>, scope: RequestScope) -> Response {
    let result = services::ping(&app.repo, &scope)
        .await
        .map(|()| Some(HealthResponse { status: "ok" }));
    respond(&scope, result)
}
