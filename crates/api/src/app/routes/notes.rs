use axum::extract::{Path, State};
use axum::response::Response;
use groundwork_observability::Layer;

use crate::app::dto::CreateNoteRequest;
use crate::app::{services, AppState};
use crate::body::JsonBody;
use crate::context::RequestScope;
use crate::respond::respond;

pub async fn list(State(app): State<AppState>, scope: RequestScope) -> Response {
    let logger = scope.logger().function(Layer::Handler, "list_notes");
    let result = services::list_notes(&app.repo, &scope).await.map(Some);
    logger.returned(Layer::Handler);
    respond(&scope, result)
}

pub async fn create(
    State(app): State<AppState>,
    scope: RequestScope,
    JsonBody(input): JsonBody<CreateNoteRequest>,
) -> Response {
    let logger = scope.logger().function(Layer::Handler, "create_note");
    let result = services::create_note(&app.repo, &scope, input).await.map(Some);
    logger.returned(Layer::Handler);
    respond(&scope, result)
}

pub async fn remove(
    State(app): State<AppState>,
    scope: RequestScope,
    Path(id): Path<i64>,
) -> Response {
    let logger = scope.logger().function(Layer::Handler, "delete_note");
    let result = services::delete_note(&app.repo, &scope, id)
        .await
        .map(|()| None::<()>);
    logger.returned(Layer::Handler);
    respond(&scope, result)
}
