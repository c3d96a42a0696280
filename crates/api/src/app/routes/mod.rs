use axum::routing::{delete, get};
use axum::Router;

use crate::app::AppState;

pub mod notes;
pub mod system;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(system::health))
        .route("/notes", get(notes::list).post(notes::create))
        .route("/notes/:id", delete(notes::remove))
}
