//! Demo application: a small notes API wired through the request scope, the
//! DAO and the serializable transaction executor.
//!
//! - `services.rs`: business operations, one transaction each
//! - `routes/`: HTTP handlers
//! - `dto.rs`: request/response bodies and row mapping

use axum::Router;
use groundwork_core::Error;
use groundwork_infra::{Dialect, Repo, Scope};
use groundwork_observability::Logger;

use crate::middleware::{scope_middleware, ScopeState};

pub mod dto;
pub mod routes;
pub mod services;

#[derive(Debug, Clone)]
pub struct AppState {
    pub repo: Repo,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(repo: Repo, logger: Logger) -> Router {
    routes::router()
        .with_state(AppState { repo })
        .layer(axum::middleware::from_fn_with_state(
            ScopeState::new(logger),
            scope_middleware,
        ))
}

/// Create the `notes` table if it does not exist.
pub async fn migrate(repo: &Repo, scope: &Scope) -> Result<(), Error> {
    let ddl = match repo.dialect() {
        Dialect::Postgres => {
            "CREATE TABLE IF NOT EXISTS notes (id BIGSERIAL PRIMARY KEY, body TEXT NOT NULL)"
        }
        Dialect::Sqlite => {
            "CREATE TABLE IF NOT EXISTS notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL)"
        }
    };
    repo.non_tx(scope).exec(ddl, &[]).await?;
    Ok(())
}
