use std::ops::Deref;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;
use groundwork_core::Error;
use groundwork_infra::Scope;
use groundwork_observability::Logger;

use crate::respond::error_response;

/// The per-request [`Scope`] installed by
/// [`scope_middleware`](crate::middleware::scope_middleware).
///
/// Handlers pass it by reference into services and repositories.
#[derive(Debug, Clone)]
pub struct RequestScope(pub Scope);

impl RequestScope {
    pub fn into_inner(self) -> Scope {
        self.0
    }
}

impl Deref for RequestScope {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Scope>() {
            Some(scope) => Ok(RequestScope(scope.clone())),
            None => {
                let scope = Scope::new(Logger::current());
                let err = Error::new("request scope missing; scope_middleware is not installed");
                Err(error_response(&scope, &err))
            }
        }
    }
}
