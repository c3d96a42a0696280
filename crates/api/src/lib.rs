//! HTTP boundary: request scope middleware, JSON bodies, and the mapping of
//! classified errors onto responses.

pub mod app;
pub mod body;
pub mod context;
pub mod middleware;
pub mod respond;

pub use body::{decode_json_body, JsonBody};
pub use context::RequestScope;
pub use middleware::{scope_middleware, ScopeState, REQUEST_ID_HEADER};
pub use respond::{error_response, respond, status_for};
