pub mod bindings;
pub mod handlers;
pub mod review;
pub mod routes;

pub use routes::create_router;

use serde::Serialize;

/// Error response body shared by all endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
