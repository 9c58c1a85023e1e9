use axum::response::{IntoResponse, Response};

use crate::Error;

/// Respond to requests for unknown routes with the JSON error envelope.
pub async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
