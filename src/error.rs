use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Errors a request handler can surface to the caller.
///
/// Handlers validate their input before producing any output, so an error
/// always replaces the whole response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid request method")]
    MethodNotAllowed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(_) => {
                tracing::error!("Internal error: {:?}", self);
                "Internal server error".to_string()
            }
            _ => {
                tracing::debug!(status = status.as_u16(), error = %self, "Rejected request");
                self.to_string()
            }
        };

        (status, message).into_response()
    }
}

/// Axum handler for verbs a route does not support.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
