//! Mapping of export errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::Error;

/// Error response wrapper for converting [`Error`] to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) | Error::AlreadyTerminal { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }

        let body = serde_json::json!({
            "status": "error",
            "message": self.0.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_errors_to_status_codes() {
        let cases = vec![
            (Error::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (Error::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::Conflict("x".into()), StatusCode::CONFLICT),
            (
                Error::AlreadyTerminal {
                    id: "a".into(),
                    status: "finish".into(),
                },
                StatusCode::CONFLICT,
            ),
            (Error::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
