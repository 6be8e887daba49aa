//! Mapping of ladder errors onto HTTP responses

use crate::error::{error_kind, ErrorKind};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Error returned by API handlers
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        error_kind(&self.0)
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::Storage | ErrorKind::Configuration | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
        }

        let body = json!({
            "error": self.kind().as_str(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LadderError;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(anyhow::Error, StatusCode)> = vec![
            (
                LadderError::invalid_input("bad").into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                LadderError::team_not_found("Ghosts").into(),
                StatusCode::NOT_FOUND,
            ),
            (LadderError::invalid_state("done").into(), StatusCode::CONFLICT),
            (
                LadderError::Storage {
                    message: "disk".to_string(),
                }
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                anyhow::anyhow!("unexpected"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status(), expected);
        }
    }
}
