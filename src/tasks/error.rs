use thiserror::Error;
use tracing::error;

use crate::http::{Response, StatusCode};
use crate::store::StoreError;

/// Everything a task operation can fail with.
///
/// The `Display` text is what clients see in the `{"error": ...}` body,
/// except for storage failures, which are logged and reported generically.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task title is required.")]
    TitleRequired,

    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Invalid task id.")]
    InvalidId,

    #[error("Task not found.")]
    NotFound,

    #[error("No task ids left.")]
    IdsExhausted,

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl TaskError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::TitleRequired | Self::InvalidJson | Self::InvalidId => StatusCode::BadRequest,
            Self::NotFound => StatusCode::NotFound,
            Self::IdsExhausted | Self::Store(_) => StatusCode::InternalServerError,
        }
    }

    /// Converts the error into the JSON response sent to the client.
    pub fn into_response(self) -> Response {
        match &self {
            Self::Store(e) => {
                error!(error = %e, "task storage failed");
                Response::error(self.status(), "Internal server error.")
            }
            _ => Response::error(self.status(), &self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_carry_their_message() {
        let response = TaskError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NotFound);
        assert_eq!(response.body_bytes(), br#"{"error":"Task not found."}"#);

        let response = TaskError::TitleRequired.into_response();
        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(response.body_bytes(), br#"{"error":"Task title is required."}"#);
    }

    #[test]
    fn exhausted_ids_are_a_server_error() {
        let response = TaskError::IdsExhausted.into_response();
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(response.body_bytes(), br#"{"error":"No task ids left."}"#);
    }

    #[test]
    fn storage_errors_are_not_leaked() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = TaskError::from(StoreError::Io {
            path: "/secret/tasks.json".into(),
            source: io,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(response.body_bytes(), br#"{"error":"Internal server error."}"#);
    }
}
