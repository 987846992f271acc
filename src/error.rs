use std::{error::Error, fmt};

use axum::http::StatusCode;

#[derive(Debug)]
pub enum HandlerError {
    Forbidden(String),
    NotFound(String),
    ValidationError(String),
    StorageError(anyhow::Error),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        use HandlerError::*;
        match self {
            Forbidden(_) => StatusCode::FORBIDDEN,
            NotFound(_) => StatusCode::NOT_FOUND,
            ValidationError(_) => StatusCode::BAD_REQUEST,
            StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use HandlerError::*;
        match self {
            Forbidden(s) => write!(f, "Forbidden: {}", s),
            NotFound(s) => write!(f, "NotFound: {}", s),
            ValidationError(s) => write!(f, "ValidationError: {}", s),
            StorageError(e) => write!(f, "StorageError: {:#}", e),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use HandlerError::*;
        match self {
            StorageError(e) => Some(&**e),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(error: anyhow::Error) -> Self {
        HandlerError::StorageError(error)
    }
}

/// Failures of a single bookmark toggle request. None of them reach the page;
/// they are logged and the icon keeps its previous class.
#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(u16),
    #[error("undecodable response body: {0}")]
    Body(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_status() {
        assert_eq!(HandlerError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(HandlerError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            HandlerError::ValidationError("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HandlerError::StorageError(anyhow::anyhow!("disk")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_error_chain_in_display() {
        let err = HandlerError::from(anyhow::anyhow!("no such table").context("toggle bookmark"));
        assert_eq!(err.to_string(), "StorageError: toggle bookmark: no such table");
    }
}
