use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::users::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("Endpoint not found")]
    NotFound,
    #[error("store unavailable")]
    StoreUnavailable {
        #[source]
        source: StoreError,
        public: &'static str,
    },
    #[error("internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
        public: &'static str,
    },
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AppError::DuplicateEmail,
            other => AppError::StoreUnavailable {
                source: other,
                public: "Database connection error",
            },
        }
    }
}

#[derive(Serialize)]
pub(crate) struct MessageBody<'a> {
    pub message: &'a str,
}

impl AppError {
    pub fn internal(source: anyhow::Error) -> Self {
        AppError::Internal {
            source,
            public: "Internal server error",
        }
    }

    /// Replaces the client-facing text of a 500 with an endpoint specific one.
    /// Client errors pass through untouched.
    pub fn during(self, message: &'static str) -> Self {
        match self {
            AppError::StoreUnavailable { source, .. } => AppError::StoreUnavailable {
                source,
                public: message,
            },
            AppError::Internal { source, .. } => AppError::Internal {
                source,
                public: message,
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text that is safe to hand to the client.
    fn public_message(&self) -> String {
        match self {
            AppError::StoreUnavailable { public, .. } | AppError::Internal { public, .. } => {
                (*public).to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::StoreUnavailable { source, .. } => {
                tracing::error!(error = %source, status = status.as_u16(), "store failure")
            }
            AppError::Internal { source, .. } => {
                tracing::error!(error = ?source, status = status.as_u16(), "internal failure")
            }
            other => tracing::warn!(error = %other, status = status.as_u16(), "request rejected"),
        }

        let message = self.public_message();
        (status, Json(MessageBody { message: &message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_store_error_maps_to_conflict() {
        let err = AppError::from(StoreError::Duplicate);
        assert!(matches!(err, AppError::DuplicateEmail));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn store_failures_do_not_leak_driver_text() {
        let err = AppError::from(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Database connection error");
    }

    #[test]
    fn internal_errors_hide_cause() {
        let err = AppError::internal(anyhow::anyhow!("argon2 blew up"));
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn during_rewords_only_server_failures() {
        let store = AppError::from(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
            .during("An error occurred during registration");
        assert_eq!(store.public_message(), "An error occurred during registration");
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let internal = AppError::internal(anyhow::anyhow!("boom"))
            .during("An error occurred during sign in");
        assert_eq!(internal.public_message(), "An error occurred during sign in");

        let client = AppError::InvalidCredentials.during("An error occurred during sign in");
        assert_eq!(client.public_message(), "Invalid email or password");
        assert_eq!(client.status(), StatusCode::UNAUTHORIZED);
    }
}
