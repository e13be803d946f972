use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Message returned for every failure we do not want to describe to callers.
pub const GENERIC_SERVER_ERROR: &str =
    "An error occurred on the server, please double-check your request!";

/// Errors surfaced by handlers and the authorization gate.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Constraint failures reported by a repository implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("referenced record does not exist")]
    ForeignKeyViolation,
    #[error("check constraint violated")]
    CheckViolation,
    #[error(transparent)]
    Backend(anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::ForeignKeyViolation
            }
            sqlx::Error::Database(db) if db.is_check_violation() => StoreError::CheckViolation,
            _ => StoreError::Backend(e.into()),
        }
    }
}

impl AppError {
    /// Maps a storage failure onto the caller-facing taxonomy.
    ///
    /// `entity` names the resource in not-found messages and `conflict` is the
    /// message used for uniqueness violations.
    pub fn from_store(err: StoreError, entity: &str, conflict: &str) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound(format!("{entity} not found")),
            StoreError::UniqueViolation => AppError::Conflict(conflict.to_string()),
            StoreError::ForeignKeyViolation => {
                AppError::InvalidInput("Referenced record does not exist".into())
            }
            StoreError::CheckViolation => {
                AppError::InvalidInput(format!("{entity} violates a field constraint"))
            }
            StoreError::Backend(e) => AppError::Internal(e),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                GENERIC_SERVER_ERROR.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_caller_taxonomy() {
        let err = AppError::from_store(StoreError::NotFound, "Property", "dup");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Property not found");

        let err = AppError::from_store(StoreError::UniqueViolation, "User", "Username taken");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Username taken"));

        let err = AppError::from_store(StoreError::ForeignKeyViolation, "Booking", "dup");
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = AppError::from_store(
            StoreError::Backend(anyhow::anyhow!("connection reset")),
            "Review",
            "dup",
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn row_not_found_is_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Backend(_)
        ));
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        use http_body_util::BodyExt;

        let res = AppError::Internal(anyhow::anyhow!("relation \"users\" does not exist"))
            .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], GENERIC_SERVER_ERROR);
    }
}
