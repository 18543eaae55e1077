use async_graphql::ErrorExtensions;
use thiserror::Error;

use crate::auth::jwt::TokenError;

pub type AppResult<T> = Result<T, AppError>;

/// Failures surfaced by the auth and catalog services.
///
/// `Storage` and `Internal` keep their cause as a source but render a generic
/// message, so clients never see database or hashing internals.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("password does not match")]
    PasswordMismatch,

    #[error("{0}")]
    Validation(String),

    #[error("an account with this {field} already exists")]
    DuplicateIdentity { field: &'static str },

    #[error("a {entity} named {name:?} already exists")]
    DuplicateName { entity: &'static str, name: String },

    #[error("Bad username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("authentication required")]
    Unauthorized,

    #[error("{entity} {id} does not exist")]
    InvalidReference { entity: &'static str, id: i64 },

    #[error("storage error")]
    Storage(#[source] sqlx::Error),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable machine-readable code, returned alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::PasswordMismatch => "PASSWORD_MISMATCH",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DuplicateIdentity { .. } => "DUPLICATE_IDENTITY",
            AppError::DuplicateName { .. } => "DUPLICATE_NAME",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Token(TokenError::Expired) => "TOKEN_EXPIRED",
            AppError::Token(TokenError::Invalid) => "TOKEN_INVALID",
            AppError::Token(TokenError::Malformed) => "TOKEN_MALFORMED",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidReference { .. } => "INVALID_REFERENCE",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures caused by the server rather than the caller.
    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::Storage(_) | AppError::Internal(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Storage(e)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_do_not_leak_their_cause() {
        let err = AppError::from(anyhow::anyhow!("argon2 exploded: secret detail"));
        assert_eq!(err.to_string(), "internal error");
        assert!(err.is_internal());

        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.to_string(), "storage error");
        assert_eq!(err.code(), "STORAGE_ERROR");
    }

    #[test]
    fn password_mismatch_message_matches_public_contract() {
        assert_eq!(AppError::PasswordMismatch.to_string(), "password does not match");
        assert!(!AppError::PasswordMismatch.is_internal());
    }

    #[test]
    fn token_errors_keep_their_own_code() {
        assert_eq!(AppError::from(TokenError::Expired).code(), "TOKEN_EXPIRED");
        assert_eq!(AppError::from(TokenError::Malformed).code(), "TOKEN_MALFORMED");
    }

    #[test]
    fn graphql_extension_carries_code() {
        let gql = AppError::Unauthorized.extend();
        assert_eq!(gql.message, "authentication required");
        let json = serde_json::to_value(gql.into_server_error(async_graphql::Pos::default()))
            .expect("server error serializes");
        assert_eq!(json["extensions"]["code"], "UNAUTHORIZED");
    }
}
