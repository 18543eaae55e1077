use std::future::Future;

use tracing::warn;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::error::{AppError, AppResult};

/// Identity proven by a valid access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// Central check for every operation that needs an access token.
#[derive(Clone)]
pub struct AccessGuard {
    keys: JwtKeys,
}

impl AccessGuard {
    pub fn new(keys: JwtKeys) -> Self {
        Self { keys }
    }

    /// Any failure, including a missing token or a refresh token presented
    /// as access, collapses to [`AppError::Unauthorized`].
    pub fn authorize(&self, token: Option<&str>) -> AppResult<AuthUser> {
        let Some(token) = token else {
            warn!("missing access token");
            return Err(AppError::Unauthorized);
        };
        match self.keys.verify(token, TokenKind::Access) {
            Ok(user_id) => Ok(AuthUser(user_id)),
            Err(reason) => {
                warn!(%reason, "access token rejected");
                Err(AppError::Unauthorized)
            }
        }
    }

    /// Run `resolver` with the caller's identity, or reject before it runs.
    pub async fn protect<T, F, Fut>(&self, token: Option<&str>, resolver: F) -> AppResult<T>
    where
        F: FnOnce(AuthUser) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let user = self.authorize(token)?;
        resolver(user).await
    }
}
