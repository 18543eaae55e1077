use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    claims::TokenKind,
    dto::{RegisterRequest, TokenPair},
    guard::{AccessGuard, AuthUser},
    jwt::JwtKeys,
    password::PasswordHasher,
    repo::CredentialStore,
    repo_types::{NewUser, User},
};
use crate::error::{AppError, AppResult};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Registration, login, refresh and current-user resolution.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    keys: JwtKeys,
    guard: AccessGuard,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        keys: JwtKeys,
        guard: AccessGuard,
    ) -> Self {
        Self {
            users,
            hasher,
            keys,
            guard,
        }
    }

    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn register(&self, req: RegisterRequest) -> AppResult<User> {
        if req.password != req.password_confirm {
            warn!("password confirmation mismatch");
            return Err(AppError::PasswordMismatch);
        }

        let email = req.email.trim().to_lowercase();
        let username = req.username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::validation("username is required"));
        }
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::validation("a valid email is required"));
        }
        if req.password.is_empty() {
            return Err(AppError::validation("password is required"));
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let user = self
            .users
            .create(NewUser {
                username,
                email,
                password_hash,
            })
            .await
            .map_err(|e| {
                match &e {
                    AppError::DuplicateIdentity { field } => warn!(field, "identity already registered"),
                    other => error!(error = ?other, "create user failed"),
                }
                e
            })?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password produce the same error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let pair = TokenPair {
            access_token: self.keys.sign_access(user.id)?,
            refresh_token: self.keys.sign_refresh(user.id)?,
        };
        self.users
            .record_login(user.id, OffsetDateTime::now_utc())
            .await?;

        info!(user_id = user.id, "user logged in");
        Ok(pair)
    }

    /// Exchange a refresh token for a new access token. The refresh token
    /// itself stays valid until it expires.
    #[instrument(skip_all)]
    pub fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let user_id = self
            .keys
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                warn!(reason = %e, "refresh token rejected");
                e
            })?;
        let access = self.keys.sign_access(user_id)?;
        info!(user_id, "access token refreshed");
        Ok(access)
    }

    /// Fails closed: a bad token or a vanished user are both `Unauthorized`.
    #[instrument(skip_all)]
    pub async fn resolve_current_user(&self, access_token: Option<&str>) -> AppResult<User> {
        self.guard
            .protect(access_token, |AuthUser(id)| async move {
                match self.users.find_by_id(id).await? {
                    Some(user) => Ok(user),
                    None => {
                        warn!(user_id = id, "token for unknown user");
                        Err(AppError::Unauthorized)
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenError;
    use crate::config::AppConfig;
    use crate::db;
    use crate::state::AppState;
    use sqlx::SqlitePool;

    fn register_req(email: &str, username: &str, pw1: &str, pw2: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            username: username.into(),
            password: pw1.into(),
            password_confirm: pw2.into(),
        }
    }

    async fn state_with_db() -> (AppState, SqlitePool) {
        let db = db::connect_in_memory().await.expect("in-memory db");
        let state = AppState::from_parts(db.clone(), &AppConfig::for_tests()).expect("state");
        (state, db)
    }

    /// Keys sharing the secret and claims of the test state.
    fn test_keys() -> JwtKeys {
        JwtKeys::from_config(&AppConfig::for_tests().jwt)
    }

    async fn user_count(db: &SqlitePool) -> i64 {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await
            .expect("count users");
        n
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no at sign.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn register_login_and_resolve_current_user() {
        let state = AppState::in_memory().await;
        let user = state
            .auth
            .register(register_req("a@x.com", "alice", "pw1", "pw1"))
            .await
            .expect("register");
        assert_ne!(user.password_hash, "pw1");

        let pair = state.auth.login("a@x.com", "pw1").await.expect("login");
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());

        let me = state
            .auth
            .resolve_current_user(Some(&pair.access_token))
            .await
            .expect("current user");
        assert_eq!(me.username, "alice");
        assert_eq!(me.id, user.id);
        assert!(me.last_login.is_some());
    }

    #[tokio::test]
    async fn mismatched_passwords_create_nothing() {
        let (state, db) = state_with_db().await;
        let err = state
            .auth
            .register(register_req("a@x.com", "alice", "pw1", "pw2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PasswordMismatch));
        assert_eq!(err.to_string(), "password does not match");
        assert_eq!(user_count(&db).await, 0);
    }

    #[tokio::test]
    async fn duplicate_email_keeps_single_row() {
        let (state, db) = state_with_db().await;
        state
            .auth
            .register(register_req("a@x.com", "alice", "pw", "pw"))
            .await
            .expect("first register");
        let err = state
            .auth
            .register(register_req("A@X.com ", "alice2", "pw", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateIdentity { field: "email" }));
        assert_eq!(user_count(&db).await, 1);
    }

    #[tokio::test]
    async fn blank_fields_are_validation_errors() {
        let (state, db) = state_with_db().await;
        for req in [
            register_req("a@x.com", "  ", "pw", "pw"),
            register_req("not-an-email", "alice", "pw", "pw"),
            register_req("a@x.com", "alice", "", ""),
        ] {
            let err = state.auth.register(req).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
        }
        assert_eq!(user_count(&db).await, 0);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let state = AppState::in_memory().await;
        state
            .auth
            .register(register_req("a@x.com", "alice", "pw1", "pw1"))
            .await
            .expect("register");

        let wrong_pw = state.auth.login("a@x.com", "nope").await.unwrap_err();
        let unknown = state.auth.login("b@x.com", "pw1").await.unwrap_err();
        assert!(matches!(wrong_pw, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
        assert_eq!(wrong_pw.code(), unknown.code());
    }

    #[tokio::test]
    async fn refresh_issues_access_for_same_identity() {
        let state = AppState::in_memory().await;
        let keys = test_keys();
        let refresh = keys.sign_refresh(11).expect("sign refresh");
        let access = state.auth.refresh(&refresh).expect("refresh");
        assert_eq!(keys.verify(&access, TokenKind::Access), Ok(11));
        // not rotated: the same refresh token works again
        assert!(state.auth.refresh(&refresh).is_ok());
    }

    #[tokio::test]
    async fn refresh_rejects_access_tokens_and_garbage() {
        let state = AppState::in_memory().await;
        let keys = test_keys();
        let access = keys.sign_access(11).expect("sign access");
        assert!(matches!(
            state.auth.refresh(&access),
            Err(AppError::Token(TokenError::Invalid))
        ));
        assert!(matches!(
            state.auth.refresh("x.y"),
            Err(AppError::Token(TokenError::Malformed))
        ));
    }

    #[tokio::test]
    async fn resolve_current_user_fails_closed() {
        let state = AppState::in_memory().await;
        let keys = test_keys();
        let err = state.auth.resolve_current_user(None).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        // valid token, but no such user row
        let orphan = keys.sign_access(999).expect("sign access");
        let err = state
            .auth
            .resolve_current_user(Some(&orphan))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
