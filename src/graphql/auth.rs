use async_graphql::{Context, ErrorExtensions, Object, Result};

use super::types::{payload_error, LoginPayload, RefreshPayload, RegisterPayload, UserObject};
use super::bearer;
use crate::auth::dto::RegisterRequest;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Default)]
pub struct AuthMutation;

#[Object]
impl AuthMutation {
    async fn register(
        &self,
        ctx: &Context<'_>,
        email: String,
        username: String,
        password1: String,
        password2: String,
    ) -> Result<RegisterPayload> {
        let state = ctx.data::<AppState>()?;
        let req = RegisterRequest {
            email,
            username,
            password: password1,
            password_confirm: password2,
        };
        Ok(match state.auth.register(req).await {
            Ok(_) => RegisterPayload {
                msg: Some("Account Created successfully".into()),
                success: true,
                ..Default::default()
            },
            Err(e) => {
                let (error, code) = payload_error(&e);
                RegisterPayload {
                    error,
                    code,
                    ..Default::default()
                }
            }
        })
    }

    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> Result<LoginPayload> {
        let state = ctx.data::<AppState>()?;
        Ok(match state.auth.login(&email, &password).await {
            Ok(pair) => LoginPayload {
                access: Some(pair.access_token),
                refresh: Some(pair.refresh_token),
                ..Default::default()
            },
            Err(e) => {
                let (error, code) = payload_error(&e);
                LoginPayload {
                    error,
                    code,
                    ..Default::default()
                }
            }
        })
    }

    /// Exchanges the refresh token sent as `Authorization: Bearer <refresh>`
    /// for a new access token.
    async fn refresh(&self, ctx: &Context<'_>) -> Result<RefreshPayload> {
        let state = ctx.data::<AppState>()?;
        let refreshed = match bearer(ctx) {
            Some(token) => state.auth.refresh(token),
            None => Err(AppError::Unauthorized),
        };
        Ok(match refreshed {
            Ok(new_token) => RefreshPayload {
                new_token: Some(new_token),
                ..Default::default()
            },
            Err(e) => {
                let (error, code) = payload_error(&e);
                RefreshPayload {
                    error,
                    code,
                    ..Default::default()
                }
            }
        })
    }
}

#[derive(Default)]
pub struct ProfileQuery;

#[Object]
impl ProfileQuery {
    /// The caller's own record; requires an access token.
    async fn profile(&self, ctx: &Context<'_>) -> Result<UserObject> {
        let state = ctx.data::<AppState>()?;
        let user = state
            .auth
            .resolve_current_user(bearer(ctx))
            .await
            .map_err(|e| e.extend())?;
        Ok(user.into())
    }
}
