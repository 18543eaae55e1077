use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

/// Token carried in `Authorization: Bearer <token>`, if any.
///
/// Never rejects: public operations must still work without (or with a
/// broken) header, and protected ones are refused later by the guard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    fn from_header(value: &str) -> Option<String> {
        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))?
            .trim();
        (!token.is_empty()).then(|| token.to_string())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
            return Ok(BearerToken(None));
        };
        let token = header.to_str().ok().and_then(BearerToken::from_header);
        if token.is_none() {
            debug!("ignoring Authorization header without a bearer token");
        }
        Ok(BearerToken(token))
    }
}
