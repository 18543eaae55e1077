use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::{
    guard::AccessGuard, jwt::JwtKeys, password::PasswordHasher, repo::SqlUserStore,
    services::AuthService,
};
use crate::catalog::{repo::SqlCatalogStore, services::CatalogService};
use crate::config::AppConfig;
use crate::db;

/// Everything a request needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub guard: AccessGuard,
    pub auth: AuthService,
    pub catalog: CatalogService,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database_url).await?;
        Self::from_parts(db, &config)
    }

    pub fn from_parts(db: SqlitePool, config: &AppConfig) -> anyhow::Result<Self> {
        let keys = JwtKeys::from_config(&config.jwt);
        let guard = AccessGuard::new(keys.clone());
        let hasher = PasswordHasher::new(&config.password)?;
        let auth = AuthService::new(
            Arc::new(SqlUserStore::new(db.clone())),
            hasher,
            keys,
            guard.clone(),
        );
        let catalog = CatalogService::new(Arc::new(SqlCatalogStore::new(db)));
        Ok(Self {
            guard,
            auth,
            catalog,
        })
    }
}

#[cfg(test)]
impl AppState {
    pub async fn in_memory() -> Self {
        let db = db::connect_in_memory().await.expect("in-memory db");
        Self::from_parts(db, &AppConfig::for_tests()).expect("state")
    }
}
