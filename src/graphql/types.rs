use async_graphql::{ComplexObject, Context, ErrorExtensions, Result, SimpleObject};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::error;

use crate::auth::repo_types::User;
use crate::catalog::repo_types::{Category, Product};
use crate::error::AppError;
use crate::state::AppState;

fn rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_default()
}

/// Public view of a user. The password hash is never exposed.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "User")]
pub struct UserObject {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created: String,
    pub last_login: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<User> for UserObject {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            created: rfc3339(u.created_at),
            last_login: u.last_login.map(rfc3339),
            first_name: u.first_name,
            last_name: u.last_name,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Category", complex)]
pub struct CategoryObject {
    pub pk: i64,
    pub name: String,
}

#[ComplexObject]
impl CategoryObject {
    async fn products(&self, ctx: &Context<'_>) -> Result<Vec<ProductObject>> {
        let state = ctx.data::<AppState>()?;
        let rows = state
            .catalog
            .products_in_category(self.pk)
            .await
            .map_err(|e| e.extend())?;
        Ok(rows.into_iter().map(ProductObject::from).collect())
    }
}

impl From<Category> for CategoryObject {
    fn from(c: Category) -> Self {
        Self {
            pk: c.id,
            name: c.name,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Product", complex)]
pub struct ProductObject {
    pub pk: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub quantity: i64,
    #[graphql(skip)]
    pub category_id: Option<i64>,
}

#[ComplexObject]
impl ProductObject {
    async fn category(&self, ctx: &Context<'_>) -> Result<Option<CategoryObject>> {
        let Some(id) = self.category_id else {
            return Ok(None);
        };
        let state = ctx.data::<AppState>()?;
        let category = state.catalog.get_category(id).await.map_err(|e| e.extend())?;
        Ok(category.map(CategoryObject::from))
    }
}

impl From<Product> for ProductObject {
    fn from(p: Product) -> Self {
        Self {
            pk: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            quantity: p.quantity,
            category_id: p.category_id,
        }
    }
}

/// Message and code placed in a mutation payload. Internal failures are
/// logged here with their cause; only the generic message leaves the server.
pub(crate) fn payload_error(e: &AppError) -> (Option<String>, Option<String>) {
    if e.is_internal() {
        error!(error = ?e, "mutation failed");
    }
    (Some(e.to_string()), Some(e.code().to_string()))
}

#[derive(Debug, Default, SimpleObject)]
pub struct RegisterPayload {
    pub msg: Option<String>,
    pub success: bool,
    pub error: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Default, SimpleObject)]
pub struct LoginPayload {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub error: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Default, SimpleObject)]
pub struct RefreshPayload {
    pub new_token: Option<String>,
    pub error: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Default, SimpleObject)]
pub struct CategoryPayload {
    pub category: Option<CategoryObject>,
    pub success: bool,
    pub error: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Default, SimpleObject)]
pub struct ProductPayload {
    pub product: Option<ProductObject>,
    pub success: bool,
    pub error: Option<String>,
    pub code: Option<String>,
}
