use async_graphql::{
    connection::{query, Connection, Edge},
    Context, ErrorExtensions, Object, Result,
};

use super::{bearer, reject_unauthorized};
use super::types::{payload_error, CategoryObject, CategoryPayload, ProductObject, ProductPayload};
use crate::catalog::repo_types::NewProduct;
use crate::state::AppState;

/// Catalog writes. Both mutations require an access token; a missing or bad
/// token is a GraphQL error, validation failures go into the payload.
#[derive(Default)]
pub struct CatalogMutation;

#[Object]
impl CatalogMutation {
    async fn category(&self, ctx: &Context<'_>, name: String) -> Result<CategoryPayload> {
        let state = ctx.data::<AppState>()?;
        let created = state
            .guard
            .protect(bearer(ctx), |_| state.catalog.create_category(&name))
            .await;

        Ok(match reject_unauthorized(created)? {
            Ok(category) => CategoryPayload {
                category: Some(category.into()),
                success: true,
                ..Default::default()
            },
            Err(e) => {
                let (error, code) = payload_error(&e);
                CategoryPayload {
                    error,
                    code,
                    ..Default::default()
                }
            }
        })
    }

    async fn product(
        &self,
        ctx: &Context<'_>,
        name: String,
        description: Option<String>,
        price: f64,
        quantity: i64,
        category: Option<i64>,
    ) -> Result<ProductPayload> {
        let state = ctx.data::<AppState>()?;
        let new = NewProduct {
            name,
            description,
            price,
            quantity,
            category_id: category,
        };
        let created = state
            .guard
            .protect(bearer(ctx), |_| state.catalog.create_product(new))
            .await;

        Ok(match reject_unauthorized(created)? {
            Ok(product) => ProductPayload {
                product: Some(product.into()),
                success: true,
                ..Default::default()
            },
            Err(e) => {
                let (error, code) = payload_error(&e);
                ProductPayload {
                    error,
                    code,
                    ..Default::default()
                }
            }
        })
    }
}

#[derive(Default)]
pub struct CatalogQuery;

#[Object]
impl CatalogQuery {
    /// All products as a relay connection; cursors are list offsets.
    async fn products(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<usize, ProductObject>> {
        let state = ctx.data::<AppState>()?;
        let all = state.catalog.list_products().await.map_err(|e| e.extend())?;

        query(
            after,
            before,
            first,
            last,
            |after: Option<usize>, before: Option<usize>, first, last| async move {
                let len = all.len();
                let end = before.unwrap_or(len).min(len);
                // cursors come from the client and may sit past the end
                let mut start = after.map_or(0, |a| a.saturating_add(1)).min(end);
                let mut end = end;
                if let Some(first) = first {
                    end = start.saturating_add(first).min(end);
                }
                if let Some(last) = last {
                    start = end.saturating_sub(last).max(start);
                }
                let mut connection = Connection::new(start > 0, end < len);
                connection.edges.extend(
                    all.into_iter()
                        .enumerate()
                        .skip(start)
                        .take(end - start)
                        .map(|(i, p)| Edge::new(i, ProductObject::from(p))),
                );
                Ok::<_, async_graphql::Error>(connection)
            },
        )
        .await
    }

    async fn product(&self, ctx: &Context<'_>, pk: i64) -> Result<Option<ProductObject>> {
        let state = ctx.data::<AppState>()?;
        let product = state.catalog.get_product(pk).await.map_err(|e| e.extend())?;
        Ok(product.map(ProductObject::from))
    }

    async fn categories(&self, ctx: &Context<'_>) -> Result<Vec<CategoryObject>> {
        let state = ctx.data::<AppState>()?;
        let rows = state.catalog.list_categories().await.map_err(|e| e.extend())?;
        Ok(rows.into_iter().map(CategoryObject::from).collect())
    }

    async fn category(&self, ctx: &Context<'_>, pk: i64) -> Result<Option<CategoryObject>> {
        let state = ctx.data::<AppState>()?;
        let category = state.catalog.get_category(pk).await.map_err(|e| e.extend())?;
        Ok(category.map(CategoryObject::from))
    }
}
