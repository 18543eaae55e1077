use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::repo::CatalogStore;
use super::repo_types::{Category, NewProduct, Product};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Category names are not required to be unique.
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> AppResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("category name is required"));
        }
        let category = self.store.create_category(name).await?;
        info!(category_id = category.id, "category created");
        Ok(category)
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, mut product: NewProduct) -> AppResult<Product> {
        product.name = product.name.trim().to_string();
        if product.name.is_empty() {
            return Err(AppError::validation("product name is required"));
        }
        if !product.price.is_finite() || product.price < 0.0 {
            return Err(AppError::validation("price must be a non-negative number"));
        }
        if product.quantity < 0 {
            return Err(AppError::validation("quantity must not be negative"));
        }
        if let Some(category_id) = product.category_id {
            if self.store.find_category(category_id).await?.is_none() {
                warn!(category_id, "product references missing category");
                return Err(AppError::InvalidReference {
                    entity: "category",
                    id: category_id,
                });
            }
        }

        let product = self.store.create_product(product).await?;
        info!(product_id = product.id, "product created");
        Ok(product)
    }

    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        self.store.list_products().await
    }

    pub async fn get_product(&self, id: i64) -> AppResult<Option<Product>> {
        self.store.find_product(id).await
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.store.list_categories().await
    }

    pub async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        self.store.find_category(id).await
    }

    pub async fn products_in_category(&self, category_id: i64) -> AppResult<Vec<Product>> {
        self.store.list_products_by_category(category_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn new_product(name: &str, price: f64, quantity: i64, category_id: Option<i64>) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: Some("sci-fi".into()),
            price,
            quantity,
            category_id,
        }
    }

    #[tokio::test]
    async fn books_and_dune() {
        let state = AppState::in_memory().await;
        let books = state.catalog.create_category("Books").await.expect("category");
        assert_eq!(
            books,
            Category {
                id: 1,
                name: "Books".into()
            }
        );

        let dune = state
            .catalog
            .create_product(new_product("Dune", 9.99, 3, Some(1)))
            .await
            .expect("product");
        assert_eq!(dune.category_id, Some(1));
        assert_eq!(dune.price, 9.99);
        assert_eq!(dune.quantity, 3);

        assert_eq!(state.catalog.get_product(dune.id).await.expect("get"), Some(dune.clone()));
        assert_eq!(state.catalog.list_products().await.expect("list"), vec![dune.clone()]);
        assert_eq!(state.catalog.products_in_category(1).await.expect("list"), vec![dune]);
        assert!(state.catalog.get_product(99).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn missing_category_is_an_invalid_reference() {
        let state = AppState::in_memory().await;
        let err = state
            .catalog
            .create_product(new_product("Dune", 9.99, 3, Some(7)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidReference { entity: "category", id: 7 }));
        assert!(state.catalog.list_products().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn product_without_category_is_allowed() {
        let state = AppState::in_memory().await;
        let p = state
            .catalog
            .create_product(new_product("Loose", 1.0, 0, None))
            .await
            .expect("product");
        assert_eq!(p.category_id, None);
    }

    #[tokio::test]
    async fn rejects_bad_product_fields() {
        let state = AppState::in_memory().await;
        for p in [
            new_product("  ", 1.0, 1, None),
            new_product("Dune", -1.0, 1, None),
            new_product("Dune", f64::NAN, 1, None),
            new_product("Dune", 1.0, -3, None),
        ] {
            let err = state.catalog.create_product(p).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn blank_category_name_is_rejected() {
        let state = AppState::in_memory().await;
        let err = state.catalog.create_category(" ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(state.catalog.list_categories().await.expect("list").is_empty());
    }
}
