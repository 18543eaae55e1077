use async_trait::async_trait;
use sqlx::SqlitePool;

use super::repo_types::{Category, NewProduct, Product};
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_category(&self, name: &str) -> AppResult<Category>;
    async fn find_category(&self, id: i64) -> AppResult<Option<Category>>;
    async fn list_categories(&self) -> AppResult<Vec<Category>>;

    /// Fails with [`AppError::DuplicateName`] when the product name is taken.
    async fn create_product(&self, product: NewProduct) -> AppResult<Product>;
    async fn find_product(&self, id: i64) -> AppResult<Option<Product>>;
    async fn list_products(&self) -> AppResult<Vec<Product>>;
    async fn list_products_by_category(&self, category_id: i64) -> AppResult<Vec<Product>>;
}

const PRODUCT_COLUMNS: &str = "id, name, description, price, quantity, category_id";

#[derive(Clone)]
pub struct SqlCatalogStore {
    db: SqlitePool,
}

impl SqlCatalogStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl CatalogStore for SqlCatalogStore {
    async fn create_category(&self, name: &str) -> AppResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES (?) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.db)
        .await?;
        Ok(category)
    }

    async fn find_category(&self, id: i64) -> AppResult<Option<Category>> {
        let category =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        Ok(category)
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn create_product(&self, product: NewProduct) -> AppResult<Product> {
        let sql = format!(
            "INSERT INTO products (name, description, price, quantity, category_id) \
             VALUES (?, ?, ?, ?, ?) RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.quantity)
            .bind(product.category_id)
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::DuplicateName {
                        entity: "product",
                        name: product.name.clone(),
                    }
                } else {
                    AppError::Storage(e)
                }
            })
    }

    async fn find_product(&self, id: i64) -> AppResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(product)
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id");
        let rows = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn list_products_by_category(&self, category_id: i64) -> AppResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category_id = ? ORDER BY id"
        );
        let rows = sqlx::query_as::<_, Product>(&sql)
            .bind(category_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn dune(category_id: Option<i64>) -> NewProduct {
        NewProduct {
            name: "Dune".into(),
            description: Some("sci-fi".into()),
            price: 9.99,
            quantity: 3,
            category_id,
        }
    }

    #[tokio::test]
    async fn products_belong_to_categories() {
        let store = SqlCatalogStore::new(db::connect_in_memory().await.expect("db"));
        let books = store.create_category("Books").await.expect("category");
        let games = store.create_category("Games").await.expect("category");
        let product = store.create_product(dune(Some(books.id))).await.expect("product");

        assert_eq!(store.find_product(product.id).await.expect("query"), Some(product.clone()));
        assert_eq!(
            store.list_products_by_category(books.id).await.expect("query"),
            vec![product]
        );
        assert!(store.list_products_by_category(games.id).await.expect("query").is_empty());
        assert_eq!(store.list_categories().await.expect("query").len(), 2);
    }

    #[tokio::test]
    async fn duplicate_product_name_is_reported() {
        let store = SqlCatalogStore::new(db::connect_in_memory().await.expect("db"));
        store.create_product(dune(None)).await.expect("first");
        let err = store.create_product(dune(None)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateName { entity: "product", .. }));
        assert_eq!(store.list_products().await.expect("query").len(), 1);
    }

    #[tokio::test]
    async fn foreign_key_backs_the_category_reference() {
        let store = SqlCatalogStore::new(db::connect_in_memory().await.expect("db"));
        let err = store.create_product(dune(Some(42))).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
