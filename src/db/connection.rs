use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::debug;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL")
                .unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE")
                .unwrap_or_else(|_| "storefront".to_string()),
            database: env::var("SURREALDB_DATABASE")
                .unwrap_or_else(|_| "api".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

/// Define tables and indexes. Safe to run against an existing database.
pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = [
        // Accounts. Email uniqueness is enforced here, not by the handlers.
        "DEFINE TABLE IF NOT EXISTS user SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS createdAt ON TABLE user VALUE $before OR time::now();
         DEFINE FIELD IF NOT EXISTS updatedAt ON TABLE user VALUE time::now();
         DEFINE INDEX IF NOT EXISTS user_user_id ON TABLE user COLUMNS userId UNIQUE;
         DEFINE INDEX IF NOT EXISTS user_email ON TABLE user COLUMNS email UNIQUE;
         DEFINE INDEX IF NOT EXISTS user_role ON TABLE user COLUMNS role;",

        // Catalog
        "DEFINE TABLE IF NOT EXISTS product SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS createdAt ON TABLE product VALUE $before OR time::now();
         DEFINE FIELD IF NOT EXISTS updatedAt ON TABLE product VALUE time::now();
         DEFINE INDEX IF NOT EXISTS product_product_id ON TABLE product COLUMNS productId UNIQUE;",

        // One review per (product, user)
        "DEFINE TABLE IF NOT EXISTS review SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS createdAt ON TABLE review VALUE $before OR time::now();
         DEFINE FIELD IF NOT EXISTS updatedAt ON TABLE review VALUE time::now();
         DEFINE INDEX IF NOT EXISTS review_review_id ON TABLE review COLUMNS reviewId UNIQUE;
         DEFINE INDEX IF NOT EXISTS review_product_user ON TABLE review COLUMNS productId, userId UNIQUE;",

        "DEFINE TABLE IF NOT EXISTS orders SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS createdAt ON TABLE orders VALUE $before OR time::now();
         DEFINE FIELD IF NOT EXISTS updatedAt ON TABLE orders VALUE time::now();
         DEFINE INDEX IF NOT EXISTS orders_order_id ON TABLE orders COLUMNS orderId UNIQUE;
         DEFINE INDEX IF NOT EXISTS orders_user_id ON TABLE orders COLUMNS userId;",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    debug!("Database schema ensured");

    Ok(())
}

#[cfg(test)]
pub(crate) async fn setup_test_db() -> Db {
    let config = DatabaseConfig {
        url: "memory".to_string(),
        ..Default::default()
    };
    let db = create_connection(config).await.unwrap();
    ensure_schema(&db).await.unwrap();
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let db = setup_test_db().await;
        ensure_schema(&db).await.unwrap();
    }

    #[test]
    fn test_default_config_uses_memory() {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        assert_eq!(config.url, "memory");
        assert!(!config.namespace.is_empty());
    }
}
