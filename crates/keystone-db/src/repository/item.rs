//! # Item Repository (SQLite)
//!
//! Catalog items and stock movements on the `items` table.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Decrement                                  │
//! │                                                                     │
//! │  ❌ WRONG: read stock, compute, write absolute value               │
//! │     (two terminals selling at once lose an update)                 │
//! │                                                                     │
//! │  ✅ CORRECT: one guarded delta statement                           │
//! │     UPDATE items SET stock = stock - ?2                            │
//! │     WHERE id = ?1 AND stock >= ?2                                  │
//! │                                                                     │
//! │  No row updated → the item is missing or stock is too low.         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use keystone_core::Item;

use super::{ensure_positive, validate_item, ItemRepository};
use crate::error::{DbError, DbResult};

/// Row shape of the `items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemRecord {
    id: String,
    sku: String,
    name: String,
    category: String,
    description: Option<String>,
    price_cents: i64,
    stock: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRecord> for Item {
    fn from(row: ItemRecord) -> Self {
        Item {
            id: row.id,
            sku: row.sku,
            name: row.name,
            category: row.category,
            description: row.description,
            price_cents: row.price_cents,
            stock: row.stock,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_ITEM: &str = r#"
    SELECT
        id, sku, name, category, description,
        price_cents, stock, is_active, created_at, updated_at
    FROM items
"#;

/// SQLite-backed [`ItemRepository`].
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.items();
/// let item = repo.get("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct SqliteItemRepository {
    pool: SqlitePool,
}

impl SqliteItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteItemRepository { pool }
    }

    /// Counts active items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn get(&self, id: &str) -> DbResult<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRecord>(&format!("{} WHERE id = ?1", SELECT_ITEM))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Item::from))
    }

    async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRecord>(&format!("{} WHERE sku = ?1", SELECT_ITEM))
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Item::from))
    }

    async fn list_active(&self, limit: u32) -> DbResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRecord>(&format!(
            "{} WHERE is_active = 1 ORDER BY name LIMIT ?1",
            SELECT_ITEM
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Listed active items");
        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn insert(&self, item: &Item) -> DbResult<()> {
        debug!(sku = %item.sku, "Inserting item");
        validate_item(item)?;

        sqlx::query(
            r#"
            INSERT INTO items (
                id, sku, name, category, description,
                price_cents, stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.description)
        .bind(item.price_cents)
        .bind(item.stock)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                value: if field == "sku" { item.sku.clone() } else { item.id.clone() },
                field,
            },
            other => other,
        })?;

        Ok(())
    }

    async fn update(&self, item: &Item) -> DbResult<()> {
        debug!(id = %item.id, "Updating item");
        validate_item(item)?;

        let result = sqlx::query(
            r#"
            UPDATE items SET
                sku = ?2,
                name = ?3,
                category = ?4,
                description = ?5,
                price_cents = ?6,
                stock = ?7,
                is_active = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.description)
        .bind(item.price_cents)
        .bind(item.stock)
        .bind(item.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", &item.id));
        }

        Ok(())
    }

    async fn decrement_stock(&self, id: &str, quantity: i64) -> DbResult<i64> {
        ensure_positive("quantity", quantity)?;
        debug!(id = %id, quantity, "Decrementing stock");

        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE items
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            RETURNING stock
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(remaining);
        }

        match self.get(id).await? {
            Some(item) => {
                warn!(id = %id, available = item.stock, requested = quantity, "Stock decrement refused");
                Err(DbError::InsufficientStock {
                    id: id.to_string(),
                    available: item.stock,
                    requested: quantity,
                })
            }
            None => Err(DbError::not_found("Item", id)),
        }
    }

    async fn restock(&self, id: &str, quantity: i64) -> DbResult<i64> {
        ensure_positive("quantity", quantity)?;
        debug!(id = %id, quantity, "Restocking");

        let stock: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE items
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING stock
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        stock.ok_or_else(|| DbError::not_found("Item", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use keystone_core::Money;

    async fn repo() -> SqliteItemRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.items()
    }

    fn monitor(stock: i64) -> Item {
        Item::new("MON-01", "Monitor", "Electronics", Money::from_cents(10000), stock)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let item = monitor(5);
        repo.insert(&item).await.unwrap();

        let stored = repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.sku, "MON-01");
        assert_eq!(stored.price_cents, 10000);
        assert!(stored.is_active);

        assert!(repo.get_by_sku("MON-01").await.unwrap().is_some());
        assert!(repo.get("missing").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let repo = repo().await;
        repo.insert(&monitor(5)).await.unwrap();

        match repo.insert(&monitor(2)).await {
            Err(DbError::UniqueViolation { field, value }) => {
                assert_eq!(field, "sku");
                assert_eq!(value, "MON-01");
            }
            other => panic!("expected unique violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_negative_price_is_invalid_argument() {
        let repo = repo().await;
        let mut item = monitor(5);
        item.price_cents = -500;

        match repo.insert(&item).await {
            Err(DbError::InvalidArgument(message)) => assert!(message.contains("price")),
            other => panic!("expected invalid argument, got {:?}", other),
        }
        assert_eq!(repo.count().await.unwrap(), 0);

        item.price_cents = 500;
        repo.insert(&item).await.unwrap();
        item.price_cents = -1;
        assert!(matches!(repo.update(&item).await, Err(DbError::InvalidArgument(_))));
        assert_eq!(repo.get(&item.id).await.unwrap().unwrap().price_cents, 500);
    }

    #[tokio::test]
    async fn test_check_constraint_maps_to_invalid_argument() {
        let repo = repo().await;
        let item = monitor(2);
        repo.insert(&item).await.unwrap();

        let err = sqlx::query("UPDATE items SET stock = -1 WHERE id = ?1")
            .bind(&item.id)
            .execute(&repo.pool)
            .await
            .map_err(DbError::from)
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_decrement_stock_refuses_negative() {
        let repo = repo().await;
        let item = monitor(3);
        repo.insert(&item).await.unwrap();

        assert_eq!(repo.decrement_stock(&item.id, 2).await.unwrap(), 1);
        assert!(matches!(
            repo.decrement_stock(&item.id, 2).await,
            Err(DbError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            })
        ));
        assert_eq!(repo.get(&item.id).await.unwrap().unwrap().stock, 1);

        assert!(matches!(
            repo.decrement_stock("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_restock_and_list() {
        let repo = repo().await;
        let mut item = monitor(0);
        repo.insert(&item).await.unwrap();

        item.is_active = false;
        repo.update(&item).await.unwrap();
        assert!(repo.list_active(10).await.unwrap().is_empty());

        assert_eq!(repo.restock(&item.id, 7).await.unwrap(), 7);

        let ghost = monitor(1);
        assert!(matches!(
            repo.update(&ghost).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
