//! # Customer Repository (SQLite)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use keystone_core::{Customer, Money};

use super::{validate_customer, CustomerRepository};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone, sqlx::FromRow)]
struct CustomerRecord {
    id: String,
    name: String,
    email: String,
    purchase_total_cents: i64,
    purchase_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRecord> for Customer {
    fn from(row: CustomerRecord) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            purchase_total_cents: row.purchase_total_cents,
            purchase_count: row.purchase_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// SQLite-backed [`CustomerRepository`].
#[derive(Debug, Clone)]
pub struct SqliteCustomerRepository {
    pool: SqlitePool,
}

impl SqliteCustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteCustomerRepository { pool }
    }
}

#[async_trait]
impl CustomerRepository for SqliteCustomerRepository {
    async fn get(&self, id: &str) -> DbResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRecord>(
            r#"
            SELECT
                id, name, email, purchase_total_cents, purchase_count,
                created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");
        validate_customer(customer)?;

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, email, purchase_total_cents, purchase_count,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(customer.purchase_total_cents)
        .bind(customer.purchase_count)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_purchase(&self, id: &str, amount: Money) -> DbResult<Customer> {
        if amount.is_negative() {
            return Err(DbError::InvalidArgument(format!(
                "purchase amount must not be negative, got {}",
                amount
            )));
        }
        debug!(id = %id, amount_cents = amount.cents(), "Recording purchase");

        let row = sqlx::query_as::<_, CustomerRecord>(
            r#"
            UPDATE customers SET
                purchase_total_cents = purchase_total_cents + ?2,
                purchase_count = purchase_count + 1,
                updated_at = ?3
            WHERE id = ?1
            RETURNING
                id, name, email, purchase_total_cents, purchase_count,
                created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(amount.cents())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::from)
            .ok_or_else(|| DbError::not_found("Customer", id))
    }
}
