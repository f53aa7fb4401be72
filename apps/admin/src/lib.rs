//! # keystone-admin: Back-Office Service Layer
//!
//! Wires the pure rules in `keystone-core` to storage in `keystone-db` and
//! gives the dashboard one error surface ([`ApiError`]).
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Back Office Startup                                  │
//! │                                                                         │
//! │  1. telemetry::init_tracing()                                          │
//! │  2. AdminConfig::load()      defaults → keystone.toml → KEYSTONE_*     │
//! │  3. Backoffice::open()                                                 │
//! │       ├── Authorizer         role table + access policy                │
//! │       ├── Database           SQLite pool, migrations                   │
//! │       ├── SessionManager     argon2 + JWT                              │
//! │       └── CheckoutService    authorizer + item/customer repositories   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod checkout;
pub mod config;
pub mod error;
pub mod telemetry;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use keystone_core::Authorizer;
use keystone_db::{Database, DbConfig, DbError};

pub use auth::{AuthError, Session, SessionManager, UserDirectory};
pub use checkout::{CheckoutService, CompletedSale};
pub use config::{AdminConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};

/// Startup failures.
#[derive(Debug, Error)]
pub enum BootError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Failed to create data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

/// The assembled back office.
pub struct Backoffice {
    pub config: AdminConfig,
    pub authorizer: Authorizer,
    pub database: Database,
    pub sessions: SessionManager,
    pub checkout: CheckoutService,
}

impl Backoffice {
    /// Opens storage and builds the services for `config`.
    pub async fn open(config: AdminConfig) -> Result<Self, BootError> {
        let authorizer = config.authorizer()?;
        info!(
            policy = %authorizer.policy(),
            roles = authorizer.table().roles_by_level().len(),
            "Authorizer ready"
        );

        let path = config.database_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let database = Database::new(
            DbConfig::new(path).max_connections(config.database.max_connections),
        )
        .await?;

        let sessions = SessionManager::new(
            config.session.jwt_secret.clone(),
            config.session.ttl_secs,
            UserDirectory::new(),
        );

        let checkout = CheckoutService::new(
            authorizer.clone(),
            Arc::new(database.items()),
            Arc::new(database.customers()),
            config.tax_rate(),
        );

        Ok(Backoffice {
            config,
            authorizer,
            database,
            sessions,
            checkout,
        })
    }

    pub async fn close(&self) {
        self.database.close().await;
    }
}
