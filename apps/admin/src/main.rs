//! # Keystone Admin
//!
//! Boots the back office: logging, configuration, storage and services.
//!
//! ## Usage
//! ```text
//! keystone-admin [path/to/keystone.toml]
//! RUST_LOG=keystone_db=trace keystone-admin
//! ```

use std::path::PathBuf;

use tracing::{info, warn};

use keystone_admin::{telemetry, AdminConfig, Backoffice};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    info!("Starting Keystone back office...");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AdminConfig::load(config_path)?;
    info!(
        store = %config.store.name,
        tax_rate = config.tax_rate().percentage(),
        policy = %config.access.policy,
        database = %config.database_path().display(),
        "Configuration loaded"
    );

    let office = Backoffice::open(config).await?;

    let (embedded, applied) = office.database.migration_status().await?;
    info!(embedded, applied, "Database migrations complete");

    if !office.database.health_check().await {
        warn!("Database health check failed");
    }

    info!(
        permissions = office.authorizer.table().permissions().count(),
        "Back office ready"
    );

    office.close().await;
    info!("Shutdown complete");

    Ok(())
}
