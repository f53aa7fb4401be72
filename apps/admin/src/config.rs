//! # Admin Configuration
//!
//! Configuration for the back-office service, loaded once at startup.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KEYSTONE_TAX_RATE=8.25                                             │
//! │     KEYSTONE_ACCESS_POLICY=level_inherited                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $KEYSTONE_CONFIG, or                                               │
//! │     ~/.config/keystone/keystone.toml (Linux)                           │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     8% tax, explicit access policy, built-in role table                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! name = "Keystone Games"
//! currency_symbol = "$"
//!
//! [pos]
//! tax_rate_bps = 800
//!
//! [database]
//! path = "/var/lib/keystone/keystone.db"
//!
//! [access]
//! policy = "explicit"           # explicit | level_inherited
//! role_table = "roles.json"     # optional; built-in table when absent
//!
//! [session]
//! jwt_secret = "..."
//! ttl_secs = 28800
//! ```
//!
//! Configuration is read-only after load, so it is shared without locks.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use keystone_core::validation::validate_tax_rate_bps;
use keystone_core::{AccessPolicy, Authorizer, CoreError, Money, RoleTable, TaxRate};

/// Development-only signing secret; `validate` warns when it is in use.
const DEV_JWT_SECRET: &str = "keystone-dev-secret-change-in-production";

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to load role table: {0}")]
    RoleTable(#[from] CoreError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Store identity shown on receipts and the dashboard header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub name: String,
    pub currency_symbol: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: "Keystone Store".to_string(),
            currency_symbol: "$".to_string(),
        }
    }
}

/// Point-of-sale settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosSettings {
    /// Sales tax in basis points (800 = 8%).
    pub tax_rate_bps: u32,
}

impl Default for PosSettings {
    fn default() -> Self {
        PosSettings {
            tax_rate_bps: keystone_core::DEFAULT_TAX_RATE_BPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file; the platform data directory when unset.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: 5,
        }
    }
}

/// Authorization settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    pub policy: AccessPolicy,
    /// JSON role table document; the built-in five-tier table when unset.
    pub role_table: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub jwt_secret: String,
    /// Session lifetime in seconds.
    pub ttl_secs: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            ttl_secs: 8 * 60 * 60,
        }
    }
}

// =============================================================================
// Admin Configuration
// =============================================================================

/// Complete back-office configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub pos: PosSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub access: AccessSettings,

    #[serde(default)]
    pub session: SessionSettings,
}

impl AdminConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else `$KEYSTONE_CONFIG`, else the
    ///    platform config directory); a missing file is not an error
    /// 3. `KEYSTONE_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let path = config_path
            .or_else(|| std::env::var("KEYSTONE_CONFIG").ok().map(PathBuf::from))
            .or_else(Self::default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                info!(?path, "Loading config from file");
                Self::from_file(&path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `KEYSTONE_*` overrides read through `lookup`.
    ///
    /// Unparsable values are errors rather than silently ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("KEYSTONE_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(rate) = lookup("KEYSTONE_TAX_RATE") {
            let percent: f64 = rate
                .trim()
                .parse()
                .map_err(|_| invalid("KEYSTONE_TAX_RATE", format!("'{}' is not a percentage", rate)))?;
            if !(0.0..=100.0).contains(&percent) {
                return Err(invalid("KEYSTONE_TAX_RATE", "must be between 0 and 100"));
            }
            debug!(percent, "Overriding tax rate from environment");
            self.pos.tax_rate_bps = TaxRate::from_percentage(percent).bps();
        }

        if let Some(path) = lookup("KEYSTONE_DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(policy) = lookup("KEYSTONE_ACCESS_POLICY") {
            self.access.policy = policy
                .parse()
                .map_err(|e: keystone_core::ValidationError| invalid("KEYSTONE_ACCESS_POLICY", e.to_string()))?;
            debug!(policy = %self.access.policy, "Overriding access policy from environment");
        }

        if let Some(path) = lookup("KEYSTONE_ROLE_TABLE") {
            self.access.role_table = Some(PathBuf::from(path));
        }

        if let Some(secret) = lookup("KEYSTONE_JWT_SECRET") {
            self.session.jwt_secret = secret;
        }

        if let Some(ttl) = lookup("KEYSTONE_SESSION_TTL_SECS") {
            self.session.ttl_secs = ttl
                .trim()
                .parse()
                .map_err(|_| invalid("KEYSTONE_SESSION_TTL_SECS", format!("'{}' is not a number", ttl)))?;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.store.name.trim().is_empty() {
            return Err(invalid("store.name", "must not be empty"));
        }

        validate_tax_rate_bps(self.pos.tax_rate_bps)
            .map_err(|e| invalid("pos.tax_rate_bps", e.to_string()))?;

        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections", "must be greater than 0"));
        }

        if self.session.jwt_secret.len() < 16 {
            return Err(invalid("session.jwt_secret", "must be at least 16 bytes"));
        }
        if self.session.jwt_secret == DEV_JWT_SECRET {
            warn!("Using the development JWT secret; set KEYSTONE_JWT_SECRET in production");
        }

        if self.session.ttl_secs <= 0 {
            return Err(invalid("session.ttl_secs", "must be greater than 0"));
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "keystone", "keystone")
            .map(|dirs| dirs.config_dir().join("keystone.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.pos.tax_rate_bps)
    }

    /// Database file: configured path, else `keystone.db` in the platform
    /// data directory, else the working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        ProjectDirs::from("com", "keystone", "keystone")
            .map(|dirs| dirs.data_dir().join("keystone.db"))
            .unwrap_or_else(|| PathBuf::from("keystone.db"))
    }

    /// Loads the configured role table, or the built-in one.
    pub fn role_table(&self) -> ConfigResult<RoleTable> {
        match &self.access.role_table {
            Some(path) => {
                info!(?path, "Loading role table");
                let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(RoleTable::from_json(&json)?)
            }
            None => Ok(RoleTable::default()),
        }
    }

    /// Builds the permission evaluator for this configuration.
    pub fn authorizer(&self) -> ConfigResult<Authorizer> {
        Ok(Authorizer::new(self.role_table()?, self.access.policy))
    }

    /// Formats an amount for display.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_admin::config::AdminConfig;
    /// use keystone_core::Money;
    ///
    /// let config = AdminConfig::default();
    /// assert_eq!(config.format_currency(Money::from_cents(21600)), "$216.00");
    /// assert_eq!(config.format_currency(Money::from_cents(-550)), "-$5.50");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            self.store.currency_symbol,
            amount.dollars().abs(),
            amount.cents_part()
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AdminConfig::default();
        config.validate().unwrap();
        assert_eq!(config.tax_rate().bps(), 800);
        assert_eq!(config.access.policy, AccessPolicy::Explicit);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AdminConfig::from_toml_str(
            r#"
            [pos]
            tax_rate_bps = 825

            [access]
            policy = "level_inherited"
            "#,
        )
        .unwrap();

        assert_eq!(config.pos.tax_rate_bps, 825);
        assert_eq!(config.access.policy, AccessPolicy::LevelInherited);
        assert_eq!(config.store.name, "Keystone Store");
        assert_eq!(config.session.ttl_secs, 8 * 60 * 60);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AdminConfig::from_toml_str("[store]\nname = \"From File\"\n").unwrap();
        config
            .apply_overrides(env(&[
                ("KEYSTONE_STORE_NAME", "From Env"),
                ("KEYSTONE_TAX_RATE", "8.25"),
                ("KEYSTONE_ACCESS_POLICY", "inherited"),
                ("KEYSTONE_SESSION_TTL_SECS", "60"),
            ]))
            .unwrap();

        assert_eq!(config.store.name, "From Env");
        assert_eq!(config.pos.tax_rate_bps, 825);
        assert_eq!(config.access.policy, AccessPolicy::LevelInherited);
        assert_eq!(config.session.ttl_secs, 60);
    }

    #[test]
    fn test_bad_env_values_are_errors() {
        let mut config = AdminConfig::default();
        assert!(config
            .apply_overrides(env(&[("KEYSTONE_TAX_RATE", "eight")]))
            .is_err());
        assert!(config
            .apply_overrides(env(&[("KEYSTONE_ACCESS_POLICY", "anarchy")]))
            .is_err());
        assert!(config
            .apply_overrides(env(&[("KEYSTONE_TAX_RATE", "150")]))
            .is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AdminConfig::default();
        config.pos.tax_rate_bps = 20_000;
        assert!(config.validate().is_err());

        let mut config = AdminConfig::default();
        config.session.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());

        let mut config = AdminConfig::default();
        config.session.ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystone.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[store]\nname = \"Tempfile Store\"\n[database]\npath = \"/tmp/k.db\"").unwrap();

        let config = AdminConfig::from_file(&path).unwrap();
        assert_eq!(config.store.name, "Tempfile Store");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/k.db"));

        assert!(matches!(
            AdminConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_role_table_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roles.json");
        std::fs::write(
            &path,
            r#"{
                "permissions": [{ "id": "pos.view" }, { "id": "pos.create" }],
                "roles": [
                    { "id": "clerk", "name": "Clerk", "level": 10, "permissions": ["pos.view"] }
                ]
            }"#,
        )
        .unwrap();

        let mut config = AdminConfig::default();
        config.access.role_table = Some(path);
        let authorizer = config.authorizer().unwrap();

        assert!(authorizer.table().role("clerk").is_some());
        assert!(authorizer.table().role("viewer").is_none());
    }

    #[test]
    fn test_format_currency() {
        let mut config = AdminConfig::default();
        assert_eq!(config.format_currency(Money::from_cents(3400)), "$34.00");
        config.store.currency_symbol = "€".to_string();
        assert_eq!(config.format_currency(Money::from_cents(5)), "€0.05");
    }
}
