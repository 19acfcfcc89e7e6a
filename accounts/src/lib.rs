//! Heimdall Mail account configuration store
//!
//! This crate contains the account settings layer for Heimdall Mail:
//! - Key derivation and escaping for the account settings namespaces
//! - A memoizing cache of derived configuration keys
//! - The [`AccountStore`] façade with typed accessors, account lifecycle,
//!   default-account management and busy tracking
//! - Aggregated per-account records for consumers that want one value
//!   per account
//!
//! The store is synchronous and talks to an injected [`ConfigBackend`];
//! the crate ships an in-memory backend and a TOML-file backend.

pub mod backend;
pub mod cache;
pub mod data;
pub mod error;
pub mod events;
pub mod keys;
pub mod protocols;
pub mod store;

// Re-export commonly used types
pub use backend::{ConfigBackend, ConfigValue, MemoryBackend, TomlBackend};
pub use cache::{KeyCache, KeyCacheStats};
pub use data::{AccountData, ServerAccountData};
pub use error::{HeimdallError, HeimdallResult};
pub use events::AccountEvent;
pub use protocols::{AuthMechanism, ConnectionSecurity, MailProtocol, RetrieveType};
pub use store::{AccountStore, UpdateScheduler};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Heimdall Mail";

/// Default configuration directory name
pub const CONFIG_DIR_NAME: &str = "heimdall-mail";

/// Default settings filename inside the configuration directory
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// Get the default configuration directory, creating it if needed
pub fn get_config_dir() -> HeimdallResult<std::path::PathBuf> {
    let config_dir = std::env::var("HEIMDALL_MAIL_CONFIG_DIR")
        .map(std::path::PathBuf::from)
        .or_else(|_| {
            directories::ProjectDirs::from("", "", CONFIG_DIR_NAME)
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or(std::env::VarError::NotPresent)
        })
        .unwrap_or_else(|_| std::path::PathBuf::from("~/.config/heimdall-mail"));

    std::fs::create_dir_all(&config_dir)
        .map_err(|_| HeimdallError::ConfigDirCreateFailed(config_dir.clone()))?;

    Ok(config_dir)
}
