//! Memoization of derived configuration keys.
//!
//! The account store resolves keys on every read and UI refreshes read a
//! lot, so derived key strings are cached per account name, separately for
//! the account and server account namespaces. Entries are written once and
//! never invalidated: a key string depends only on the names it was built
//! from, not on whether the account currently exists.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::HeimdallResult;
use crate::keys;

/// Inner-map entry standing in for "no setting", so the account's own
/// namespace key can be cached alongside its settings.
const ACCOUNT_ROOT: &str = "";

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyCacheStats {
    /// Number of lookups answered from the cache
    pub hits: usize,
    /// Number of lookups that had to build a key
    pub misses: usize,
}

/// Per-namespace memoization of fully qualified configuration keys.
#[derive(Default)]
pub struct KeyCache {
    accounts: RwLock<HashMap<String, HashMap<String, String>>>,
    server_accounts: RwLock<HashMap<String, HashMap<String, String>>>,
    stats: RwLock<KeyCacheStats>,
}

impl KeyCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the configuration key for `(account, setting)` in the given
    /// namespace, building and caching it on first use.
    ///
    /// An empty account name resolves to the bare namespace root without
    /// touching the cache. The same `(account, setting, server)` triple
    /// always resolves to the same string for the lifetime of the cache.
    pub fn resolve(
        &self,
        account: &str,
        setting: Option<&str>,
        server: bool,
    ) -> HeimdallResult<String> {
        if account.is_empty() {
            return keys::build_key(account, setting, server);
        }
        let sub_key = setting.unwrap_or(ACCOUNT_ROOT);
        let map = if server {
            &self.server_accounts
        } else {
            &self.accounts
        };
        if let Some(key) = map.read().get(account).and_then(|m| m.get(sub_key)) {
            self.stats.write().hits += 1;
            return Ok(key.clone());
        }
        let key = keys::build_key(account, setting, server)?;
        self.stats.write().misses += 1;
        map.write()
            .entry(account.to_string())
            .or_default()
            .insert(sub_key.to_string(), key.clone());
        Ok(key)
    }

    /// Get current cache statistics
    pub fn stats(&self) -> KeyCacheStats {
        *self.stats.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_is_idempotent_and_cached() {
        let cache = KeyCache::new();
        let first = cache.resolve("work", Some("hostname"), true).unwrap();
        let second = cache.resolve("work", Some("hostname"), true).unwrap();
        assert_eq!(first, second);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_account_root_and_setting_cached_separately() {
        let cache = KeyCache::new();
        let root = cache.resolve("work", None, false).unwrap();
        let setting = cache.resolve("work", Some("email"), false).unwrap();
        assert_ne!(root, setting);
        assert!(setting.starts_with(&root));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_namespaces_do_not_share_entries() {
        let cache = KeyCache::new();
        let plain = cache.resolve("work", Some("hostname"), false).unwrap();
        let server = cache.resolve("work", Some("hostname"), true).unwrap();
        assert_ne!(plain, server);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_namespace_root_bypasses_cache() {
        let cache = KeyCache::new();
        cache.resolve("", None, false).unwrap();
        cache.resolve("", None, true).unwrap();
        assert_eq!(cache.stats(), KeyCacheStats::default());
    }
}
