//! In-memory configuration backend.

use parking_lot::RwLock;

use super::{ConfigBackend, ConfigValue, ValueTree};
use crate::error::HeimdallResult;

/// Configuration backend keeping all values in memory.
///
/// Used by tests and by embedders that persist settings themselves.
#[derive(Default)]
pub struct MemoryBackend {
    tree: RwLock<ValueTree>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigBackend for MemoryBackend {
    fn get_string(&self, key: &str) -> HeimdallResult<Option<String>> {
        self.tree.read().get_string(key)
    }

    fn set_string(&self, key: &str, value: &str) -> HeimdallResult<()> {
        self.tree
            .write()
            .insert(key, ConfigValue::String(value.to_string()));
        Ok(())
    }

    fn get_int(&self, key: &str) -> HeimdallResult<Option<i64>> {
        self.tree.read().get_int(key)
    }

    fn set_int(&self, key: &str, value: i64) -> HeimdallResult<()> {
        self.tree.write().insert(key, ConfigValue::Int(value));
        Ok(())
    }

    fn get_bool(&self, key: &str) -> HeimdallResult<Option<bool>> {
        self.tree.read().get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> HeimdallResult<()> {
        self.tree.write().insert(key, ConfigValue::Bool(value));
        Ok(())
    }

    fn get_list(&self, key: &str) -> HeimdallResult<Option<Vec<String>>> {
        self.tree.read().get_list(key)
    }

    fn set_list(&self, key: &str, value: &[String]) -> HeimdallResult<()> {
        self.tree
            .write()
            .insert(key, ConfigValue::List(value.to_vec()));
        Ok(())
    }

    fn key_exists(&self, key: &str) -> HeimdallResult<bool> {
        Ok(self.tree.read().exists(key))
    }

    fn remove_key(&self, key: &str) -> HeimdallResult<()> {
        self.tree.write().remove_subtree(key);
        Ok(())
    }

    fn list_subkeys(&self, key: &str) -> HeimdallResult<Vec<String>> {
        Ok(self.tree.read().subkeys(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_round_trip() {
        let backend = MemoryBackend::new();
        backend.set_string("/apps/heimdall/x", "v").unwrap();
        backend.set_int("/apps/heimdall/y", 42).unwrap();
        backend.set_bool("/apps/heimdall/z", true).unwrap();
        backend
            .set_list("/apps/heimdall/l", &["a".to_string(), "b".to_string()])
            .unwrap();

        assert_eq!(
            backend.get_string("/apps/heimdall/x").unwrap(),
            Some("v".to_string())
        );
        assert_eq!(backend.get_int("/apps/heimdall/y").unwrap(), Some(42));
        assert_eq!(backend.get_bool("/apps/heimdall/z").unwrap(), Some(true));
        assert_eq!(
            backend.get_list("/apps/heimdall/l").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(backend.get_string("/apps/heimdall/missing").unwrap(), None);
    }

    #[test]
    fn test_remove_key_removes_subtree() {
        let backend = MemoryBackend::new();
        backend.set_string("/apps/heimdall/a/b", "v").unwrap();
        backend.set_string("/apps/heimdall/a/c", "w").unwrap();
        backend.set_string("/apps/heimdall/d", "u").unwrap();

        backend.remove_key("/apps/heimdall/a").unwrap();
        assert!(!backend.key_exists("/apps/heimdall/a").unwrap());
        assert!(backend.key_exists("/apps/heimdall/d").unwrap());
    }
}
