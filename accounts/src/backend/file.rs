//! TOML-file configuration backend.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use super::{ConfigBackend, ConfigValue, ValueTree};
use crate::error::HeimdallResult;

/// Configuration backend persisted to a single TOML file.
///
/// The file maps full key paths to values. It is read once when the backend
/// is opened and written through on every mutation, so external readers
/// always see the latest state.
pub struct TomlBackend {
    path: PathBuf,
    tree: RwLock<ValueTree>,
}

impl TomlBackend {
    /// Open the backend at `path`, loading existing values if the file is
    /// already there.
    pub fn open(path: impl Into<PathBuf>) -> HeimdallResult<Self> {
        let path = path.into();
        let tree = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            debug!(path = %path.display(), "starting with empty settings file");
            ValueTree::default()
        };
        Ok(Self {
            path,
            tree: RwLock::new(tree),
        })
    }

    /// Open the backend at the default per-user settings location.
    pub fn open_default() -> HeimdallResult<Self> {
        Self::open(crate::get_config_dir()?.join(crate::SETTINGS_FILENAME))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, tree: &ValueTree) -> HeimdallResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(tree)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl ConfigBackend for TomlBackend {
    fn get_string(&self, key: &str) -> HeimdallResult<Option<String>> {
        self.tree.read().get_string(key)
    }

    fn set_string(&self, key: &str, value: &str) -> HeimdallResult<()> {
        let mut tree = self.tree.write();
        tree.insert(key, ConfigValue::String(value.to_string()));
        self.save(&tree)
    }

    fn get_int(&self, key: &str) -> HeimdallResult<Option<i64>> {
        self.tree.read().get_int(key)
    }

    fn set_int(&self, key: &str, value: i64) -> HeimdallResult<()> {
        let mut tree = self.tree.write();
        tree.insert(key, ConfigValue::Int(value));
        self.save(&tree)
    }

    fn get_bool(&self, key: &str) -> HeimdallResult<Option<bool>> {
        self.tree.read().get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> HeimdallResult<()> {
        let mut tree = self.tree.write();
        tree.insert(key, ConfigValue::Bool(value));
        self.save(&tree)
    }

    fn get_list(&self, key: &str) -> HeimdallResult<Option<Vec<String>>> {
        self.tree.read().get_list(key)
    }

    fn set_list(&self, key: &str, value: &[String]) -> HeimdallResult<()> {
        let mut tree = self.tree.write();
        tree.insert(key, ConfigValue::List(value.to_vec()));
        self.save(&tree)
    }

    fn key_exists(&self, key: &str) -> HeimdallResult<bool> {
        Ok(self.tree.read().exists(key))
    }

    fn remove_key(&self, key: &str) -> HeimdallResult<()> {
        let mut tree = self.tree.write();
        tree.remove_subtree(key);
        self.save(&tree)
    }

    fn list_subkeys(&self, key: &str) -> HeimdallResult<Vec<String>> {
        Ok(self.tree.read().subkeys(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");

        let backend = TomlBackend::open(&path).unwrap();
        backend
            .set_string("/apps/heimdall/accounts/work/display_name", "Work")
            .unwrap();
        backend
            .set_int("/apps/heimdall/server_accounts/work-store/port", 993)
            .unwrap();
        backend
            .set_bool("/apps/heimdall/accounts/work/enabled", true)
            .unwrap();
        drop(backend);

        let backend = TomlBackend::open(&path).unwrap();
        assert_eq!(
            backend
                .get_string("/apps/heimdall/accounts/work/display_name")
                .unwrap(),
            Some("Work".to_string())
        );
        assert_eq!(
            backend
                .get_int("/apps/heimdall/server_accounts/work-store/port")
                .unwrap(),
            Some(993)
        );
        assert_eq!(
            backend
                .get_bool("/apps/heimdall/accounts/work/enabled")
                .unwrap(),
            Some(true)
        );
    }

    #[test]
    fn test_remove_key_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");

        let backend = TomlBackend::open(&path).unwrap();
        backend.set_string("/apps/heimdall/a/b", "v").unwrap();
        backend.set_string("/apps/heimdall/c", "w").unwrap();
        backend.remove_key("/apps/heimdall/a").unwrap();
        drop(backend);

        let backend = TomlBackend::open(&path).unwrap();
        assert!(!backend.key_exists("/apps/heimdall/a").unwrap());
        assert!(backend.key_exists("/apps/heimdall/c").unwrap());
    }

    #[test]
    fn test_list_subkeys_of_namespace_roots() {
        let temp_dir = TempDir::new().unwrap();
        let backend = TomlBackend::open(temp_dir.path().join("settings.toml")).unwrap();
        backend
            .set_string("/apps/heimdall/accounts/home/display_name", "Home")
            .unwrap();
        backend
            .set_string("/apps/heimdall/accounts/work/display_name", "Work")
            .unwrap();
        backend
            .set_string("/apps/heimdall/server_accounts/work-store/hostname", "imap")
            .unwrap();

        assert_eq!(
            backend.list_subkeys("/apps/heimdall/accounts").unwrap(),
            vec!["home", "work"]
        );
        assert_eq!(
            backend
                .list_subkeys("/apps/heimdall/server_accounts")
                .unwrap(),
            vec!["work-store"]
        );
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let backend = TomlBackend::open(temp_dir.path().join("none.toml")).unwrap();
        assert!(backend
            .list_subkeys("/apps/heimdall/accounts")
            .unwrap()
            .is_empty());
    }
}
