//! Configuration backends for the account store.
//!
//! The store itself never touches disk; it talks to a [`ConfigBackend`]
//! injected at construction. Two implementations ship with the crate: an
//! in-memory backend for tests and embedding, and a TOML-file backend for
//! the desktop application.

mod file;
mod memory;

pub use file::TomlBackend;
pub use memory::MemoryBackend;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{HeimdallError, HeimdallResult};

/// A single stored configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// String value
    String(String),
    /// List of strings
    List(Vec<String>),
}

impl ConfigValue {
    fn kind(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "int",
            ConfigValue::String(_) => "string",
            ConfigValue::List(_) => "list",
        }
    }
}

/// Key/value configuration service consumed by the account store.
///
/// An absent value is `Ok(None)`, never an error; errors mean the backend
/// itself failed (I/O, corrupt data, a value of the wrong type).
#[cfg_attr(test, mockall::automock)]
pub trait ConfigBackend: Send + Sync {
    /// Read a string value
    fn get_string(&self, key: &str) -> HeimdallResult<Option<String>>;
    /// Write a string value
    fn set_string(&self, key: &str, value: &str) -> HeimdallResult<()>;
    /// Read an integer value
    fn get_int(&self, key: &str) -> HeimdallResult<Option<i64>>;
    /// Write an integer value
    fn set_int(&self, key: &str, value: i64) -> HeimdallResult<()>;
    /// Read a boolean value
    fn get_bool(&self, key: &str) -> HeimdallResult<Option<bool>>;
    /// Write a boolean value
    fn set_bool(&self, key: &str, value: bool) -> HeimdallResult<()>;
    /// Read a list-of-strings value
    fn get_list(&self, key: &str) -> HeimdallResult<Option<Vec<String>>>;
    /// Write a list-of-strings value
    fn set_list(&self, key: &str, value: &[String]) -> HeimdallResult<()>;
    /// Whether `key` itself or any key beneath it holds a value
    fn key_exists(&self, key: &str) -> HeimdallResult<bool>;
    /// Remove `key` and every key beneath it
    fn remove_key(&self, key: &str) -> HeimdallResult<()>;
    /// Immediate child segments beneath `key`, sorted and deduplicated
    fn list_subkeys(&self, key: &str) -> HeimdallResult<Vec<String>>;
}

/// Flat map of full key path to value, shared by the shipped backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct ValueTree(BTreeMap<String, ConfigValue>);

impl ValueTree {
    pub(crate) fn insert(&mut self, key: &str, value: ConfigValue) {
        self.0.insert(key.to_string(), value);
    }

    pub(crate) fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    pub(crate) fn get_string(&self, key: &str) -> HeimdallResult<Option<String>> {
        self.typed(key, "string", |v| match v {
            ConfigValue::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub(crate) fn get_int(&self, key: &str) -> HeimdallResult<Option<i64>> {
        self.typed(key, "int", |v| match v {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        })
    }

    pub(crate) fn get_bool(&self, key: &str) -> HeimdallResult<Option<bool>> {
        self.typed(key, "bool", |v| match v {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        })
    }

    pub(crate) fn get_list(&self, key: &str) -> HeimdallResult<Option<Vec<String>>> {
        self.typed(key, "list", |v| match v {
            ConfigValue::List(l) => Some(l.clone()),
            _ => None,
        })
    }

    fn typed<T>(
        &self,
        key: &str,
        expected: &'static str,
        extract: impl Fn(&ConfigValue) -> Option<T>,
    ) -> HeimdallResult<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => match extract(value) {
                Some(v) => Ok(Some(v)),
                None => Err(HeimdallError::TypeMismatch {
                    key: format!("{key} (holds {})", value.kind()),
                    expected,
                }),
            },
        }
    }

    pub(crate) fn exists(&self, key: &str) -> bool {
        if self.0.contains_key(key) {
            return true;
        }
        let prefix = format!("{key}/");
        self.0
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    pub(crate) fn remove_subtree(&mut self, key: &str) {
        let prefix = format!("{key}/");
        self.0.retain(|k, _| k != key && !k.starts_with(&prefix));
    }

    pub(crate) fn subkeys(&self, key: &str) -> Vec<String> {
        let prefix = format!("{key}/");
        let mut out: Vec<String> = Vec::new();
        for (k, _) in self
            .0
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
        {
            let rest = &k[prefix.len()..];
            let segment = rest.split('/').next().unwrap_or(rest);
            // the map is ordered, duplicates are adjacent
            if out.last().map(String::as_str) != Some(segment) {
                out.push(segment.to_string());
            }
        }
        out
    }
}
