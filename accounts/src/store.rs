//! Account store façade.
//!
//! [`AccountStore`] is the single entry point for account settings: typed
//! accessors over the injected [`ConfigBackend`], account lifecycle
//! (add/remove/enumerate), default-account management and busy tracking.
//! Key strings are resolved through the [`KeyCache`] so hot read paths do
//! not rebuild and re-escape key paths.
//!
//! Error policy: read accessors log backend failures and return `None`;
//! mutating operations return a typed error. Multi-step mutations
//! (`add_account`, `add_server_account`, `remove_account`) are not
//! transactional — a failure partway through leaves the earlier writes in
//! place.

use std::collections::HashSet;

use parking_lot::RwLock;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::backend::ConfigBackend;
use crate::cache::{KeyCache, KeyCacheStats};
use crate::error::{HeimdallError, HeimdallResult};
use crate::events::{AccountEvent, EventDispatcher};
use crate::keys::{
    self, DEFAULT_ACCOUNT_KEY, SETTING_AUTH_MECH, SETTING_DISPLAY_NAME, SETTING_EMAIL,
    SETTING_ENABLED, SETTING_FULLNAME, SETTING_HOSTNAME, SETTING_LAST_UPDATED,
    SETTING_LEAVE_ON_SERVER, SETTING_LIMIT_RETRIEVE, SETTING_PASSWORD, SETTING_PORT,
    SETTING_PROTO, SETTING_RETRIEVE, SETTING_SECURITY, SETTING_SIGNATURE, SETTING_STORE_ACCOUNT,
    SETTING_TRANSPORT_ACCOUNT, SETTING_USERNAME, SETTING_USE_SIGNATURE,
};
use crate::protocols::{AuthMechanism, ConnectionSecurity, MailProtocol, RetrieveType};

/// Re-arms or disarms periodic mail checking as accounts come and go.
pub trait UpdateScheduler: Send + Sync {
    /// Re-evaluate the periodic update interval after an account change
    fn reschedule(&self);
    /// Stop periodic updates entirely
    fn disable(&self);
}

/// Typed, validated access to per-account and per-server-account settings.
pub struct AccountStore {
    backend: Box<dyn ConfigBackend>,
    keys: KeyCache,
    busy: RwLock<HashSet<String>>,
    events: EventDispatcher,
    scheduler: RwLock<Option<Box<dyn UpdateScheduler>>>,
}

impl AccountStore {
    /// Create a store over the given configuration backend
    pub fn new(backend: impl ConfigBackend + 'static) -> Self {
        Self::with_backend(Box::new(backend))
    }

    /// Create a store over an already boxed backend
    pub fn with_backend(backend: Box<dyn ConfigBackend>) -> Self {
        Self {
            backend,
            keys: KeyCache::new(),
            busy: RwLock::new(HashSet::new()),
            events: EventDispatcher::new(),
            scheduler: RwLock::new(None),
        }
    }

    /// Register a listener for account events. Listeners run synchronously
    /// on the emitting thread, in registration order.
    pub fn subscribe(&self, listener: impl Fn(&AccountEvent) + Send + Sync + 'static) {
        self.events.subscribe(listener);
    }

    /// Install the periodic-update scheduler hook
    pub fn set_scheduler(&self, scheduler: impl UpdateScheduler + 'static) {
        *self.scheduler.write() = Some(Box::new(scheduler));
    }

    /// Key cache statistics, for diagnostics
    pub fn key_cache_stats(&self) -> KeyCacheStats {
        self.keys.stats()
    }

    // Typed accessors ------------------------------------------------------

    /// Read a string setting of an account or server account
    pub fn get_string(&self, account: &str, setting: &str, server: bool) -> Option<String> {
        let key = self.read_key(account, setting, server)?;
        match self.backend.get_string(&key) {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                debug!(key = %key, "no value stored");
                None
            }
            Err(err) => {
                warn!(key = %key, %err, "backend read failed");
                None
            }
        }
    }

    /// Read an integer setting of an account or server account
    pub fn get_int(&self, account: &str, setting: &str, server: bool) -> Option<i64> {
        let key = self.read_key(account, setting, server)?;
        match self.backend.get_int(&key) {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                debug!(key = %key, "no value stored");
                None
            }
            Err(err) => {
                warn!(key = %key, %err, "backend read failed");
                None
            }
        }
    }

    /// Read a boolean setting of an account or server account
    pub fn get_bool(&self, account: &str, setting: &str, server: bool) -> Option<bool> {
        let key = self.read_key(account, setting, server)?;
        match self.backend.get_bool(&key) {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                debug!(key = %key, "no value stored");
                None
            }
            Err(err) => {
                warn!(key = %key, %err, "backend read failed");
                None
            }
        }
    }

    /// Read a list-of-strings setting of an account or server account
    pub fn get_list(&self, account: &str, setting: &str, server: bool) -> Option<Vec<String>> {
        let key = self.read_key(account, setting, server)?;
        match self.backend.get_list(&key) {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                debug!(key = %key, "no value stored");
                None
            }
            Err(err) => {
                warn!(key = %key, %err, "backend read failed");
                None
            }
        }
    }

    /// Write a string setting and notify listeners
    pub fn set_string(
        &self,
        account: &str,
        setting: &str,
        value: &str,
        server: bool,
    ) -> HeimdallResult<()> {
        self.write_string(account, setting, value, server)?;
        self.emit_changed(account, server);
        Ok(())
    }

    /// Write an integer setting and notify listeners
    pub fn set_int(
        &self,
        account: &str,
        setting: &str,
        value: i64,
        server: bool,
    ) -> HeimdallResult<()> {
        self.write_int(account, setting, value, server)?;
        self.emit_changed(account, server);
        Ok(())
    }

    /// Write a boolean setting and notify listeners
    pub fn set_bool(
        &self,
        account: &str,
        setting: &str,
        value: bool,
        server: bool,
    ) -> HeimdallResult<()> {
        self.write_bool(account, setting, value, server)?;
        self.emit_changed(account, server);
        Ok(())
    }

    /// Write a list-of-strings setting and notify listeners
    pub fn set_list(
        &self,
        account: &str,
        setting: &str,
        value: &[String],
        server: bool,
    ) -> HeimdallResult<()> {
        let key = self.keys.resolve(account, Some(setting), server)?;
        self.backend.set_list(&key, value)?;
        self.emit_changed(account, server);
        Ok(())
    }

    // Account lifecycle ----------------------------------------------------

    /// Whether the account (or server account) has any settings stored
    pub fn account_exists(&self, name: &str, server: bool) -> bool {
        let key = match self.keys.resolve(name, None, server) {
            Ok(key) => key,
            Err(err) => {
                warn!(account = name, %err, "could not derive account key");
                return false;
            }
        };
        match self.backend.key_exists(&key) {
            Ok(exists) => exists,
            Err(err) => {
                warn!(key = %key, %err, "backend existence check failed");
                false
            }
        }
    }

    /// Whether any account exists at all
    pub fn has_accounts(&self) -> bool {
        !self.account_names(false).is_empty()
    }

    /// Create a new logical account.
    ///
    /// The name must not contain the `/` separator and must not already be
    /// in use. Settings are written in sequence without rollback: when a
    /// write fails, the earlier ones stay behind. The first account created
    /// becomes the default account.
    #[allow(clippy::too_many_arguments)]
    pub fn add_account(
        &self,
        name: &str,
        display_name: &str,
        user_fullname: &str,
        user_email: &str,
        retrieve_type: RetrieveType,
        store_account: Option<&str>,
        transport_account: Option<&str>,
        enabled: bool,
    ) -> HeimdallResult<()> {
        Self::check_name(name)?;
        let display_key = self.keys.resolve(name, Some(SETTING_DISPLAY_NAME), false)?;
        if self.backend.key_exists(&display_key)? {
            return Err(HeimdallError::already_exists(name));
        }

        self.backend.set_string(&display_key, display_name)?;
        if let Some(store) = store_account {
            self.write_string(name, SETTING_STORE_ACCOUNT, store, false)?;
        }
        if let Some(transport) = transport_account {
            self.write_string(name, SETTING_TRANSPORT_ACCOUNT, transport, false)?;
        }
        self.write_bool(name, SETTING_LEAVE_ON_SERVER, true, false)?;
        self.write_bool(name, SETTING_ENABLED, enabled, false)?;
        self.write_string(name, SETTING_FULLNAME, user_fullname, false)?;
        self.write_string(name, SETTING_EMAIL, user_email, false)?;
        self.write_string(name, SETTING_RETRIEVE, retrieve_type.as_str(), false)?;

        self.events.emit(&AccountEvent::Inserted {
            name: name.to_string(),
        });

        if self.get_default_account().is_none() {
            if let Err(err) = self.set_default_account(name) {
                warn!(account = name, %err, "could not make new account the default");
            }
        }
        if let Some(scheduler) = self.scheduler.read().as_ref() {
            scheduler.reschedule();
        }
        Ok(())
    }

    /// Create a new server account (store or transport endpoint).
    ///
    /// Settings are written in sequence without rollback.
    #[allow(clippy::too_many_arguments)]
    pub fn add_server_account(
        &self,
        name: &str,
        hostname: &str,
        port: u16,
        username: &str,
        password: &str,
        protocol: MailProtocol,
        security: ConnectionSecurity,
        auth_mech: AuthMechanism,
    ) -> HeimdallResult<()> {
        Self::check_name(name)?;
        let hostname_key = self.keys.resolve(name, Some(SETTING_HOSTNAME), true)?;
        if self.backend.key_exists(&hostname_key)? {
            return Err(HeimdallError::already_exists(name));
        }

        self.backend.set_string(&hostname_key, hostname)?;
        self.write_string(name, SETTING_USERNAME, username, true)?;
        self.write_string(name, SETTING_PASSWORD, password, true)?;
        self.write_string(name, SETTING_PROTO, protocol.as_str(), true)?;
        self.write_int(name, SETTING_PORT, i64::from(port), true)?;
        self.write_string(name, SETTING_AUTH_MECH, auth_mech.as_str(), true)?;
        self.write_string(name, SETTING_SECURITY, security.as_str(), true)?;
        Ok(())
    }

    /// Remove an account together with its referenced server accounts.
    ///
    /// When the removed account was the default, the remaining account with
    /// the alphabetically first display name becomes the new default. The
    /// removed event fires only after the keys are gone, so listeners
    /// re-enumerating accounts no longer see the removed one.
    pub fn remove_account(&self, name: &str) -> HeimdallResult<()> {
        if !self.account_exists(name, false) {
            return Err(HeimdallError::not_found(name));
        }
        let was_default = self.get_default_account().as_deref() == Some(name);
        if was_default {
            self.unset_default_account()?;
        }

        for setting in [SETTING_STORE_ACCOUNT, SETTING_TRANSPORT_ACCOUNT] {
            if let Some(server) = self.get_string(name, setting, false) {
                if !server.is_empty() {
                    let server_key = self.keys.resolve(&server, None, true)?;
                    self.backend.remove_key(&server_key)?;
                }
            }
        }
        let account_key = self.keys.resolve(name, None, false)?;
        self.backend.remove_key(&account_key)?;

        if was_default {
            let remaining = self.account_names(false);
            let next = remaining.into_iter().min_by_key(|candidate| {
                self.display_name(candidate)
                    .unwrap_or_else(|| candidate.clone())
                    .to_lowercase()
            });
            if let Some(next) = next {
                if let Err(err) = self.set_default_account(&next) {
                    warn!(account = %next, %err, "could not elect new default account");
                }
            }
        }

        self.events.emit(&AccountEvent::Removed {
            name: name.to_string(),
        });

        if !self.has_accounts() {
            if let Some(scheduler) = self.scheduler.read().as_ref() {
                scheduler.disable();
            }
        }
        Ok(())
    }

    /// Names of all accounts, sorted.
    ///
    /// Accounts whose referenced store or transport server account no
    /// longer exists are skipped; a concurrent deletion can leave such
    /// half-removed accounts behind. With `only_enabled`, disabled accounts
    /// are skipped as well.
    pub fn account_names(&self, only_enabled: bool) -> Vec<String> {
        let subkeys = match self.backend.list_subkeys(keys::ACCOUNT_NAMESPACE) {
            Ok(subkeys) => subkeys,
            Err(err) => {
                warn!(%err, "could not list accounts");
                return Vec::new();
            }
        };
        let mut names = Vec::new();
        for escaped in subkeys {
            let name = keys::unescape_segment(&escaped);
            if self.has_dangling_server_reference(&name) {
                continue;
            }
            if only_enabled && !self.account_enabled(&name) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        names
    }

    fn has_dangling_server_reference(&self, name: &str) -> bool {
        for setting in [SETTING_STORE_ACCOUNT, SETTING_TRANSPORT_ACCOUNT] {
            if let Some(server) = self.get_string(name, setting, false) {
                if !server.is_empty() && !self.account_exists(&server, true) {
                    debug!(
                        account = name,
                        server = %server,
                        "skipping account with missing server account"
                    );
                    return true;
                }
            }
        }
        false
    }

    // Default account ------------------------------------------------------

    /// Make `name` the default account
    pub fn set_default_account(&self, name: &str) -> HeimdallResult<()> {
        if !self.account_exists(name, false) {
            return Err(HeimdallError::not_found(name));
        }
        self.backend.set_string(DEFAULT_ACCOUNT_KEY, name)?;
        self.events.emit(&AccountEvent::DefaultChanged);
        Ok(())
    }

    /// Name of the default account, if one is set and still exists.
    ///
    /// A default pointer naming a removed account is treated as "no
    /// default", not as an error.
    pub fn get_default_account(&self) -> Option<String> {
        let name = match self.backend.get_string(DEFAULT_ACCOUNT_KEY) {
            Ok(name) => name?,
            Err(err) => {
                warn!(%err, "could not read default account");
                return None;
            }
        };
        if !self.account_exists(&name, false) {
            debug!(account = %name, "stale default account pointer");
            return None;
        }
        Some(name)
    }

    fn unset_default_account(&self) -> HeimdallResult<()> {
        self.backend.remove_key(DEFAULT_ACCOUNT_KEY)?;
        self.events.emit(&AccountEvent::DefaultChanged);
        Ok(())
    }

    // Busy tracking --------------------------------------------------------

    /// Mark an account busy or idle.
    ///
    /// Only transitions emit a busy-changed event; marking an unknown
    /// account busy is a no-op.
    pub fn set_account_busy(&self, name: &str, busy: bool) {
        if busy && !self.account_names(false).iter().any(|n| n == name) {
            return;
        }
        let changed = {
            let mut set = self.busy.write();
            if busy {
                set.insert(name.to_string())
            } else {
                set.remove(name)
            }
        };
        if changed {
            self.events.emit(&AccountEvent::BusyChanged {
                name: name.to_string(),
                busy,
            });
        }
    }

    /// Whether the account is currently marked busy
    pub fn account_is_busy(&self, name: &str) -> bool {
        self.busy.read().contains(name)
    }

    // Per-setting conveniences ---------------------------------------------

    /// Display name of an account
    pub fn display_name(&self, name: &str) -> Option<String> {
        self.get_string(name, SETTING_DISPLAY_NAME, false)
    }

    /// Change the display name, emitting the dedicated display-name event
    /// rather than the generic changed event
    pub fn set_display_name(&self, name: &str, display_name: &str) -> HeimdallResult<()> {
        self.write_string(name, SETTING_DISPLAY_NAME, display_name, false)?;
        self.events.emit(&AccountEvent::DisplayNameChanged {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Whether the account takes part in mail checks
    pub fn account_enabled(&self, name: &str) -> bool {
        self.get_bool(name, SETTING_ENABLED, false).unwrap_or(false)
    }

    /// Enable or disable the account
    pub fn set_enabled(&self, name: &str, enabled: bool) -> HeimdallResult<()> {
        self.set_bool(name, SETTING_ENABLED, enabled, false)
    }

    /// Signature text and whether it is in use
    pub fn signature(&self, name: &str) -> Option<(String, bool)> {
        let text = self.get_string(name, SETTING_SIGNATURE, false)?;
        let in_use = self
            .get_bool(name, SETTING_USE_SIGNATURE, false)
            .unwrap_or(false);
        Some((text, in_use))
    }

    /// Set the signature text and its use flag
    pub fn set_signature(
        &self,
        name: &str,
        signature: &str,
        use_signature: bool,
    ) -> HeimdallResult<()> {
        self.write_string(name, SETTING_SIGNATURE, signature, false)?;
        self.write_bool(name, SETTING_USE_SIGNATURE, use_signature, false)?;
        self.emit_changed(name, false);
        Ok(())
    }

    /// How much of each message the account retrieves
    pub fn retrieve_type(&self, name: &str) -> RetrieveType {
        self.get_string(name, SETTING_RETRIEVE, false)
            .map(|s| RetrieveType::from_setting(&s))
            .unwrap_or(RetrieveType::HeadersOnly)
    }

    /// Set how much of each message the account retrieves
    pub fn set_retrieve_type(&self, name: &str, retrieve: RetrieveType) -> HeimdallResult<()> {
        self.set_string(name, SETTING_RETRIEVE, retrieve.as_str(), false)
    }

    /// Maximum number of messages retrieved per check, 0 for no limit
    pub fn retrieve_limit(&self, name: &str) -> i64 {
        self.get_int(name, SETTING_LIMIT_RETRIEVE, false).unwrap_or(0)
    }

    /// Set the per-check retrieve limit
    pub fn set_retrieve_limit(&self, name: &str, limit: i64) -> HeimdallResult<()> {
        self.set_int(name, SETTING_LIMIT_RETRIEVE, limit, false)
    }

    /// Whether retrieved messages stay on the server
    pub fn leave_on_server(&self, name: &str) -> bool {
        self.get_bool(name, SETTING_LEAVE_ON_SERVER, false)
            .unwrap_or(true)
    }

    /// Set whether retrieved messages stay on the server
    pub fn set_leave_on_server(&self, name: &str, leave: bool) -> HeimdallResult<()> {
        self.set_bool(name, SETTING_LEAVE_ON_SERVER, leave, false)
    }

    /// Change a server account's username; a write of the current value is
    /// skipped and emits nothing
    pub fn set_server_username(&self, name: &str, username: &str) -> HeimdallResult<()> {
        if self.get_string(name, SETTING_USERNAME, true).as_deref() == Some(username) {
            return Ok(());
        }
        self.set_string(name, SETTING_USERNAME, username, true)
    }

    /// Change a server account's hostname; a write of the current value is
    /// skipped and emits nothing
    pub fn set_server_hostname(&self, name: &str, hostname: &str) -> HeimdallResult<()> {
        if self.get_string(name, SETTING_HOSTNAME, true).as_deref() == Some(hostname) {
            return Ok(());
        }
        self.set_string(name, SETTING_HOSTNAME, hostname, true)
    }

    /// Record the time of the last successful update of a server account
    pub fn set_server_last_updated(
        &self,
        name: &str,
        when: OffsetDateTime,
    ) -> HeimdallResult<()> {
        self.set_int(name, SETTING_LAST_UPDATED, when.unix_timestamp(), true)
    }

    // Internal helpers -----------------------------------------------------

    fn check_name(name: &str) -> HeimdallResult<()> {
        if name.is_empty() {
            return Err(HeimdallError::validation("account name must not be empty"));
        }
        if name.contains('/') {
            return Err(HeimdallError::validation(format!(
                "account name must not contain '/': {name}"
            )));
        }
        Ok(())
    }

    fn read_key(&self, account: &str, setting: &str, server: bool) -> Option<String> {
        match self.keys.resolve(account, Some(setting), server) {
            Ok(key) => Some(key),
            Err(err) => {
                warn!(account, setting, %err, "could not derive configuration key");
                None
            }
        }
    }

    fn write_string(
        &self,
        account: &str,
        setting: &str,
        value: &str,
        server: bool,
    ) -> HeimdallResult<()> {
        let key = self.keys.resolve(account, Some(setting), server)?;
        self.backend.set_string(&key, value)
    }

    fn write_int(
        &self,
        account: &str,
        setting: &str,
        value: i64,
        server: bool,
    ) -> HeimdallResult<()> {
        let key = self.keys.resolve(account, Some(setting), server)?;
        self.backend.set_int(&key, value)
    }

    fn write_bool(
        &self,
        account: &str,
        setting: &str,
        value: bool,
        server: bool,
    ) -> HeimdallResult<()> {
        let key = self.keys.resolve(account, Some(setting), server)?;
        self.backend.set_bool(&key, value)
    }

    fn emit_changed(&self, account: &str, server: bool) {
        self.events.emit(&AccountEvent::Changed {
            name: account.to_string(),
            server,
        });
    }
}
