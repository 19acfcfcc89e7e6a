//! Aggregated account records.
//!
//! These records bundle the individual settings of one account (and its
//! referenced server accounts) into a single value for consumers that want
//! the whole picture at once. Records are built on demand and never
//! persisted themselves; persistence stays per-setting in the store.

use time::OffsetDateTime;
use tracing::warn;

use crate::error::{HeimdallError, HeimdallResult};
use crate::keys::{
    SETTING_AUTH_MECH, SETTING_DISPLAY_NAME, SETTING_EMAIL, SETTING_ENABLED, SETTING_FULLNAME,
    SETTING_HOSTNAME, SETTING_LAST_UPDATED, SETTING_PASSWORD, SETTING_PORT, SETTING_PROTO,
    SETTING_SECURITY, SETTING_STORE_ACCOUNT, SETTING_TRANSPORT_ACCOUNT, SETTING_USERNAME,
};
use crate::protocols::{AuthMechanism, ConnectionSecurity, MailProtocol};
use crate::store::AccountStore;

/// Fully resolved settings of one server account endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ServerAccountData {
    /// Server account name
    pub account_name: String,
    /// Hostname of the endpoint
    pub hostname: String,
    /// Login username
    pub username: String,
    /// Login password
    pub password: String,
    /// Protocol spoken by the endpoint, when the stored name is known
    pub protocol: Option<MailProtocol>,
    /// TCP port; falls back to the protocol default when unset
    pub port: u16,
    /// Authentication mechanism
    pub secure_auth: AuthMechanism,
    /// Connection security mode
    pub security: ConnectionSecurity,
    /// Time of the last successful update, when recorded
    pub last_updated: Option<OffsetDateTime>,
}

/// Fully resolved settings of one logical account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountData {
    /// Account name
    pub account_name: String,
    /// User-visible display name
    pub display_name: String,
    /// Full name of the user
    pub fullname: String,
    /// Email address of the user
    pub email: String,
    /// Whether the account takes part in mail checks
    pub enabled: bool,
    /// Whether this account is the default account
    pub is_default: bool,
    /// Settings of the referenced store endpoint, when one is referenced
    /// and still exists
    pub store_account: Option<ServerAccountData>,
    /// Settings of the referenced transport endpoint, when one is
    /// referenced and still exists
    pub transport_account: Option<ServerAccountData>,
}

impl AccountStore {
    /// Build the aggregated record for one logical account.
    ///
    /// Returns `None` (with a diagnostic) when the account does not exist.
    /// Referenced server accounts that disappeared out-of-band are logged
    /// and left out of the record.
    pub fn account_data(&self, name: &str) -> Option<AccountData> {
        if !self.account_exists(name, false) {
            warn!(account = name, "no such account");
            return None;
        }
        let is_default = self.get_default_account().as_deref() == Some(name);
        Some(AccountData {
            account_name: name.to_string(),
            display_name: self
                .get_string(name, SETTING_DISPLAY_NAME, false)
                .unwrap_or_default(),
            fullname: self
                .get_string(name, SETTING_FULLNAME, false)
                .unwrap_or_default(),
            email: self
                .get_string(name, SETTING_EMAIL, false)
                .unwrap_or_default(),
            enabled: self.get_bool(name, SETTING_ENABLED, false).unwrap_or(false),
            is_default,
            store_account: self.referenced_server_data(name, SETTING_STORE_ACCOUNT),
            transport_account: self.referenced_server_data(name, SETTING_TRANSPORT_ACCOUNT),
        })
    }

    /// Build the aggregated record for one server account.
    ///
    /// Callers are expected to check [`AccountStore::account_exists`] first;
    /// a missing server account is reported as [`HeimdallError::NotFound`].
    pub fn server_account_data(&self, name: &str) -> HeimdallResult<ServerAccountData> {
        if !self.account_exists(name, true) {
            return Err(HeimdallError::not_found(format!("server account {name}")));
        }
        let protocol = self
            .get_string(name, SETTING_PROTO, true)
            .and_then(|s| MailProtocol::parse(&s));
        let security = self
            .get_string(name, SETTING_SECURITY, true)
            .map(|s| ConnectionSecurity::from_setting(&s))
            .unwrap_or(ConnectionSecurity::None);
        let port = self
            .get_int(name, SETTING_PORT, true)
            .and_then(|port| u16::try_from(port).ok())
            .or_else(|| protocol.map(|p| p.default_port(security)))
            .unwrap_or(0);
        Ok(ServerAccountData {
            account_name: name.to_string(),
            hostname: self
                .get_string(name, SETTING_HOSTNAME, true)
                .unwrap_or_default(),
            username: self
                .get_string(name, SETTING_USERNAME, true)
                .unwrap_or_default(),
            password: self
                .get_string(name, SETTING_PASSWORD, true)
                .unwrap_or_default(),
            protocol,
            port,
            secure_auth: self
                .get_string(name, SETTING_AUTH_MECH, true)
                .map(|s| AuthMechanism::from_setting(&s))
                .unwrap_or(AuthMechanism::None),
            security,
            last_updated: self
                .get_int(name, SETTING_LAST_UPDATED, true)
                .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok()),
        })
    }

    fn referenced_server_data(&self, name: &str, setting: &str) -> Option<ServerAccountData> {
        let server = self.get_string(name, setting, false).filter(|s| !s.is_empty())?;
        match self.server_account_data(&server) {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(account = name, server = %server, %err, "dangling server account reference");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::protocols::RetrieveType;
    use time::macros::datetime;

    fn populated_store() -> AccountStore {
        let store = AccountStore::new(MemoryBackend::new());
        store
            .add_server_account(
                "work-store",
                "imap.example.com",
                993,
                "user",
                "secret",
                MailProtocol::Imap,
                ConnectionSecurity::Ssl,
                AuthMechanism::Password,
            )
            .unwrap();
        store
            .add_server_account(
                "work-transport",
                "smtp.example.com",
                587,
                "user",
                "secret",
                MailProtocol::Smtp,
                ConnectionSecurity::StartTls,
                AuthMechanism::Password,
            )
            .unwrap();
        store
            .add_account(
                "work",
                "Work",
                "A Name",
                "a@example.com",
                RetrieveType::Messages,
                Some("work-store"),
                Some("work-transport"),
                true,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_account_data_aggregates_everything() {
        let store = populated_store();
        let data = store.account_data("work").unwrap();

        assert_eq!(data.account_name, "work");
        assert_eq!(data.display_name, "Work");
        assert_eq!(data.fullname, "A Name");
        assert_eq!(data.email, "a@example.com");
        assert!(data.enabled);
        assert!(data.is_default);

        let server = data.store_account.unwrap();
        assert_eq!(server.account_name, "work-store");
        assert_eq!(server.hostname, "imap.example.com");
        assert_eq!(server.username, "user");
        assert_eq!(server.password, "secret");
        assert_eq!(server.protocol, Some(MailProtocol::Imap));
        assert_eq!(server.port, 993);
        assert_eq!(server.secure_auth, AuthMechanism::Password);
        assert_eq!(server.security, ConnectionSecurity::Ssl);
        assert_eq!(server.last_updated, None);

        let transport = data.transport_account.unwrap();
        assert_eq!(transport.protocol, Some(MailProtocol::Smtp));
        assert_eq!(transport.security, ConnectionSecurity::StartTls);
    }

    #[test]
    fn test_account_data_for_missing_account_is_none() {
        let store = AccountStore::new(MemoryBackend::new());
        assert!(store.account_data("nonexistent").is_none());
    }

    #[test]
    fn test_server_account_data_requires_existence() {
        let store = AccountStore::new(MemoryBackend::new());
        assert!(matches!(
            store.server_account_data("nonexistent"),
            Err(HeimdallError::NotFound(_))
        ));
    }

    #[test]
    fn test_unknown_enum_strings_fall_back_to_defaults() {
        let store = populated_store();
        store
            .set_string("work-store", SETTING_AUTH_MECH, "scram-sha-256", true)
            .unwrap();
        store
            .set_string("work-store", SETTING_SECURITY, "quantum", true)
            .unwrap();
        store
            .set_string("work-store", SETTING_PROTO, "nntp", true)
            .unwrap();

        let data = store.server_account_data("work-store").unwrap();
        assert_eq!(data.secure_auth, AuthMechanism::None);
        assert_eq!(data.security, ConnectionSecurity::None);
        assert_eq!(data.protocol, None);
    }

    #[test]
    fn test_missing_port_falls_back_to_protocol_default() {
        let store = AccountStore::new(MemoryBackend::new());
        store
            .set_string("bare", SETTING_HOSTNAME, "imap.example.com", true)
            .unwrap();
        store
            .set_string("bare", SETTING_PROTO, "imap", true)
            .unwrap();
        store
            .set_string("bare", SETTING_SECURITY, "ssl", true)
            .unwrap();

        let data = store.server_account_data("bare").unwrap();
        assert_eq!(data.port, 993);
    }

    #[test]
    fn test_last_updated_parses_stored_timestamp() {
        let store = populated_store();
        let when = datetime!(2024-05-04 10:30:00 UTC);
        store.set_server_last_updated("work-store", when).unwrap();

        let data = store.server_account_data("work-store").unwrap();
        assert_eq!(data.last_updated, Some(when));
    }

    #[test]
    fn test_dangling_reference_is_left_out_of_the_record() {
        let store = populated_store();
        // the transport disappears out-of-band, the record is still built
        store
            .set_string("work", SETTING_TRANSPORT_ACCOUNT, "gone", false)
            .unwrap();

        // enumeration now skips the account, but direct aggregation works
        let data = store.account_data("work").unwrap();
        assert!(data.store_account.is_some());
        assert!(data.transport_account.is_none());
    }
}
