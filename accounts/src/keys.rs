//! Derivation of configuration keys for accounts and server accounts.
//!
//! Account settings live under two fixed namespace roots. A key names either
//! an account itself (`<root>/<account>`) or one setting inside it
//! (`<root>/<account>/<setting>`). Account and setting names chosen by the
//! user are percent-escaped so the resulting path segments never contain a
//! separator and always satisfy the backend's key-naming rules.

use std::borrow::Cow;

use crate::error::{HeimdallError, HeimdallResult};

/// Namespace root for logical account settings
pub const ACCOUNT_NAMESPACE: &str = "/apps/heimdall/accounts";

/// Namespace root for server account (store/transport endpoint) settings
pub const SERVER_ACCOUNT_NAMESPACE: &str = "/apps/heimdall/server_accounts";

/// Key holding the name of the default account
pub const DEFAULT_ACCOUNT_KEY: &str = "/apps/heimdall/default_account";

/// Account setting: user-visible display name
pub const SETTING_DISPLAY_NAME: &str = "display_name";
/// Account setting: full name of the user
pub const SETTING_FULLNAME: &str = "fullname";
/// Account setting: email address of the user
pub const SETTING_EMAIL: &str = "email";
/// Account setting: whether the account takes part in mail checks
pub const SETTING_ENABLED: &str = "enabled";
/// Account setting: how much of each message to retrieve
pub const SETTING_RETRIEVE: &str = "retrieve";
/// Account setting: maximum number of messages to retrieve per check
pub const SETTING_LIMIT_RETRIEVE: &str = "limit_retrieve";
/// Account setting: keep retrieved messages on the server
pub const SETTING_LEAVE_ON_SERVER: &str = "leave_on_server";
/// Account setting: name of the referenced store server account
pub const SETTING_STORE_ACCOUNT: &str = "store_account";
/// Account setting: name of the referenced transport server account
pub const SETTING_TRANSPORT_ACCOUNT: &str = "transport_account";
/// Account setting: signature text appended to outgoing mail
pub const SETTING_SIGNATURE: &str = "signature";
/// Account setting: whether the signature is in use
pub const SETTING_USE_SIGNATURE: &str = "use_signature";

/// Server account setting: hostname of the endpoint
pub const SETTING_HOSTNAME: &str = "hostname";
/// Server account setting: login username
pub const SETTING_USERNAME: &str = "username";
/// Server account setting: login password
pub const SETTING_PASSWORD: &str = "password";
/// Server account setting: protocol spoken by the endpoint
pub const SETTING_PROTO: &str = "proto";
/// Server account setting: TCP port of the endpoint
pub const SETTING_PORT: &str = "port";
/// Server account setting: authentication mechanism
pub const SETTING_AUTH_MECH: &str = "auth_mech";
/// Server account setting: connection security mode
pub const SETTING_SECURITY: &str = "security";
/// Server account setting: unix timestamp of the last successful update
pub const SETTING_LAST_UPDATED: &str = "last_updated";

/// Classification of a configuration key, recovered by [`parse_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    /// Unescaped account name the key belongs to
    pub account: String,
    /// True when the key names a setting inside the account rather than the
    /// account's own namespace entry
    pub is_account_subkey: bool,
    /// True when the key lives in the server account namespace
    pub is_server_account: bool,
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
}

/// Escape a name into a valid key path segment.
///
/// The escaping is the identity on ASCII alphanumerics, reversible via
/// [`unescape_segment`], and never produces a path separator.
pub fn escape_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Reverse [`escape_segment`]. Malformed escape sequences are kept verbatim.
pub fn unescape_segment(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Check a fully qualified key against the backend's key-naming rules:
/// absolute, no empty segments, segment characters restricted to
/// alphanumerics and `-_.%+`.
pub fn is_valid_key(key: &str) -> bool {
    let Some(rest) = key.strip_prefix('/') else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }
    rest.split('/').all(|segment| {
        !segment.is_empty()
            && segment
                .bytes()
                .all(|b| is_unreserved(b) || matches!(b, b'%' | b'+'))
    })
}

/// Build the configuration key for `(account, setting)` in the account or
/// server account namespace.
///
/// An empty account name yields the bare namespace root. The result is
/// checked against the key-naming rules before being handed out; a failed
/// check is reported as [`HeimdallError::InvalidKey`].
pub fn build_key(
    account: &str,
    setting: Option<&str>,
    server: bool,
) -> HeimdallResult<String> {
    let namespace = if server {
        SERVER_ACCOUNT_NAMESPACE
    } else {
        ACCOUNT_NAMESPACE
    };
    if account.is_empty() {
        return Ok(namespace.to_string());
    }
    // Alphanumeric names are used verbatim; escape_segment is the identity
    // on them, so this only skips the allocation.
    let account = if account.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Cow::Borrowed(account)
    } else {
        Cow::Owned(escape_segment(account))
    };
    let key = match setting.filter(|s| !s.is_empty()) {
        Some(setting) => format!("{namespace}/{account}/{}", escape_segment(setting)),
        None => format!("{namespace}/{account}"),
    };
    if !is_valid_key(&key) {
        return Err(HeimdallError::invalid_key(key));
    }
    Ok(key)
}

/// Classify a configuration key back into its account name, sub-key flag and
/// namespace. Returns `None` for keys outside both namespaces and for the
/// bare namespace roots themselves.
pub fn parse_key(key: &str) -> Option<ParsedKey> {
    let (rest, is_server_account) =
        if let Some(rest) = key.strip_prefix(SERVER_ACCOUNT_NAMESPACE) {
            (rest, true)
        } else if let Some(rest) = key.strip_prefix(ACCOUNT_NAMESPACE) {
            (rest, false)
        } else {
            return None;
        };
    let rest = rest.strip_prefix('/')?;
    let mut segments = rest.split('/');
    let first = segments.next().filter(|s| !s.is_empty())?;
    Some(ParsedKey {
        account: unescape_segment(first),
        is_account_subkey: segments.next().is_some(),
        is_server_account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_is_identity_on_alphanumerics() {
        assert_eq!(escape_segment("work2"), "work2");
        assert_eq!(escape_segment("ABCxyz019"), "ABCxyz019");
    }

    #[test]
    fn test_escape_round_trip() {
        for name in ["work", "wörk", "a b/c", "100% done", "_под.почта_"] {
            let escaped = escape_segment(name);
            assert!(!escaped.contains('/'), "separator leaked for {name}");
            assert_eq!(unescape_segment(&escaped), name);
        }
    }

    #[test]
    fn test_unescape_keeps_malformed_sequences() {
        assert_eq!(unescape_segment("50%"), "50%");
        assert_eq!(unescape_segment("a%G1b"), "a%G1b");
    }

    #[test]
    fn test_build_key_plain_account() {
        let key = build_key("work", Some("hostname"), true).unwrap();
        assert_eq!(key, "/apps/heimdall/server_accounts/work/hostname");
        let key = build_key("work", None, false).unwrap();
        assert_eq!(key, "/apps/heimdall/accounts/work");
    }

    #[test]
    fn test_build_key_bare_namespace_roots() {
        assert_eq!(build_key("", None, false).unwrap(), ACCOUNT_NAMESPACE);
        assert_eq!(build_key("", None, true).unwrap(), SERVER_ACCOUNT_NAMESPACE);
    }

    #[test]
    fn test_build_then_parse_round_trip() {
        for name in ["work", "wörk", "mail home", "a/b"] {
            let key = build_key(name, Some("hostname"), true).unwrap();
            let parsed = parse_key(&key).unwrap();
            assert_eq!(parsed.account, name);
            assert!(parsed.is_account_subkey);
            assert!(parsed.is_server_account);

            let key = build_key(name, None, false).unwrap();
            let parsed = parse_key(&key).unwrap();
            assert_eq!(parsed.account, name);
            assert!(!parsed.is_account_subkey);
            assert!(!parsed.is_server_account);
        }
    }

    #[test]
    fn test_parse_key_rejects_foreign_keys() {
        assert!(parse_key("/apps/other/accounts/work").is_none());
        assert!(parse_key("relative/key").is_none());
        assert!(parse_key(ACCOUNT_NAMESPACE).is_none());
        assert!(parse_key(SERVER_ACCOUNT_NAMESPACE).is_none());
    }

    #[test]
    fn test_key_validity() {
        assert!(is_valid_key("/apps/heimdall/accounts/work"));
        assert!(is_valid_key("/apps/heimdall/accounts/w%C3%B6rk/port"));
        assert!(!is_valid_key("apps/heimdall"));
        assert!(!is_valid_key("/apps//heimdall"));
        assert!(!is_valid_key("/apps/heimdall/bad name"));
        assert!(!is_valid_key("/"));
    }
}
