//! Protocol name tables for server accounts.
//!
//! Server account settings store protocol, authentication and security
//! choices as plain strings; these enums own the string forms and the
//! lenient parsing rules used when reading settings back.

use serde::{Deserialize, Serialize};

/// Protocol spoken by a server account endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProtocol {
    /// SMTP transport
    Smtp,
    /// POP3 store
    Pop3,
    /// IMAP store
    Imap,
}

impl MailProtocol {
    /// The string form stored in settings
    pub fn as_str(&self) -> &'static str {
        match self {
            MailProtocol::Smtp => "smtp",
            MailProtocol::Pop3 => "pop3",
            MailProtocol::Imap => "imap",
        }
    }

    /// Parse a stored protocol name; unknown names yield `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "smtp" => Some(MailProtocol::Smtp),
            "pop3" => Some(MailProtocol::Pop3),
            "imap" => Some(MailProtocol::Imap),
            _ => None,
        }
    }

    /// Whether this protocol names a transport (as opposed to a store)
    pub fn is_transport(&self) -> bool {
        matches!(self, MailProtocol::Smtp)
    }

    /// Default port for the protocol under the given security mode
    pub fn default_port(&self, security: ConnectionSecurity) -> u16 {
        match (self, security) {
            (MailProtocol::Smtp, ConnectionSecurity::Ssl) => 465,
            (MailProtocol::Smtp, _) => 587,
            (MailProtocol::Pop3, ConnectionSecurity::Ssl) => 995,
            (MailProtocol::Pop3, _) => 110,
            (MailProtocol::Imap, ConnectionSecurity::Ssl) => 993,
            (MailProtocol::Imap, _) => 143,
        }
    }
}

impl std::fmt::Display for MailProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authentication mechanism of a server account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMechanism {
    /// No authentication
    None,
    /// Plain username/password login
    Password,
    /// CRAM-MD5 challenge/response
    CramMd5,
}

impl AuthMechanism {
    /// The string form stored in settings
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMechanism::None => "none",
            AuthMechanism::Password => "password",
            AuthMechanism::CramMd5 => "cram-md5",
        }
    }

    /// Parse a stored mechanism name; unrecognized names fall back to
    /// [`AuthMechanism::None`]
    pub fn from_setting(name: &str) -> Self {
        match name {
            "password" => AuthMechanism::Password,
            "cram-md5" => AuthMechanism::CramMd5,
            _ => AuthMechanism::None,
        }
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection security mode of a server account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionSecurity {
    /// Plain connection
    None,
    /// TLS from the first byte
    Ssl,
    /// STARTTLS upgrade on a plain connection
    StartTls,
}

impl ConnectionSecurity {
    /// The string form stored in settings
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionSecurity::None => "none",
            ConnectionSecurity::Ssl => "ssl",
            ConnectionSecurity::StartTls => "starttls",
        }
    }

    /// Parse a stored security name; unrecognized names fall back to
    /// [`ConnectionSecurity::None`]
    pub fn from_setting(name: &str) -> Self {
        match name {
            "ssl" => ConnectionSecurity::Ssl,
            "starttls" => ConnectionSecurity::StartTls,
            _ => ConnectionSecurity::None,
        }
    }
}

impl std::fmt::Display for ConnectionSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How much of each message an account retrieves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrieveType {
    /// Headers only
    HeadersOnly,
    /// Full message bodies
    Messages,
    /// Bodies and attachments
    MessagesAndAttachments,
}

impl RetrieveType {
    /// The string form stored in settings
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrieveType::HeadersOnly => "headers-only",
            RetrieveType::Messages => "messages",
            RetrieveType::MessagesAndAttachments => "messages-and-attachments",
        }
    }

    /// Parse a stored retrieve type; unrecognized names fall back to
    /// [`RetrieveType::HeadersOnly`]
    pub fn from_setting(name: &str) -> Self {
        match name {
            "messages" => RetrieveType::Messages,
            "messages-and-attachments" => RetrieveType::MessagesAndAttachments,
            _ => RetrieveType::HeadersOnly,
        }
    }
}

impl std::fmt::Display for RetrieveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_round_trip() {
        for proto in [MailProtocol::Smtp, MailProtocol::Pop3, MailProtocol::Imap] {
            assert_eq!(MailProtocol::parse(proto.as_str()), Some(proto));
        }
        assert_eq!(MailProtocol::parse("nntp"), None);
    }

    #[test]
    fn test_lenient_parsing_falls_back() {
        assert_eq!(AuthMechanism::from_setting("password"), AuthMechanism::Password);
        assert_eq!(AuthMechanism::from_setting("scram-sha-1"), AuthMechanism::None);
        assert_eq!(
            ConnectionSecurity::from_setting("tls_op"),
            ConnectionSecurity::None
        );
        assert_eq!(
            RetrieveType::from_setting("everything"),
            RetrieveType::HeadersOnly
        );
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(
            MailProtocol::Imap.default_port(ConnectionSecurity::Ssl),
            993
        );
        assert_eq!(
            MailProtocol::Imap.default_port(ConnectionSecurity::StartTls),
            143
        );
        assert_eq!(MailProtocol::Smtp.default_port(ConnectionSecurity::Ssl), 465);
        assert_eq!(
            MailProtocol::Pop3.default_port(ConnectionSecurity::None),
            110
        );
    }

    #[test]
    fn test_transport_classification() {
        assert!(MailProtocol::Smtp.is_transport());
        assert!(!MailProtocol::Imap.is_transport());
    }
}
