//! Session handed out by the external auth provider.
//!
//! The store never consults it; one store instance is one local collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix epoch seconds.
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }
}

/// Capability to obtain a session from an auth provider.
pub trait Authenticator {
    fn authenticate(&self) -> anyhow::Result<Session>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FixedAuth;

    impl Authenticator for FixedAuth {
        fn authenticate(&self) -> anyhow::Result<Session> {
            Ok(Session {
                access_token: "access".into(),
                refresh_token: "refresh".into(),
                expires_at: 1_700_000_100,
            })
        }
    }

    #[test]
    fn session_expires_at_deadline() {
        let session = FixedAuth.authenticate().unwrap();
        assert!(!session.is_expired(Utc.timestamp_opt(1_700_000_099, 0).unwrap()));
        assert!(session.is_expired(Utc.timestamp_opt(1_700_000_100, 0).unwrap()));
    }

    #[test]
    fn session_uses_provider_field_names() {
        let session = FixedAuth.authenticate().unwrap();
        let yaml = serde_yaml::to_string(&session).unwrap();
        assert!(yaml.contains("access_token: access"));
        assert!(yaml.contains("expires_at: 1700000100"));
    }
}
