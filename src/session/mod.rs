// src/session/mod.rs — Visitor identity and entitlement
//
// A `Session` is the client's cached copy of the authenticated user record.
// At most one is live at a time and only `SessionManager` writes it.

pub mod manager;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::util::timestamp;

pub use manager::{RestoreOutcome, SessionManager, VerifyOutcome};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

/// Subscription level. Variant order is the upgrade order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Business,
}

impl SubscriptionTier {
    pub const ALL: [SubscriptionTier; 3] = [
        SubscriptionTier::Free,
        SubscriptionTier::Pro,
        SubscriptionTier::Business,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Business => "business",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "business" => Ok(SubscriptionTier::Business),
            other => Err(format!(
                "unknown tier '{other}' (expected free, pro or business)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    /// Opaque bearer credential.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub subscription_tier: SubscriptionTier,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub daily_api_calls: i64,
    #[serde(default = "default_max_daily_api_calls")]
    pub max_daily_api_calls: i64,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub subscription_expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_max_daily_api_calls() -> i64 {
    100
}

fn default_true() -> bool {
    true
}

impl Session {
    /// Credential to attach as `Authorization: Bearer`, if any.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn tier(&self) -> SubscriptionTier {
        self.subscription_tier
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tier_order() {
        assert!(SubscriptionTier::Free < SubscriptionTier::Pro);
        assert!(SubscriptionTier::Pro < SubscriptionTier::Business);
        assert!(!SubscriptionTier::Free.is_paid());
        assert!(SubscriptionTier::Business.is_paid());
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!("PRO".parse::<SubscriptionTier>(), Ok(SubscriptionTier::Pro));
        assert!("gold".parse::<SubscriptionTier>().is_err());
    }

    #[test]
    fn test_session_from_backend_user_record() {
        let json = r#"{
            "id": "2f1c",
            "email": "ana@example.com",
            "name": null,
            "subscription_tier": "pro",
            "stripe_customer_id": "cus_1",
            "api_key": "vd_abc",
            "daily_api_calls": 12,
            "max_daily_api_calls": 10000,
            "created_at": "2025-01-15T10:30:00.123456",
            "subscription_expires_at": null,
            "is_active": true
        }"#;
        let s: Session = serde_json::from_str(json).unwrap();
        assert_eq!(s.email, "ana@example.com");
        assert_eq!(s.credential(), Some("vd_abc"));
        assert_eq!(s.tier(), SubscriptionTier::Pro);
        assert_eq!(s.max_daily_api_calls, 10000);
        assert!(s.subscription_expires_at.is_none());
        assert_eq!(s.display_name(), "ana@example.com");
    }

    #[test]
    fn test_blank_credential_is_none() {
        let json = r#"{"email":"a@b.c","api_key":"  ","created_at":"2025-01-15T10:30:00Z"}"#;
        let s: Session = serde_json::from_str(json).unwrap();
        assert_eq!(s.credential(), None);
        assert_eq!(s.tier(), SubscriptionTier::Free);
        assert!(s.is_active);
    }

    #[test]
    fn test_missing_created_at_is_malformed() {
        let json = r#"{"email":"a@b.c","api_key":"k"}"#;
        assert!(serde_json::from_str::<Session>(json).is_err());
    }
}
