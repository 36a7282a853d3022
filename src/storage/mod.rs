//! Key-value state persistence.
//!
//! The notifier reads its inputs (cached course snapshot, login identity,
//! runtime preferences) and writes its single output (the last-sent
//! fingerprint) through a scalar key-value interface. Keys are the ones the
//! host page already uses, so a store rooted at the page's export directory
//! is drop-in compatible.

pub mod local;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStateStore;

/// Cached course snapshot (JSON-encoded array of courses).
pub const COURSE_DATA_KEY: &str = "mentari_course_data";

/// Cached login identity (JSON-encoded object).
pub const USER_INFO_KEY: &str = "mentari_user_info";

/// Fingerprint of the last successfully delivered notification.
pub const LAST_SENT_HASH_KEY: &str = "wa_notifier_last_hash";

/// Whether notifications are enabled ("true"/"false").
pub const ENABLED_KEY: &str = "wa_notifier_enabled";

/// Recipient contact handle.
pub const PHONE_KEY: &str = "wa_notifier_phone";

/// Webhook endpoint URL.
pub const WEBHOOK_URL_KEY: &str = "wa_notifier_webhook";

/// Whether incomplete items are included ("true"/"false", default true).
pub const NOTIFY_INCOMPLETE_KEY: &str = "wa_notify_incomplete";

/// Trait for scalar state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the raw value for a key, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write the value for a key, creating it if absent.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Read a string value, degrading to `default` on absence or store failure.
pub async fn get_string(store: &dyn StateStore, key: &str, default: &str) -> String {
    match store.get(key).await {
        Ok(Some(value)) => value,
        Ok(None) => default.to_string(),
        Err(e) => {
            log::warn!("State read failed for '{}': {}. Using default.", key, e);
            default.to_string()
        }
    }
}

/// Read a boolean value. An absent key yields `default`; a present value is
/// true only when it is exactly `"true"`.
pub async fn get_bool(store: &dyn StateStore, key: &str, default: bool) -> bool {
    match store.get(key).await {
        Ok(Some(value)) => value == "true",
        Ok(None) => default,
        Err(e) => {
            log::warn!("State read failed for '{}': {}. Using default.", key, e);
            default
        }
    }
}

/// Read and parse a JSON value. Absence, store failure, and parse failure
/// all degrade to `None`; parse failures are logged and treated as absence.
pub async fn read_json<T: DeserializeOwned>(store: &dyn StateStore, key: &str) -> Option<T> {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("State read failed for '{}': {}. Treating as absent.", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Unparseable JSON under '{}': {}. Treating as absent.", key, e);
            None
        }
    }
}
