// src/config.rs

//! Runtime preference loading.
//!
//! Operator-level settings (portal origin, HTTP behavior, bootstrap delay)
//! come from TOML — see [`crate::models::Config`]. The per-user runtime
//! toggles live in the state store under the same keys the host page
//! exposes to the student, and are re-read on every evaluation so a change
//! takes effect on the next trigger without a restart.

use crate::storage::{
    self, ENABLED_KEY, NOTIFY_INCOMPLETE_KEY, PHONE_KEY, StateStore, WEBHOOK_URL_KEY,
};

/// Store-backed runtime preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    /// Master switch; absent means disabled
    pub enabled: bool,

    /// Recipient contact handle, trimmed
    pub phone: String,

    /// Webhook endpoint URL
    pub webhook_url: String,

    /// Whether incomplete items are extracted; absent means yes
    pub include_incomplete: bool,
}

impl Preferences {
    /// Load preferences from the store. Read failures degrade to defaults.
    pub async fn load(store: &dyn StateStore) -> Self {
        Self {
            enabled: storage::get_bool(store, ENABLED_KEY, false).await,
            phone: storage::get_string(store, PHONE_KEY, "").await.trim().to_string(),
            webhook_url: storage::get_string(store, WEBHOOK_URL_KEY, "").await,
            include_incomplete: storage::get_bool(store, NOTIFY_INCOMPLETE_KEY, true).await,
        }
    }

    /// Whether evaluation should proceed at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.phone.is_empty()
    }
}
