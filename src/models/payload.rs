//! Webhook notification payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::course::PendingItem;
use super::identity::Identity;

/// Which trigger started an evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// Deferred run shortly after startup
    Bootstrap,
    /// Immediate run after the cached snapshot was refreshed
    CourseUpdate,
}

impl SourceTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::CourseUpdate => "course_update",
        }
    }
}

/// Identity subset forwarded to the webhook receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    /// Full display name, if known
    pub name: Option<String>,

    /// Student number, if known
    pub nim: Option<String>,
}

/// The JSON body posted to the notification webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Payload discriminator, always "incomplete_summary"
    #[serde(rename = "type")]
    pub kind: String,

    /// Recipient contact handle
    pub phone: String,

    /// Recipient identity subset
    pub user: UserRef,

    /// Trigger tag ("bootstrap" or "course_update")
    pub source: SourceTag,

    /// Number of pending items
    pub count: usize,

    /// The pending items themselves
    pub items: Vec<PendingItem>,

    /// Rendered summary message
    pub message: String,

    /// When the payload was built (RFC 3339, UTC)
    pub timestamp: DateTime<Utc>,
}

impl NotificationPayload {
    /// Assemble a payload for the given run.
    pub fn new(
        phone: &str,
        identity: Option<&Identity>,
        source: SourceTag,
        items: Vec<PendingItem>,
        message: String,
    ) -> Self {
        Self {
            kind: "incomplete_summary".to_string(),
            phone: phone.to_string(),
            user: UserRef {
                name: identity.and_then(|i| i.fullname.clone()),
                nim: identity.and_then(|i| i.username.clone()),
            },
            source,
            count: items.len(),
            items,
            message,
            timestamp: Utc::now(),
        }
    }
}
