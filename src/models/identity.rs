//! Recipient identity data structure.

use serde::{Deserialize, Serialize};

/// Fallback recipient label when no name is known.
pub const DEFAULT_RECIPIENT: &str = "Mahasiswa";

/// Identity of the student receiving notifications.
///
/// Parsed leniently from the cached portal login info; every field is
/// optional because snapshot versions disagree on which ones are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    /// Full display name
    pub fullname: Option<String>,

    /// Short name
    pub name: Option<String>,

    /// Account identifier (student number)
    pub username: Option<String>,
}

impl Identity {
    /// Resolve the display name: first non-empty of fullname, name,
    /// username, falling back to [`DEFAULT_RECIPIENT`].
    pub fn display_name(&self) -> &str {
        [&self.fullname, &self.name, &self.username]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_RECIPIENT)
    }
}
