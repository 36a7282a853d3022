//! Pending coursework data structures.

use serde::{Deserialize, Serialize};

/// A not-yet-completed coursework item, flattened from the course snapshot.
///
/// Field names on the wire match what the webhook receiver already consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    /// Course display name
    pub course_name: String,

    /// Course code used in portal URLs
    #[serde(rename = "kodeCourse")]
    pub course_code: String,

    /// Section (meeting) display name
    pub section_name: String,

    /// Raw kind tag, e.g. "PRE_TEST" or "FORUM_DISKUSI"
    #[serde(rename = "type")]
    pub kind: String,

    /// Item title
    pub title: String,

    /// Direct link, empty when none could be resolved
    pub url: String,
}

/// Recognized item kinds, used to synthesize deep links.
///
/// Unrecognized tags fall into `Generic`; their raw tag string is still
/// carried on the [`PendingItem`] for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    PreTest,
    PostTest,
    Forum,
    Questionnaire,
    Generic,
}

impl ItemKind {
    /// Classify a raw kind tag from the snapshot.
    pub fn classify(tag: &str) -> Self {
        match tag {
            "PRE_TEST" => Self::PreTest,
            "POST_TEST" => Self::PostTest,
            "FORUM_DISKUSI" => Self::Forum,
            "KUESIONER" => Self::Questionnaire,
            _ => Self::Generic,
        }
    }

    /// Whether this kind links to the exam page.
    pub fn is_exam(self) -> bool {
        matches!(self, Self::PreTest | Self::PostTest)
    }
}
