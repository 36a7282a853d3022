// src/pipeline/mod.rs

//! The extraction → formatting → dedup → dispatch pipeline.

pub mod evaluate;
pub mod extract;
pub mod fingerprint;
pub mod format;

pub use evaluate::{Notifier, Outcome};
pub use extract::extract_pending_items;
pub use fingerprint::{content_fingerprint, fingerprint};
pub use format::{MAX_LISTED_ITEMS, format_message};
