//! Content fingerprint for notification deduplication.
//!
//! The fingerprint is an equality oracle: identical input always yields the
//! identical token, and that is all the dedup check relies on. It is not a
//! security control.

use sha2::{Digest, Sha256};

/// Length of the emitted token in hex characters.
const FINGERPRINT_LEN: usize = 16;

/// Separator joining the recipient handle and the message before hashing.
const SEPARATOR: char = '|';

/// Deterministic short token for an arbitrary string.
pub fn fingerprint(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut token = hex::encode(digest);
    token.truncate(FINGERPRINT_LEN);
    token
}

/// Fingerprint of a notification's content state.
///
/// The recipient handle is bound into the token so the same message aimed at
/// a different handle produces a different token.
pub fn content_fingerprint(phone: &str, message: &str) -> String {
    fingerprint(&format!("{phone}{SEPARATOR}{message}"))
}
