//! Human-readable summary rendering.

use crate::models::PendingItem;

/// Maximum number of items enumerated in one message; the rest are folded
/// into a trailer line.
pub const MAX_LISTED_ITEMS: usize = 20;

/// Render the notification message for a recipient and their pending items.
///
/// Pure and deterministic: identical inputs always produce the identical
/// string, which is what makes the content fingerprint meaningful.
pub fn format_message(recipient: &str, items: &[PendingItem]) -> String {
    if items.is_empty() {
        return format!("Tidak ada tugas tertunda untuk {recipient}.");
    }

    let mut lines = Vec::with_capacity(items.len().min(MAX_LISTED_ITEMS) + 2);
    lines.push(format!(
        "Halo {recipient}, ada {} item belum selesai:",
        items.len()
    ));

    for (idx, item) in items.iter().take(MAX_LISTED_ITEMS).enumerate() {
        let mut line = format!(
            "{}. [{}] {} - {}",
            idx + 1,
            item.section_name,
            item.kind,
            item.title
        );
        if !item.url.is_empty() {
            line.push_str(&format!("\n- Link: {}", item.url));
        }
        lines.push(line);
    }

    if items.len() > MAX_LISTED_ITEMS {
        lines.push(format!("Dan {} lagi...", items.len() - MAX_LISTED_ITEMS));
    }

    lines.join("\n")
}
