//! Pending-item extraction from the cached course snapshot.
//!
//! The snapshot is whatever the portal handed the host page: an array of
//! course objects whose field names drift across portal versions. Each
//! logical field is resolved against an ordered list of known aliases, and
//! anything structurally unexpected degrades to a default instead of
//! failing. The traversal emits items in input order: course-major, then
//! section, then item.

use serde_json::Value;

use crate::models::{ItemKind, PendingItem};
use crate::utils::normalize_base_url;

/// Fallback course display name.
const DEFAULT_COURSE_NAME: &str = "Mata Kuliah";

/// Fallback section display name.
const DEFAULT_SECTION_NAME: &str = "Pertemuan";

/// Fallback kind tag.
const DEFAULT_KIND: &str = "ITEM";

/// Field aliases, in lookup order.
const COURSE_CODE_FIELDS: &[&str] = &["kode_course", "kodeCourse", "kode_course_section"];
const COURSE_NAME_FIELDS: &[&str] = &["coursename", "course_name"];
const SECTION_CONTAINER_FIELDS: &[&str] = &["section", "sections", "data"];
const SECTION_NAME_FIELDS: &[&str] = &["nama_section", "name", "title"];
const ITEM_CONTAINER_FIELDS: &[&str] = &["sub_section", "items"];
const KIND_FIELDS: &[&str] = &["kode_template", "type"];
const TITLE_FIELDS: &[&str] = &["judul", "title", "name"];

/// Extract all incomplete items from a course snapshot.
///
/// Never fails: a snapshot that is not an array yields an empty list, and
/// malformed courses, sections, or items contribute nothing.
pub fn extract_pending_items(snapshot: &Value, base_url: &str) -> Vec<PendingItem> {
    let base = normalize_base_url(base_url);
    let mut items = Vec::new();

    let Some(courses) = snapshot.as_array() else {
        return items;
    };

    for course in courses {
        let course_code = first_token(course, COURSE_CODE_FIELDS).unwrap_or_default();
        let course_name = first_str(course, COURSE_NAME_FIELDS)
            .unwrap_or(DEFAULT_COURSE_NAME)
            .to_string();

        for section in container(course, SECTION_CONTAINER_FIELDS) {
            let section_name = first_str(section, SECTION_NAME_FIELDS)
                .unwrap_or(DEFAULT_SECTION_NAME)
                .to_string();
            let section_code = first_token(section, &["kode_section"]);

            for item in container(section, ITEM_CONTAINER_FIELDS) {
                if is_truthy(item.get("completion")) {
                    continue;
                }

                let kind = first_str(item, KIND_FIELDS).unwrap_or(DEFAULT_KIND).to_string();
                let title = first_str(item, TITLE_FIELDS).unwrap_or(&kind).to_string();
                let url = resolve_url(
                    base,
                    item,
                    &kind,
                    &course_code,
                    section_code.as_deref(),
                );

                items.push(PendingItem {
                    course_name: course_name.clone(),
                    course_code: course_code.clone(),
                    section_name: section_name.clone(),
                    kind,
                    title,
                    url,
                });
            }
        }
    }

    items
}

/// Resolve the item URL: explicit link first, then synthesis for known
/// kinds, otherwise empty.
fn resolve_url(
    base: &str,
    item: &Value,
    kind_tag: &str,
    course_code: &str,
    section_code: Option<&str>,
) -> String {
    if let Some(link) = first_str(item, &["link"]) {
        return link.to_string();
    }
    if course_code.is_empty() {
        return String::new();
    }

    let item_id = first_token(item, &["id"]);
    match ItemKind::classify(kind_tag) {
        kind if kind.is_exam() => item_id
            .map(|id| format!("{base}/u-courses/{course_code}/exam/{id}"))
            .unwrap_or_default(),
        ItemKind::Forum => item_id
            .map(|id| format!("{base}/u-courses/{course_code}/forum/{id}"))
            .unwrap_or_default(),
        ItemKind::Questionnaire => section_code
            .map(|code| format!("{base}/u-courses/{course_code}/kuesioner/{code}"))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// First alias whose value is a non-empty string.
fn first_str<'a>(value: &'a Value, candidates: &[&str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|key| value.get(*key))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
}

/// First alias holding a usable identifier: a non-empty string or a nonzero
/// number (stringified).
fn first_token(value: &Value, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            _ => None,
        })
}

/// Elements of the first present container alias. A container that is
/// present but not an array contributes nothing.
fn container<'a>(value: &'a Value, candidates: &[&str]) -> &'a [Value] {
    candidates
        .iter()
        .filter_map(|key| value.get(*key))
        .find(|v| is_truthy(Some(*v)))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// JSON truthiness, matching the host page's completion check: null, false,
/// zero, and the empty string are falsy; everything else is truthy.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
