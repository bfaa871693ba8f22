//! Normalization of raw certification catalog entries.

use chrono::Utc;
use serde_json::Value;

use crate::models::Certification;

/// Category given to entries that carry none.
pub const DEFAULT_CATEGORY: &str = "기타";

/// Lowercase slug: alphanumerics kept, every other run collapsed to `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn text_field<'a>(raw: &'a Value, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| raw.get(*name).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

/// Deduplicated lowercase search tokens, in first-seen order.
pub fn search_keywords(raw: &Value, name: &str, category: &str) -> Vec<String> {
    let extra = ["keywords", "aliases"]
        .iter()
        .filter_map(|field| raw.get(*field).and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str);

    let mut keywords: Vec<String> = Vec::new();
    for source in [name, category].into_iter().chain(extra) {
        for token in tokens(source) {
            if !keywords.contains(&token) {
                keywords.push(token);
            }
        }
    }
    keywords
}

/// Turn one raw catalog object into a certification record.
///
/// Returns `None` when the entry has no usable name.
pub fn normalize(raw: &Value) -> Option<Certification> {
    let name = text_field(raw, &["name", "title"])?.to_string();

    let id = match text_field(raw, &["id"]) {
        Some(id) => id.to_string(),
        None => slugify(&name),
    };
    if id.is_empty() {
        return None;
    }

    let category = text_field(raw, &["category"])
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string();
    let level = text_field(raw, &["level", "difficulty", "field"]).map(String::from);
    let description = text_field(raw, &["description"])
        .unwrap_or_default()
        .to_string();
    let search_keywords = search_keywords(raw, &name, &category);

    Some(Certification {
        id,
        name,
        category,
        level,
        description,
        search_keywords,
        raw_data: Some(raw.clone()),
        updated_at: Some(Utc::now()),
    })
}
