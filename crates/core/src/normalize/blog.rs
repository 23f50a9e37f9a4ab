use serde_json::{Map, Value};

use tracing::warn;

use crate::document::model::Document;

/// Author used when a legacy author object carries no name.
pub const DEFAULT_AUTHOR: &str = "Staff";

/// Legacy single whitepaper reference, superseded by `referencedWhitepapers`.
const LEGACY_PARENT_FIELD: &str = "parentWhitePaper";
const LEGACY_KEYWORDS_FIELD: &str = "keywords";
const DROPPED_FIELDS: [&str; 1] = ["readTime"];
const DROPPED_SEO_FIELDS: [&str; 1] = ["focusKeyword"];

/// Bring a blog post from the legacy schema into the target schema.
///
/// References moved here are left in their source form; the exporter
/// namespaces every reference field afterwards.
pub fn normalize_blog(document: &Document) -> Document {
    let mut fields = document.fields.clone();

    normalize_author(&mut fields);

    if let Some(parent) = fields.remove(LEGACY_PARENT_FIELD) {
        if parent.get("_ref").and_then(Value::as_str).is_some() {
            fields.insert("referencedWhitepapers".into(), Value::Array(vec![parent]));
        }
    }

    if let Some(keywords) = fields.remove(LEGACY_KEYWORDS_FIELD) {
        let tags_absent = fields.get("tags").map_or(true, Value::is_null);
        if tags_absent && !keywords.is_null() {
            fields.insert("tags".into(), keywords);
        }
    }

    for field in DROPPED_FIELDS {
        fields.remove(field);
    }

    if let Some(Value::Object(seo)) = fields.get_mut("seo") {
        for field in DROPPED_SEO_FIELDS {
            seo.remove(field);
        }
    }

    Document::new(document.id.clone(), document.doc_type, fields)
}

/// Flatten an author object to its name. Any other shape is left as is.
fn normalize_author(fields: &mut Map<String, Value>) {
    let name = match fields.get("author") {
        Some(Value::Object(obj)) => obj
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_AUTHOR)
            .to_string(),
        Some(Value::String(_) | Value::Null) | None => return,
        Some(other) => {
            warn!(author = %other, "leaving author of unknown shape untouched");
            return;
        }
    };
    fields.insert("author".into(), Value::String(name));
}
