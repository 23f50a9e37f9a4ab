//! Cross-document references and their rewriting into a site namespace.
//!
//! References are Sanity-style objects, `{"_type": "reference", "_ref": id}`,
//! stored in a known set of fields.
use serde_json::{Map, Value};

use super::id::{transform_id, NamespacedId};
use super::model::SiteTag;

/// Fields holding an array of references.
pub const REFERENCE_ARRAY_FIELDS: [&str; 3] = ["referencedWhitepapers", "referencedBlogs", "categories"];

/// Fields holding a single reference.
pub const SINGLE_REFERENCE_FIELDS: [&str; 1] = ["parentWhitepaper"];

/// One outgoing link from a document. Weak: the target may not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub target_id: String,
}

/// Every reference-bearing field, arrays first.
pub fn reference_fields() -> impl Iterator<Item = &'static str> {
    REFERENCE_ARRAY_FIELDS
        .into_iter()
        .chain(SINGLE_REFERENCE_FIELDS)
}

fn ref_id(value: &Value) -> Option<&str> {
    value.get("_ref").and_then(Value::as_str)
}

/// Rewrite one reference into the site namespace.
///
/// Values without a string `_ref` come back unchanged.
pub fn transform_reference(reference: &Value, site: &SiteTag) -> Value {
    let Some(target) = ref_id(reference) else {
        return reference.clone();
    };
    let mut out = reference.clone();
    out["_ref"] = Value::String(transform_id(target, site));
    out
}

fn map_reference_fields(
    fields: &Map<String, Value>,
    mut rewrite: impl FnMut(&Value) -> Value,
) -> Map<String, Value> {
    let mut out = fields.clone();
    for field in REFERENCE_ARRAY_FIELDS {
        if let Some(Value::Array(items)) = out.get_mut(field) {
            for item in items.iter_mut() {
                *item = rewrite(item);
            }
        }
    }
    for field in SINGLE_REFERENCE_FIELDS {
        if let Some(value) = out.get_mut(field) {
            if ref_id(value).is_some() {
                *value = rewrite(value);
            }
        }
    }
    out
}

/// Rewrite every reference-bearing field into the site namespace.
pub fn transform_references(fields: &Map<String, Value>, site: &SiteTag) -> Map<String, Value> {
    map_reference_fields(fields, |r| transform_reference(r, site))
}

/// Namespace references that are not yet in `site`'s namespace; already
/// namespaced ones are left alone. Returns `None` when nothing changed.
pub fn repair_references(fields: &Map<String, Value>, site: &SiteTag) -> Option<Map<String, Value>> {
    let mut changed = false;
    let repaired = map_reference_fields(fields, |reference| match ref_id(reference) {
        Some(target) if !in_namespace(target, site) => {
            changed = true;
            transform_reference(reference, site)
        }
        _ => reference.clone(),
    });
    changed.then_some(repaired)
}

fn in_namespace(id: &str, site: &SiteTag) -> bool {
    NamespacedId::parse(id).is_some_and(|parsed| parsed.site() == site)
}

/// A copy with every reference-bearing field removed.
pub fn strip_references(fields: &Map<String, Value>) -> Map<String, Value> {
    let mut out = fields.clone();
    for field in reference_fields() {
        out.remove(field);
    }
    out
}

pub fn has_reference_fields(fields: &Map<String, Value>) -> bool {
    reference_fields().any(|field| fields.contains_key(field))
}

pub fn collect_references(fields: &Map<String, Value>) -> Vec<Reference> {
    let mut refs = Vec::new();
    for field in REFERENCE_ARRAY_FIELDS {
        if let Some(Value::Array(items)) = fields.get(field) {
            refs.extend(items.iter().filter_map(ref_id).map(|target| Reference {
                field,
                target_id: target.to_string(),
            }));
        }
    }
    for field in SINGLE_REFERENCE_FIELDS {
        if let Some(target) = fields.get(field).and_then(ref_id) {
            refs.push(Reference {
                field,
                target_id: target.to_string(),
            });
        }
    }
    refs
}
