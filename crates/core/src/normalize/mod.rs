//! Per-type adapters reshaping legacy source documents into the target schema.
//!
//! Never fails: legacy data is heterogeneous, so fields that are missing or
//! in an unknown shape are passed through or dropped.

pub mod blog;

use crate::document::model::{ContentType, Document};

/// Normalize a document for its type. Copy-on-write: the input is untouched.
pub fn normalize(document: &Document) -> Document {
    match document.doc_type {
        ContentType::Blog => blog::normalize_blog(document),
        _ => document.clone(),
    }
}
