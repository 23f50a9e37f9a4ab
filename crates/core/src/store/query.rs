//! Typed document queries, rendered to GROQ only at the HTTP boundary.
use serde_json::Value;

use crate::document::model::{ContentType, SiteTag};
use crate::document::reference::reference_fields;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentQuery {
    /// Every document of one type: `*[_type == $type]`.
    OfType(ContentType),
    /// Documents of a site that define at least one reference field.
    SiteReferences(SiteTag),
}

impl DocumentQuery {
    /// GROQ filter with `$` placeholders for [`Self::params`].
    pub fn groq(&self) -> String {
        match self {
            DocumentQuery::OfType(_) => "*[_type == $type]".to_string(),
            DocumentQuery::SiteReferences(_) => {
                let defined = reference_fields()
                    .map(|field| format!("defined({field})"))
                    .collect::<Vec<_>>()
                    .join(" || ");
                format!("*[site == $site && ({defined})]")
            }
        }
    }

    /// Bound parameters, as `(name, value)` without the `$`.
    pub fn params(&self) -> Vec<(&'static str, Value)> {
        match self {
            DocumentQuery::OfType(doc_type) => vec![("type", Value::String(doc_type.as_str().into()))],
            DocumentQuery::SiteReferences(site) => vec![("site", Value::String(site.to_string()))],
        }
    }

    /// Evaluate the query against one raw document.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            DocumentQuery::OfType(doc_type) => {
                document.get("_type").and_then(Value::as_str) == Some(doc_type.as_str())
            }
            DocumentQuery::SiteReferences(site) => {
                document.get("site").and_then(Value::as_str) == Some(site.as_str())
                    && reference_fields().any(|field| document.get(field).is_some_and(|v| !v.is_null()))
            }
        }
    }
}
