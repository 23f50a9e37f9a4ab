use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::{NamespacedId, NAMESPACE_SEPARATOR};
use super::reference::{self, Reference};
use super::validate::{validate_document_fields, ValidationError};

/// Fields managed by the content lake itself; never copied between datasets.
pub const BOOKKEEPING_FIELDS: [&str; 3] = ["_rev", "_createdAt", "_updatedAt"];

/// Content types the migration knows how to move.
///
/// Declaration order is the import order: referenced types come before the
/// types that reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
    Category,
    SiteSettings,
    Partner,
    Whitepaper,
    Blog,
    Video,
}

impl ContentType {
    pub const IMPORT_ORDER: [ContentType; 6] = [
        ContentType::Category,
        ContentType::SiteSettings,
        ContentType::Partner,
        ContentType::Whitepaper,
        ContentType::Blog,
        ContentType::Video,
    ];

    /// The `_type` value used in the CMS.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Category => "category",
            ContentType::SiteSettings => "siteSettings",
            ContentType::Partner => "partner",
            ContentType::Whitepaper => "whitepaper",
            ContentType::Blog => "blog",
            ContentType::Video => "video",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::IMPORT_ORDER.into_iter().find(|t| t.as_str() == raw)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition key for one logical site inside the consolidated dataset.
///
/// A lowercase slug (`a-z`, `0-9`, single `-`). It can never contain the
/// namespace separator, which keeps namespaced ids unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteTag(String);

impl SiteTag {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let valid_chars = raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if raw.is_empty()
            || !valid_chars
            || raw.starts_with('-')
            || raw.ends_with('-')
            || raw.contains(NAMESPACE_SEPARATOR)
        {
            return Err(ValidationError::InvalidSiteTag(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SiteTag {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SiteTag::parse(&value)
    }
}

impl From<SiteTag> for String {
    fn from(tag: SiteTag) -> Self {
        tag.0
    }
}

impl fmt::Display for SiteTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A migrated document in the consolidated dataset.
///
/// The site is always the one encoded in the id. `fields` never holds `_id`,
/// `_type` or `site`; those are rendered from the typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: NamespacedId,
    pub doc_type: ContentType,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: NamespacedId, doc_type: ContentType, mut fields: Map<String, Value>) -> Self {
        fields.remove("_id");
        fields.remove("_type");
        fields.remove("site");
        Self {
            id,
            doc_type,
            fields,
        }
    }

    /// Parse a document already in the consolidated form (e.g. one NDJSON line).
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut fields) = value else {
            return Err(ValidationError::NotAnObject);
        };
        validate_document_fields(
            fields.get("_id").and_then(Value::as_str),
            fields.get("_type").and_then(Value::as_str),
        )?;

        // validated above
        let raw_id = fields.get("_id").and_then(Value::as_str).unwrap_or_default();
        let id = NamespacedId::parse(raw_id)
            .ok_or_else(|| ValidationError::NotNamespaced(raw_id.to_string()))?;
        let raw_type = fields.get("_type").and_then(Value::as_str).unwrap_or_default();
        let doc_type = ContentType::parse(raw_type)
            .ok_or_else(|| ValidationError::UnknownType(raw_type.to_string()))?;

        if let Some(site) = fields.remove("site") {
            if site.as_str() != Some(id.site().as_str()) {
                return Err(ValidationError::SiteMismatch {
                    id: id.to_string(),
                    site: site.to_string(),
                });
            }
        }

        Ok(Self::new(id, doc_type, fields))
    }

    pub fn site(&self) -> &SiteTag {
        self.id.site()
    }

    /// All outgoing references, in field order.
    pub fn references(&self) -> Vec<Reference> {
        reference::collect_references(&self.fields)
    }

    /// Render the document in the CMS wire form.
    pub fn to_value(&self) -> Value {
        let mut out = Map::with_capacity(self.fields.len() + 3);
        out.insert("_id".into(), Value::String(self.id.to_string()));
        out.insert("_type".into(), Value::String(self.doc_type.as_str().into()));
        out.insert("site".into(), Value::String(self.site().to_string()));
        for (key, value) in &self.fields {
            out.insert(key.clone(), value.clone());
        }
        Value::Object(out)
    }

    /// A copy with every reference-bearing field removed.
    pub fn without_references(&self) -> Self {
        Self {
            id: self.id.clone(),
            doc_type: self.doc_type,
            fields: reference::strip_references(&self.fields),
        }
    }
}
