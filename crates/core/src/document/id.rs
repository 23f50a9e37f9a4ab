//! Document ID namespacing.
//!
//! Source datasets use Sanity's conventions:
//! - Published: `{id}`
//! - Draft: `drafts.{id}`
//!
//! In the consolidated dataset every id carries its site:
//! `{drafts.?}{site}--{id}`. Internally the id is kept as a typed key and only
//! rendered to that string form at the CMS boundary.
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::model::SiteTag;

pub const DRAFT_PREFIX: &str = "drafts.";
pub const NAMESPACE_SEPARATOR: &str = "--";

/// A document id namespaced to one site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamespacedId {
    draft: bool,
    site: SiteTag,
    local: String,
}

impl NamespacedId {
    pub fn new(site: SiteTag, local: impl Into<String>, draft: bool) -> Self {
        Self {
            draft,
            site,
            local: local.into(),
        }
    }

    /// Namespace an id as read from a source dataset.
    ///
    /// The draft marker is kept in front of the namespaced form; everything
    /// after it becomes the local part verbatim.
    pub fn from_source(original_id: &str, site: &SiteTag) -> Self {
        match original_id.strip_prefix(DRAFT_PREFIX) {
            Some(clean) => Self::new(site.clone(), clean, true),
            None => Self::new(site.clone(), original_id, false),
        }
    }

    /// Parse an id already in the consolidated form.
    ///
    /// Splits on the first separator: site tags never contain it, so the
    /// local part may.
    pub fn parse(id: &str) -> Option<Self> {
        let (draft, rest) = match id.strip_prefix(DRAFT_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, id),
        };
        let (site, local) = rest.split_once(NAMESPACE_SEPARATOR)?;
        if local.is_empty() {
            return None;
        }
        let site = SiteTag::parse(site).ok()?;
        Some(Self::new(site, local, draft))
    }

    pub fn site(&self) -> &SiteTag {
        &self.site
    }

    pub fn local_id(&self) -> &str {
        &self.local
    }

    pub fn is_draft(&self) -> bool {
        self.draft
    }

    /// The published counterpart of this id.
    pub fn published(&self) -> Self {
        Self {
            draft: false,
            ..self.clone()
        }
    }
}

impl fmt::Display for NamespacedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.draft {
            f.write_str(DRAFT_PREFIX)?;
        }
        write!(f, "{}{NAMESPACE_SEPARATOR}{}", self.site, self.local)
    }
}

impl Serialize for NamespacedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NamespacedId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NamespacedId::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("not a namespaced id: {raw}")))
    }
}

/// Map an original id to its namespaced string form.
///
/// Not idempotent: feeding the output back in prefixes the site again.
pub fn transform_id(original_id: &str, site: &SiteTag) -> String {
    NamespacedId::from_source(original_id, site).to_string()
}
