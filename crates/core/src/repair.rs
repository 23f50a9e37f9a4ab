//! Follow-up pass over the target dataset: re-point references that still
//! carry source ids into their site's namespace.
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::document::model::SiteTag;
use crate::document::reference::repair_references;
use crate::error::MigrationError;
use crate::mutation::types::Mutation;
use crate::store::{ContentStore, DocumentQuery};

#[derive(Debug, Default)]
pub struct RepairStats {
    pub scanned: usize,
    pub updated: usize,
    pub failures: Vec<(String, MigrationError)>,
}

/// Patch every document of `site` whose reference fields point outside the
/// site's namespace. Failing the initial query fails the pass; a failing
/// patch is recorded and skipped.
pub async fn repair_site_references(
    store: &dyn ContentStore,
    site: &SiteTag,
) -> Result<RepairStats, MigrationError> {
    let documents = store.fetch(&DocumentQuery::SiteReferences(site.clone())).await?;
    info!(%site, count = documents.len(), "scanning documents with references");

    let mut stats = RepairStats {
        scanned: documents.len(),
        ..RepairStats::default()
    };
    for document in documents {
        let Some(id) = document.get("_id").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        let Some(fields) = document.as_object() else {
            continue;
        };
        let Some(repaired) = repair_references(fields, site) else {
            debug!(%id, "references already namespaced");
            continue;
        };

        let changed: Map<String, Value> = repaired
            .into_iter()
            .filter(|(key, value)| fields.get(key) != Some(value))
            .collect();
        match store.commit(vec![Mutation::set_fields(id.clone(), changed)]).await {
            Ok(_) => stats.updated += 1,
            Err(err) => {
                warn!(%id, error = %err, "failed to repair references");
                stats.failures.push((id, err.into()));
            }
        }
    }

    info!(%site, updated = stats.updated, failed = stats.failures.len(), "repair finished");
    Ok(stats)
}
