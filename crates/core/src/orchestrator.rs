//! Runs export then import for each configured source, one after another.
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::config::{ConfigError, MigrationConfig, ProjectSettings, SourceConfig};
use crate::document::model::ContentType;
use crate::error::MigrationError;
use crate::events::bus::EventBus;
use crate::events::types::MigrationEvent;
use crate::export::Exporter;
use crate::import::Importer;
use crate::report::{MigrationReport, SourceReport};
use crate::store::{ContentStore, HttpStore, MemoryStore, StoreError};

/// Opens the stores a migration talks to.
pub trait StoreProvider: Send + Sync {
    fn source_store(&self, source: &SourceConfig) -> Result<Arc<dyn ContentStore>, StoreError>;
    fn target_store(&self, target: &ProjectSettings) -> Result<Arc<dyn ContentStore>, StoreError>;
}

/// Reads and writes through the HTTP API; in dry-run mode writes land in an
/// in-memory dataset instead.
#[derive(Debug, Default)]
pub struct HttpStoreProvider {
    dry_run_target: Option<Arc<MemoryStore>>,
}

impl HttpStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(target: Arc<MemoryStore>) -> Self {
        Self {
            dry_run_target: Some(target),
        }
    }
}

impl StoreProvider for HttpStoreProvider {
    fn source_store(&self, source: &SourceConfig) -> Result<Arc<dyn ContentStore>, StoreError> {
        Ok(Arc::new(HttpStore::new(&source.project)?))
    }

    fn target_store(&self, target: &ProjectSettings) -> Result<Arc<dyn ContentStore>, StoreError> {
        match &self.dry_run_target {
            Some(store) => Ok(store.clone()),
            None => Ok(Arc::new(HttpStore::new(target)?)),
        }
    }
}

pub struct Orchestrator<P> {
    config: MigrationConfig,
    provider: P,
    events: EventBus,
}

impl<P: StoreProvider> Orchestrator<P> {
    /// Validates the configuration before anything else; a missing write
    /// token fails here, before any store is opened.
    pub fn new(config: MigrationConfig, provider: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            provider,
            events: EventBus::default(),
        })
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Migrate every source. A source that fails entirely is reported with
    /// zero counts and its error; the run always completes.
    pub async fn run(&self) -> MigrationReport {
        let started_at = Utc::now();
        info!(
            target_project = %self.config.target.project_id,
            dataset = %self.config.target.dataset,
            sources = self.config.sources.len(),
            "starting migration"
        );

        let mut sources = Vec::with_capacity(self.config.sources.len());
        for source in &self.config.sources {
            self.events.publish(MigrationEvent::SourceStarted {
                source: source.name.clone(),
                site: source.site.to_string(),
                timestamp: Utc::now(),
            });

            let report = match self.migrate_source(source).await {
                Ok(report) => {
                    self.events.publish(MigrationEvent::SourceFinished {
                        source: source.name.clone(),
                        imported: report.imported,
                        failed: report.failed,
                    });
                    report
                }
                Err(err) => {
                    error!(source = %source.name, error = %err, "source migration failed");
                    self.events.publish(MigrationEvent::SourceFailed {
                        source: source.name.clone(),
                        reason: err.to_string(),
                    });
                    SourceReport::failed_source(&source.name, source.site.clone(), err)
                }
            };
            sources.push(report);
        }

        let report = MigrationReport {
            started_at,
            finished_at: Utc::now(),
            sources,
        };
        info!(
            imported = report.total_imported(),
            failed = report.total_failed(),
            "migration finished"
        );
        report
    }

    async fn migrate_source(&self, source: &SourceConfig) -> Result<SourceReport, MigrationError> {
        let source_store = self.provider.source_store(source)?;
        let exported = Exporter::new(source_store.as_ref(), &self.events)
            .export(source)
            .await;
        if exported.skipped_types.len() == ContentType::IMPORT_ORDER.len() {
            return Err(MigrationError::SourceUnavailable(source.name.clone()));
        }

        let target = self.provider.target_store(&self.config.target)?;
        let stats = Importer::new(target.as_ref(), &self.events)
            .import(&exported.batch)
            .await;

        Ok(SourceReport {
            name: source.name.clone(),
            site: source.site.clone(),
            exported: exported.batch.len(),
            imported: stats.imported,
            failed: stats.failed + exported.rejected.len(),
            skipped_types: exported
                .skipped_types
                .iter()
                .map(|(doc_type, err)| (*doc_type, err.to_string()))
                .collect(),
            degraded: stats.degraded_ids().map(str::to_string).collect(),
            error: None,
        })
    }
}
