//! Content migration core: consolidates documents from several source datasets
//! into one target dataset, namespacing ids per site.
//!
//! The pipeline is `Orchestrator` → (per source) `Exporter` → `Importer`,
//! strictly sequential, with every unit of work reported as a `Result`.

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod export;
pub mod import;
pub mod mutation;
pub mod ndjson;
pub mod normalize;
pub mod orchestrator;
pub mod repair;
pub mod report;
pub mod store;

pub use batch::MigrationBatch;
pub use config::{MigrationConfig, ProjectSettings, SourceConfig};
pub use document::id::{transform_id, NamespacedId};
pub use document::model::{ContentType, Document, SiteTag};
pub use error::MigrationError;
pub use events::bus::EventBus;
pub use export::Exporter;
pub use import::{ImportStats, Importer};
pub use orchestrator::{HttpStoreProvider, Orchestrator, StoreProvider};
pub use report::{MigrationReport, SourceReport};
pub use store::{ContentStore, DocumentQuery, StoreError};
