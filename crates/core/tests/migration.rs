mod common;

use std::sync::Arc;

use serde_json::json;

use common::{Call, FixedProvider, RecordingStore};
use content_migrate_core::config::ConfigError;
use content_migrate_core::events::types::MigrationEvent;
use content_migrate_core::export::Exporter;
use content_migrate_core::import::{ImportStatus, Importer};
use content_migrate_core::store::MemoryStore;
use content_migrate_core::{
    ContentType, Document, DocumentQuery, EventBus, MigrationBatch, MigrationConfig, Orchestrator, ProjectSettings,
    SiteTag, SourceConfig,
};

fn site(raw: &str) -> SiteTag {
    SiteTag::parse(raw).unwrap()
}

fn target() -> ProjectSettings {
    ProjectSettings::new("target").with_token("write-token")
}

fn acme_source() -> Arc<RecordingStore> {
    Arc::new(RecordingStore::with_documents([
        json!({"_id": "cat1", "_type": "category", "_rev": "r1", "title": "Chips"}),
        json!({
            "_id": "wp1", "_type": "whitepaper", "_rev": "r2",
            "_createdAt": "2024-03-01T00:00:00Z",
            "categories": [{"_type": "reference", "_key": "k", "_ref": "cat1"}]
        }),
    ]))
}

#[tokio::test]
async fn migrates_category_and_whitepaper_into_site_namespace() {
    let target_store = Arc::new(MemoryStore::strict());
    let provider = FixedProvider::new(target_store.clone()).source("acme-project", acme_source());
    let config = MigrationConfig::new(
        target(),
        vec![SourceConfig::new("Acme", "acme-project", site("acme"))],
    );

    let report = Orchestrator::new(config, provider).unwrap().run().await;

    let acme = report.source(&site("acme")).unwrap();
    assert_eq!((acme.imported, acme.failed), (2, 0));
    assert!(acme.error.is_none());
    assert!(acme.degraded.is_empty());
    assert_eq!((report.total_imported(), report.total_failed()), (2, 0));

    let category = target_store.get("acme--cat1").await.unwrap();
    assert_eq!(category["site"], json!("acme"));
    assert_ne!(category["_rev"], json!("r1"));
    let whitepaper = target_store.get("acme--wp1").await.unwrap();
    assert_eq!(whitepaper["categories"][0]["_ref"], json!("acme--cat1"));
    assert_eq!(whitepaper["categories"][0]["_key"], json!("k"));
    assert_eq!(target_store.len().await, 2);
}

#[tokio::test]
async fn category_is_written_before_the_whitepaper_referencing_it() {
    let source = acme_source();
    let target_store = Arc::new(RecordingStore::new());
    let provider = FixedProvider::new(target_store.clone()).source("acme-project", source);
    let config = MigrationConfig::new(
        target(),
        vec![SourceConfig::new("Acme", "acme-project", site("acme"))],
    );

    Orchestrator::new(config, provider).unwrap().run().await;

    assert_eq!(target_store.write_ids(), ["acme--cat1", "acme--wp1"]);
}

#[tokio::test]
async fn legacy_blog_is_normalized_on_the_way_in() {
    let source = Arc::new(RecordingStore::with_documents([json!({
        "_id": "post1",
        "_type": "blog",
        "author": {"name": "Jane"},
        "keywords": ["x", "y"],
        "readTime": 3
    })]));
    let target_store = Arc::new(MemoryStore::new());
    let provider = FixedProvider::new(target_store.clone()).source("legacy", source);
    let config = MigrationConfig::new(
        target(),
        vec![SourceConfig::new("Legacy", "legacy", site("windshield-advisor"))],
    );

    Orchestrator::new(config, provider).unwrap().run().await;

    let blog = target_store.get("windshield-advisor--post1").await.unwrap();
    assert_eq!(blog["author"], json!("Jane"));
    assert_eq!(blog["tags"], json!(["x", "y"]));
    assert!(blog.get("keywords").is_none());
    assert!(blog.get("readTime").is_none());
}

#[tokio::test]
async fn missing_token_fails_before_any_store_is_opened() {
    let source = acme_source();
    let target_store = Arc::new(RecordingStore::new());
    let provider = FixedProvider::new(target_store.clone()).source("acme-project", source.clone());
    let config = MigrationConfig::new(
        ProjectSettings::new("target"),
        vec![SourceConfig::new("Acme", "acme-project", site("acme"))],
    );

    let result = Orchestrator::new(config, &provider);

    assert!(matches!(result, Err(ConfigError::MissingToken)));
    assert_eq!(provider.opened(), 0);
    assert!(source.calls().is_empty());
    assert!(target_store.calls().is_empty());
}

#[tokio::test]
async fn every_id_is_transformed_exactly_once() {
    let source = Arc::new(RecordingStore::with_documents([
        json!({"_id": "drafts.wp1", "_type": "whitepaper", "parentWhitepaper": {"_ref": "wp0"}}),
        json!({"_id": "b1", "_type": "blog", "parentWhitePaper": {"_ref": "drafts.wp1"}}),
    ]));
    let target_store = Arc::new(MemoryStore::new());
    let provider = FixedProvider::new(target_store.clone()).source("p", source);
    let config = MigrationConfig::new(target(), vec![SourceConfig::new("P", "p", site("acme"))]);

    Orchestrator::new(config, provider).unwrap().run().await;

    let ids: Vec<String> = target_store
        .documents()
        .await
        .iter()
        .map(|d| d["_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["acme--b1", "drafts.acme--wp1"]);
    for doc in target_store.documents().await {
        assert!(!doc.to_string().contains("acme--acme--"), "double prefix in {doc}");
    }
    let blog = target_store.get("acme--b1").await.unwrap();
    assert_eq!(blog["referencedWhitepapers"][0]["_ref"], json!("drafts.acme--wp1"));
    let wp = target_store.get("drafts.acme--wp1").await.unwrap();
    assert_eq!(wp["parentWhitepaper"]["_ref"], json!("acme--wp0"));
}

#[tokio::test]
async fn failing_write_with_references_is_retried_exactly_once_without_them() {
    let store = RecordingStore::new().rejecting_references();
    let events = EventBus::default();
    let batch = [json!({
        "_id": "acme--b1", "_type": "blog",
        "categories": [{"_ref": "acme--cat1"}]
    })]
    .into_iter()
    .map(|v| Document::from_value(v).unwrap())
    .collect::<MigrationBatch>();

    let stats = Importer::new(&store, &events).import(&batch).await;

    assert_eq!(
        store.writes(),
        [("acme--b1".to_string(), true), ("acme--b1".to_string(), false)]
    );
    assert_eq!((stats.imported, stats.failed), (1, 0));
    assert!(matches!(
        stats.outcomes[0].status,
        ImportStatus::ImportedWithoutReferences { .. }
    ));
}

#[tokio::test]
async fn document_failing_both_attempts_is_counted_and_skipped() {
    let store = RecordingStore::new().failing_id("acme--b1");
    let events = EventBus::default();
    let mut rx = events.subscribe();
    let batch = [
        json!({"_id": "acme--b1", "_type": "blog", "categories": [{"_ref": "acme--cat1"}]}),
        json!({"_id": "acme--b2", "_type": "blog"}),
    ]
    .into_iter()
    .map(|v| Document::from_value(v).unwrap())
    .collect::<MigrationBatch>();

    let stats = Importer::new(&store, &events).import(&batch).await;

    assert_eq!(store.write_ids(), ["acme--b1", "acme--b1", "acme--b2"]);
    assert_eq!((stats.imported, stats.failed), (1, 1));
    assert!(matches!(stats.outcomes[0].status, ImportStatus::Failed { .. }));
    assert!(store.inner.get("acme--b2").await.is_some());

    let first = rx.recv().await.unwrap();
    assert!(matches!(first, MigrationEvent::DocumentFailed { ref document_id, .. } if document_id == "acme--b1"));
}

#[tokio::test]
async fn failing_type_query_is_skipped_not_fatal() {
    let source = RecordingStore::with_documents([
        json!({"_id": "v1", "_type": "video"}),
        json!({"_id": "p1", "_type": "partner"}),
    ])
    .failing_type(ContentType::Partner);
    let events = EventBus::default();
    let config = SourceConfig::new("Acme", "p", site("acme"));

    let outcome = Exporter::new(&source, &events).export(&config).await;

    assert_eq!(outcome.batch.len(), 1);
    assert_eq!(outcome.batch.of_type(ContentType::Video)[0].id.to_string(), "acme--v1");
    assert_eq!(outcome.skipped_types.len(), 1);
    assert_eq!(outcome.skipped_types[0].0, ContentType::Partner);
    let queried: Vec<Call> = source.calls();
    assert_eq!(
        queried,
        ContentType::IMPORT_ORDER
            .into_iter()
            .map(|t| Call::Fetch(DocumentQuery::OfType(t)))
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn one_failing_source_does_not_stop_the_run() {
    let broken = Arc::new(RecordingStore::new().failing_all_types());
    let target_store = Arc::new(MemoryStore::new());
    let provider = FixedProvider::new(target_store.clone())
        .source("broken", broken)
        .source("acme-project", acme_source());
    let config = MigrationConfig::new(
        target(),
        vec![
            SourceConfig::new("Missing", "nowhere", site("missing")),
            SourceConfig::new("Broken", "broken", site("broken")),
            SourceConfig::new("Acme", "acme-project", site("acme")),
        ],
    );
    let orchestrator = Orchestrator::new(config, provider).unwrap();
    let mut rx = orchestrator.events().subscribe();

    let report = orchestrator.run().await;

    let missing = report.source(&site("missing")).unwrap();
    assert!(missing.error.as_deref().unwrap().contains("no such project"));
    assert_eq!((missing.imported, missing.failed), (0, 0));
    let broken = report.source(&site("broken")).unwrap();
    assert!(broken.error.is_some());
    assert_eq!((broken.imported, broken.failed), (0, 0));
    let acme = report.source(&site("acme")).unwrap();
    assert_eq!((acme.imported, acme.failed), (2, 0));
    assert_eq!(report.total_imported(), 2);
    assert_eq!(target_store.len().await, 2);

    let mut failed_sources = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let MigrationEvent::SourceFailed { source, .. } = event {
            failed_sources.push(source);
        }
    }
    assert_eq!(failed_sources, ["Missing", "Broken"]);
}

#[tokio::test]
async fn source_documents_without_id_count_as_failed() {
    let source = Arc::new(RecordingStore::with_documents([
        json!({"_id": "", "_type": "blog", "title": "orphan"}),
        json!({"_id": "drafts.", "_type": "blog", "title": "draft orphan"}),
        json!({"_id": "b2", "_type": "blog", "author": ["not", "a", "name"]}),
    ]));
    let target_store = Arc::new(MemoryStore::new());
    let provider = FixedProvider::new(target_store.clone()).source("p", source);
    let config = MigrationConfig::new(target(), vec![SourceConfig::new("P", "p", site("acme"))]);

    let report = Orchestrator::new(config, provider).unwrap().run().await;

    let acme = report.source(&site("acme")).unwrap();
    assert_eq!((acme.exported, acme.imported, acme.failed), (1, 1, 2));
    assert_eq!(target_store.len().await, 1);
    let kept = target_store.get("acme--b2").await.unwrap();
    assert_eq!(kept["author"], json!(["not", "a", "name"]));
}

#[tokio::test]
async fn rerun_overwrites_by_id() {
    let target_store = Arc::new(MemoryStore::new());
    for _ in 0..2 {
        let provider = FixedProvider::new(target_store.clone()).source("acme-project", acme_source());
        let config = MigrationConfig::new(
            target(),
            vec![SourceConfig::new("Acme", "acme-project", site("acme"))],
        );
        let report = Orchestrator::new(config, provider).unwrap().run().await;
        assert_eq!(report.total_imported(), 2);
    }
    assert_eq!(target_store.len().await, 2);
}
