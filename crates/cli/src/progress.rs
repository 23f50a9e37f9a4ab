//! Human progress lines on stdout, fed from the migration event bus.
use content_migrate_core::events::types::MigrationEvent;
use content_migrate_core::EventBus;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Print events until every sender of `bus` is dropped.
pub fn spawn_printer(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(line) = render(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "progress printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// One line per event worth showing; per-document successes stay quiet.
fn render(event: &MigrationEvent) -> Option<String> {
    let line = match event {
        MigrationEvent::SourceStarted { source, site, .. } => {
            format!("\n==> {source} ({site})")
        }
        MigrationEvent::TypeExported { doc_type, count, .. } => {
            format!("  found {count} {doc_type} documents")
        }
        MigrationEvent::TypeSkipped { doc_type, reason, .. } => {
            format!("  skipped {doc_type}: {reason}")
        }
        MigrationEvent::DocumentRejected { document_id, reason, .. } => {
            format!("  rejected {document_id}: {reason}")
        }
        MigrationEvent::TypeImported {
            doc_type,
            imported,
            failed,
        } => format!("  imported {imported} {doc_type} documents ({failed} failed)"),
        MigrationEvent::DocumentImported {
            document_id,
            without_references: true,
        } => format!("  {document_id} written without references"),
        MigrationEvent::DocumentImported { .. } => return None,
        MigrationEvent::DocumentFailed { document_id, reason } => {
            format!("  failed {document_id}: {reason}")
        }
        MigrationEvent::SourceFinished {
            source,
            imported,
            failed,
        } => format!("<== {source}: {imported} imported, {failed} failed"),
        MigrationEvent::SourceFailed { source, reason } => {
            format!("<== {source} failed: {reason}")
        }
    };
    Some(line)
}
