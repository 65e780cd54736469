//! Backend construction from configuration.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use ackqueue_config::{BackendKind, BackendSection};
use ackqueue_core::{MemoryBackend, QueueBackend, SqliteBackend};

/// Open the configured backing store.
pub(crate) async fn connect(section: &BackendSection) -> anyhow::Result<Arc<dyn QueueBackend>> {
    match section.kind {
        BackendKind::Memory => {
            info!("Using in-memory backend, nothing is persisted");
            Ok(Arc::new(MemoryBackend::new()))
        }
        BackendKind::Sqlite => {
            if let Some(parent) = section.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }

            let backend = SqliteBackend::open_with_pragmas(&section.path, section.option_strings())
                .await
                .with_context(|| format!("opening {}", section.path.display()))?
                .with_poll_interval(section.poll_interval());
            Ok(Arc::new(backend))
        }
    }
}
