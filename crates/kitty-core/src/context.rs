//! Application context shared by the event feed and the status server
//!
//! Built once at startup and passed around as `Arc<AppContext>`. The pipeline
//! (and with it the ledger) sits behind an async mutex, so events are handled
//! strictly one at a time. The connectivity flag and a summary snapshot live
//! outside that mutex and can be read while an event is being persisted.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::models::{InboundEvent, Summary};
use crate::pipeline::{Pipeline, ProcessedMessage};

pub struct AppContext {
    connected: AtomicBool,
    pipeline: Mutex<Pipeline>,
    summary: RwLock<Option<Summary>>,
    store_path: PathBuf,
}

impl AppContext {
    pub fn new(pipeline: Pipeline) -> Self {
        let summary = pipeline.ledger().summary();
        let store_path = pipeline.ledger().db().path().to_path_buf();
        Self {
            connected: AtomicBool::new(false),
            pipeline: Mutex::new(pipeline),
            summary: RwLock::new(summary),
            store_path,
        }
    }

    /// Open the pipeline described by `config`
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(Pipeline::open(config)?))
    }

    /// Run one event through the pipeline and refresh the summary snapshot
    pub async fn handle_event(&self, event: &InboundEvent) -> Option<ProcessedMessage> {
        let mut pipeline = self.pipeline.lock().await;
        let processed = pipeline.on_message(event).await;
        if processed.is_some() {
            let summary = pipeline.ledger().summary();
            // A poisoned snapshot is overwritten wholesale, nothing to recover
            match self.summary.write() {
                Ok(mut guard) => *guard = summary,
                Err(poisoned) => *poisoned.into_inner() = summary,
            }
        }
        processed
    }

    pub fn set_connected(&self, connected: bool) {
        let was = self.connected.swap(connected, Ordering::SeqCst);
        if was != connected {
            info!(connected, "Transport connectivity changed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Latest summary snapshot, `None` before any spending is recorded
    pub fn summary(&self) -> Option<Summary> {
        match self.summary.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Path of the workbook file
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Exclusive access to the pipeline, waiting for any in-flight event
    pub async fn pipeline(&self) -> MutexGuard<'_, Pipeline> {
        self.pipeline.lock().await
    }
}
