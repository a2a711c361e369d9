use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::sync::Mutex as AsyncMutex;

/// One async lock per document id, so re-ingesting the same document twice
/// runs the two passes one after the other instead of interleaving their
/// delete and insert steps.
#[derive(Clone, Default, Debug)]
pub struct DocumentLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl DocumentLocks {
    /// The lock shared by every caller working on `document_id`.
    pub fn handle(&self, document_id: &str) -> Arc<AsyncMutex<()>> {
        let mut table = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        table.entry(document_id.to_string()).or_default().clone()
    }

    /// Drops the table entry once no other caller holds a handle.
    pub fn release(&self, document_id: &str, handle: Arc<AsyncMutex<()>>) {
        let mut table = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        // The table and `handle` account for two references.
        if Arc::strong_count(&handle) <= 2 {
            table.remove(document_id);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
