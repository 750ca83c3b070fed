//! Shared handle over a single document

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::document::Document;

/// Cloneable handle to one live document.
///
/// Guards must be dropped before any `.await`; callers take the lock for a
/// single synchronous step and release it.
#[derive(Debug, Clone, Default)]
pub struct SharedDocument {
    inner: Arc<RwLock<Document>>,
}

impl SharedDocument {
    pub fn new(doc: Document) -> Self {
        Self {
            inner: Arc::new(RwLock::new(doc)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Document> {
        self.inner.write()
    }

    pub fn with<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> Document {
        self.inner.read().clone()
    }
}

impl From<Document> for SharedDocument {
    fn from(doc: Document) -> Self {
        Self::new(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let shared = SharedDocument::new(Document::new());
        let body = shared.with_mut(|doc| doc.create_element(doc.root(), "body")).unwrap();
        let handle = {
            let shared = shared.clone();
            tokio::spawn(async move { shared.with_mut(|doc| doc.set_attribute(body, "id", "main")) })
        };
        handle.await.unwrap().unwrap();
        assert_eq!(shared.read().element_by_id("main"), Some(body));
    }
}
