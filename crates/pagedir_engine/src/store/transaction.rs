/* 📖 # How are multi-page writes made all-or-nothing?

A reorder rewrites several pages, one store write each. StoreTransaction
keeps an undo log of the version each write replaced. `commit()` forgets the
log. Dropping the transaction without committing, whether through `?`, an
early return or a panic, writes the logged versions back, newest first.

A failed rollback write is logged at error level with the page id and
the remaining entries are still attempted; the operator gets the ids needed
to reconcile by hand.
*/

use tracing::{debug, error, warn};

use pagedir_base::PagedirResult;

use crate::page::Page;
use crate::store::traits::StoreHandle;

/// Scoped group of page updates that is rolled back on drop unless committed.
pub struct StoreTransaction {
    store: StoreHandle,
    undo: Vec<Page>,
    committed: bool,
}

impl StoreTransaction {
    pub(crate) fn new(store: StoreHandle) -> Self {
        Self {
            store,
            undo: Vec::new(),
            committed: false,
        }
    }

    /// Update a page, remembering its previous version for rollback.
    pub fn update(&mut self, page: Page) -> PagedirResult<Page> {
        let (previous, updated) = self.store.replace(page)?;
        if let Some(previous) = previous {
            self.undo.push(previous);
        }
        Ok(updated)
    }

    /// Number of writes applied so far.
    pub fn applied(&self) -> usize {
        self.undo.len()
    }

    /// Keep every write made through this transaction.
    pub fn commit(mut self) {
        debug!(writes = self.undo.len(), "Committing page transaction");
        self.undo.clear();
        self.committed = true;
    }

    /// Undo every write made through this transaction.
    pub fn rollback(mut self) {
        self.undo_all();
    }

    fn undo_all(&mut self) {
        if self.undo.is_empty() {
            return;
        }
        warn!(writes = self.undo.len(), "Rolling back page transaction");
        while let Some(previous) = self.undo.pop() {
            let page_id = previous.id.clone();
            let api_id = previous.api.clone();
            if let Err(e) = self.store.update(previous) {
                error!(
                    page_id = %page_id,
                    api_id = %api_id,
                    error = %e,
                    "Rollback write failed; page must be reconciled manually"
                );
            }
        }
    }
}

impl Drop for StoreTransaction {
    fn drop(&mut self) {
        if !self.committed {
            self.undo_all();
        }
    }
}

impl std::fmt::Debug for StoreTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreTransaction")
            .field("applied", &self.undo.len())
            .field("committed", &self.committed)
            .finish()
    }
}
