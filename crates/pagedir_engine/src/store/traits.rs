/* 📖 # Why a PageStore trait?

The directory service only needs a narrow set of persistence capabilities:
point lookups, the sibling set of one API, single-page writes and the
max-order query. Any backend offering those can hold pages; the in-memory
store is the one shipped here and the one tests build on.
*/

use std::sync::Arc;

use parking_lot::RwLock;

use pagedir_base::PagedirResult;

use crate::page::{ApiId, Page, PageId, Position};
use crate::store::transaction::StoreTransaction;

/// Trait for page storage implementations.
///
/// Every write is atomic on its own. Nothing here groups writes together;
/// see [`StoreTransaction`] for that.
pub trait PageStore: Send + Sync + 'static {
    /// Look up a page by id.
    ///
    /// # Returns
    /// * `Ok(Some(page))` - If the page exists
    /// * `Ok(None)` - If no page with that id exists
    fn find_by_id(&self, id: &PageId) -> PagedirResult<Option<Page>>;

    /// All pages of one API, as a complete and consistent snapshot.
    ///
    /// Order is not guaranteed.
    fn find_by_api(&self, api: &ApiId) -> PagedirResult<Vec<Page>>;

    /// Persist a new page.
    ///
    /// Fails with `PageAlreadyExists` if the id is taken.
    fn create(&mut self, page: Page) -> PagedirResult<Page>;

    /// Replace a stored page.
    ///
    /// Fails with `PageNotFound` if no page with that id exists.
    fn update(&mut self, page: Page) -> PagedirResult<Page>;

    /// Remove a page by id, returning it if it existed.
    fn delete(&mut self, id: &PageId) -> PagedirResult<Option<Page>>;

    /// Highest position used by the pages of `api`, `None` if it has no pages.
    fn find_max_order_by_api(&self, api: &ApiId) -> PagedirResult<Option<Position>>;

    /// Number of stored pages across all APIs.
    fn len(&self) -> PagedirResult<usize>;

    /// Returns true if the store holds no pages.
    fn is_empty(&self) -> PagedirResult<bool>;
}

/// A thread-safe handle to a page store.
///
/// Cloning is cheap (Arc); every call takes the lock for its own duration only.
#[derive(Clone)]
pub struct StoreHandle(Arc<RwLock<dyn PageStore>>);

impl StoreHandle {
    /// Create a new StoreHandle wrapping the given store implementation.
    pub fn new<S: PageStore>(store: S) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    /// See [`PageStore::find_by_id`].
    pub fn find_by_id(&self, id: &PageId) -> PagedirResult<Option<Page>> {
        self.0.read().find_by_id(id)
    }

    /// See [`PageStore::find_by_api`].
    pub fn find_by_api(&self, api: &ApiId) -> PagedirResult<Vec<Page>> {
        self.0.read().find_by_api(api)
    }

    /// See [`PageStore::create`].
    pub fn create(&self, page: Page) -> PagedirResult<Page> {
        self.0.write().create(page)
    }

    /// See [`PageStore::update`].
    pub fn update(&self, page: Page) -> PagedirResult<Page> {
        self.0.write().update(page)
    }

    /// See [`PageStore::delete`].
    pub fn delete(&self, id: &PageId) -> PagedirResult<Option<Page>> {
        self.0.write().delete(id)
    }

    /// See [`PageStore::find_max_order_by_api`].
    pub fn find_max_order_by_api(&self, api: &ApiId) -> PagedirResult<Option<Position>> {
        self.0.read().find_max_order_by_api(api)
    }

    /// See [`PageStore::len`].
    pub fn len(&self) -> PagedirResult<usize> {
        self.0.read().len()
    }

    /// See [`PageStore::is_empty`].
    pub fn is_empty(&self) -> PagedirResult<bool> {
        self.0.read().is_empty()
    }

    /// Open a write scope whose updates are undone unless it is committed.
    pub fn transaction(&self) -> StoreTransaction {
        StoreTransaction::new(self.clone())
    }

    /// Update a page and return the version it replaced, under one write lock.
    pub(crate) fn replace(&self, page: Page) -> PagedirResult<(Option<Page>, Page)> {
        let mut store = self.0.write();
        let previous = store.find_by_id(&page.id)?;
        let updated = store.update(page)?;
        Ok((previous, updated))
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}
