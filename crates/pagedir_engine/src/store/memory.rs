use std::collections::HashMap;

use pagedir_base::{ErrorKind, PagedirError, PagedirResult};

use crate::page::{ApiId, Page, PageId, Position};
use crate::store::traits::PageStore;

/// An in-memory page store backed by a HashMap.
///
/// Pages are cloned on the way in and out, so the store owns its own copies.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use pagedir_engine::{ApiId, NewPage, Page, PageId};
/// use pagedir_engine::store::{InMemoryStore, PageStore};
///
/// let mut store = InMemoryStore::new();
/// let page = Page::create(
///     PageId::from_string("intro"),
///     ApiId::from_string("petstore"),
///     NewPage { name: "Intro".to_string(), ..NewPage::default() },
///     1,
///     Utc::now(),
/// );
///
/// store.create(page).unwrap();
///
/// assert_eq!(store.find_max_order_by_api(&ApiId::from_string("petstore")).unwrap(), Some(1));
/// assert_eq!(store.len().unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    pages: HashMap<PageId, Page>,
}

impl InMemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }

    /// Create a new store with a specific capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pages: HashMap::with_capacity(capacity),
        }
    }
}

impl PageStore for InMemoryStore {
    fn find_by_id(&self, id: &PageId) -> PagedirResult<Option<Page>> {
        Ok(self.pages.get(id).cloned())
    }

    fn find_by_api(&self, api: &ApiId) -> PagedirResult<Vec<Page>> {
        let mut pages: Vec<Page> = self
            .pages
            .values()
            .filter(|page| &page.api == api)
            .cloned()
            .collect();
        pages.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(pages)
    }

    fn create(&mut self, page: Page) -> PagedirResult<Page> {
        if self.pages.contains_key(&page.id) {
            return Err(PagedirError::boxed(ErrorKind::PageAlreadyExists {
                page_id: page.id.to_string(),
            }));
        }
        self.pages.insert(page.id.clone(), page.clone());
        Ok(page)
    }

    fn update(&mut self, page: Page) -> PagedirResult<Page> {
        match self.pages.get_mut(&page.id) {
            Some(stored) => {
                *stored = page.clone();
                Ok(page)
            }
            None => Err(PagedirError::boxed(ErrorKind::PageNotFound {
                page_id: page.id.to_string(),
            })),
        }
    }

    fn delete(&mut self, id: &PageId) -> PagedirResult<Option<Page>> {
        Ok(self.pages.remove(id))
    }

    fn find_max_order_by_api(&self, api: &ApiId) -> PagedirResult<Option<Position>> {
        Ok(self
            .pages
            .values()
            .filter(|page| &page.api == api)
            .map(|page| page.order)
            .max())
    }

    fn len(&self) -> PagedirResult<usize> {
        Ok(self.pages.len())
    }

    fn is_empty(&self) -> PagedirResult<bool> {
        Ok(self.pages.is_empty())
    }
}
