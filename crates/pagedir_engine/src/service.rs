/* 📖 # What does the page directory service own?

PageService is the only writer of page positions. It converts payloads into
store records, generates ids and timestamps, and decides when a reorder is
needed: only when an update changes a page's position. A reorder runs under
the partition lock of the page's API: snapshot the siblings, compute the
write plan, apply it inside a StoreTransaction. A failed write rolls the
plan back and surfaces as `ReorderAborted`, naming the API, the page whose
write failed and how many writes had gone through.

Deleting a page leaves its slot empty. `compact` closes such gaps on demand
and `check_partition` reports them.
*/

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, error, info, instrument};

use pagedir_base::{ErrorKind, PagedirError, PagedirResult, ResultExt};

use crate::page::{
    ApiId, FIRST_POSITION, NewPage, Page, PageEntity, PageId, PageListItem, Position, UpdatePage,
};
use crate::partition::{PartitionLocks, PartitionReport};
use crate::reindex::{PositionUpdate, SiblingReindexer};
use crate::store::StoreHandle;

/// CRUD over documentation pages, keeping each API's page order unique and
/// contiguous.
#[derive(Debug)]
pub struct PageService {
    store: StoreHandle,
    reindexer: SiblingReindexer,
    partitions: PartitionLocks,
}

impl PageService {
    /// Create a service over the given store.
    ///
    /// # Examples
    /// ```
    /// use pagedir_engine::{ApiId, NewPage, PageService};
    /// use pagedir_engine::store::{InMemoryStore, StoreHandle};
    ///
    /// let service = PageService::new(StoreHandle::new(InMemoryStore::new()));
    /// let api = ApiId::from_string("petstore");
    /// let page = service
    ///     .create(&api, NewPage { name: "Overview".to_string(), ..NewPage::default() })
    ///     .unwrap();
    /// assert_eq!(page.order, 1);
    /// ```
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            reindexer: SiblingReindexer::new(FIRST_POSITION),
            partitions: PartitionLocks::new(),
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// List the pages of an API in display order.
    pub fn find_by_api(&self, api: &ApiId) -> PagedirResult<Vec<PageListItem>> {
        debug!(api_id = %api, "Find pages by API");
        let mut pages = self
            .store
            .find_by_api(api)
            .map_err(|e| log_failure(e, "Failed to get API pages"))
            .with_context(|| format!("An error occurs while trying to get pages of API [{}]", api))?;
        pages.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(pages.iter().map(Page::to_list_item).collect())
    }

    /// Fetch one page.
    pub fn find_by_id(&self, page_id: &PageId) -> PagedirResult<PageEntity> {
        debug!(page_id = %page_id, "Find page by ID");
        Ok(self.load(page_id)?.to_entity())
    }

    /// Create a page under `api`.
    ///
    /// Without an explicit order the page is appended after the last sibling.
    /// An explicit order must lie in `FIRST_POSITION..=max + 1`: one already
    /// held by a sibling is rejected with `PositionConflict`, one outside that
    /// range with `PositionOutOfRange`.
    #[instrument(level = "debug", skip(self, api, new_page), fields(api_id = %api))]
    pub fn create(&self, api: &ApiId, new_page: NewPage) -> PagedirResult<PageEntity> {
        debug!(name = %new_page.name, "Create page");

        let id = PageId::generate();
        if self.store.find_by_id(&id)?.is_some() {
            return Err(PagedirError::boxed(ErrorKind::PageAlreadyExists {
                page_id: id.to_string(),
            }));
        }

        let _partition = self.partitions.acquire(api);
        let order = match new_page.order {
            Some(order) => {
                let siblings = self.store.find_by_api(api)?;
                if siblings.iter().any(|page| page.order == order) {
                    return Err(PagedirError::boxed(ErrorKind::PositionConflict {
                        api_id: api.to_string(),
                        position: order,
                    }));
                }
                let last = self.next_position(api)?;
                if !(FIRST_POSITION..=last).contains(&order) {
                    return Err(PagedirError::boxed(ErrorKind::PositionOutOfRange {
                        api_id: api.to_string(),
                        position: order,
                        first: FIRST_POSITION,
                        last,
                    }));
                }
                order
            }
            None => self.next_position(api)?,
        };

        let page = Page::create(id, api.clone(), new_page, order, Utc::now());
        let created = self
            .store
            .create(page)
            .map_err(|e| log_failure(e, "Failed to create page"))
            .with_context(|| format!("An error occurs while trying to create a page for API [{}]", api))?;
        Ok(created.to_entity())
    }

    /// Update a page. A changed order moves the page among its siblings.
    #[instrument(level = "debug", skip(self, page_id, update), fields(page_id = %page_id))]
    pub fn update(&self, page_id: &PageId, update: UpdatePage) -> PagedirResult<PageEntity> {
        debug!("Update page");

        let api = self.load(page_id)?.api;
        let _partition = self.partitions.acquire(&api);
        let existing = self.load(page_id)?;
        let page = existing.updated_with(update, Utc::now());

        let saved = if page.order != existing.order {
            self.reorder_and_save(page)
        } else {
            self.store.update(page)
        };

        let saved = saved
            .map_err(|e| log_failure(e, "Failed to update page"))
            .with_context(|| format!("An error occurs while trying to update page [{}]", page_id))?;
        Ok(saved.to_entity())
    }

    /// Delete a page. Survivors keep their positions.
    pub fn delete(&self, page_id: &PageId) -> PagedirResult<()> {
        debug!(page_id = %page_id, "Delete page");

        let page = self.load(page_id)?;
        let _partition = self.partitions.acquire(&page.api);
        match self.store.delete(page_id) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(not_found(page_id)),
            Err(e) => Err(log_failure(e, "Failed to delete page"))
                .with_context(|| format!("An error occurs while trying to delete page [{}]", page_id)),
        }
    }

    /// Highest order used by the pages of `api`, `FIRST_POSITION - 1` if it has none.
    pub fn find_max_page_order_by_api(&self, api: &ApiId) -> PagedirResult<Position> {
        debug!(api_id = %api, "Find max page order");
        let max = self
            .store
            .find_max_order_by_api(api)
            .map_err(|e| log_failure(e, "Failed to find max page order"))
            .with_context(|| format!("An error occurs while searching max page order of API [{}]", api))?;
        Ok(max.unwrap_or(FIRST_POSITION - 1))
    }

    /// Renumber the pages of `api` densely from `FIRST_POSITION`, keeping
    /// their relative order. Returns the number of pages moved.
    #[instrument(level = "debug", skip(self, api), fields(api_id = %api))]
    pub fn compact(&self, api: &ApiId) -> PagedirResult<usize> {
        let _partition = self.partitions.acquire(api);
        let mut siblings = self
            .store
            .find_by_api(api)
            .map_err(|e| log_failure(e, "Failed to get API pages"))
            .with_context(|| format!("An error occurs while trying to compact API [{}]", api))?;
        siblings.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

        let records: Vec<Page> = siblings
            .iter()
            .zip(FIRST_POSITION..)
            .filter(|(page, position)| page.order != *position)
            .map(|(page, position)| page.with_order(position))
            .collect();

        let moved = records.len();
        self.apply_in_transaction(api, records)
            .with_context(|| format!("An error occurs while trying to compact API [{}]", api))?;
        if moved > 0 {
            info!(moved, "Compacted page positions");
        }
        Ok(moved)
    }

    /// Check the pages of `api` against the uniqueness and contiguity invariants.
    pub fn check_partition(&self, api: &ApiId) -> PagedirResult<PartitionReport> {
        let pages = self
            .store
            .find_by_api(api)
            .map_err(|e| log_failure(e, "Failed to get API pages"))
            .with_context(|| format!("An error occurs while trying to check API [{}]", api))?;
        Ok(PartitionReport::from_pages(api.clone(), &pages, FIRST_POSITION))
    }

    fn load(&self, page_id: &PageId) -> PagedirResult<Page> {
        match self.store.find_by_id(page_id) {
            Ok(Some(page)) => Ok(page),
            Ok(None) => Err(not_found(page_id)),
            Err(e) => Err(log_failure(e, "Failed to find page"))
                .with_context(|| format!("An error occurs while trying to find page [{}]", page_id)),
        }
    }

    fn next_position(&self, api: &ApiId) -> PagedirResult<Position> {
        match self.store.find_max_order_by_api(api)? {
            None => Ok(FIRST_POSITION),
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| pagedir_base::err!("API [{}] has no position left after {}", api, max)),
        }
    }

    /// Move `page` to `page.order` among its siblings and store its payload.
    /// The caller holds the partition lock.
    fn reorder_and_save(&self, page: Page) -> PagedirResult<Page> {
        let siblings = self.store.find_by_api(&page.api)?;
        let plan = self.reindexer.reindex(&siblings, &page.id, page.order)?;
        if plan.is_empty() {
            return self.store.update(page);
        }

        debug!(writes = plan.len(), order = page.order, "Reordering pages");
        let by_id: HashMap<&PageId, &Page> = siblings.iter().map(|p| (&p.id, p)).collect();
        let records: Vec<Page> = plan
            .iter()
            .filter_map(|PositionUpdate { page_id, new_position, .. }| {
                if page_id == &page.id {
                    Some(page.clone())
                } else {
                    by_id.get(page_id).map(|sibling| sibling.with_order(*new_position))
                }
            })
            .collect();

        let saved = self.apply_in_transaction(&page.api, records)?;
        info!(api_id = %page.api, page_id = %page.id, order = page.order, writes = saved.len(), "Reordered pages");
        saved
            .into_iter()
            .find(|saved| saved.id == page.id)
            .ok_or_else(|| pagedir_base::err!("Reorder plan did not contain page [{}]", page.id))
    }

    /// Write `records` in order, all or nothing.
    fn apply_in_transaction(&self, api: &ApiId, records: Vec<Page>) -> PagedirResult<Vec<Page>> {
        let planned = records.len();
        let mut tx = self.store.transaction();
        let mut saved = Vec::with_capacity(planned);
        for record in records {
            let page_id = record.id.clone();
            match tx.update(record) {
                Ok(page) => saved.push(page),
                Err(e) => {
                    let applied = tx.applied();
                    error!(
                        api_id = %api,
                        page_id = %page_id,
                        applied,
                        planned,
                        error = %e,
                        "Position write failed, rolling back"
                    );
                    return Err(Box::new(
                        PagedirError::new(ErrorKind::ReorderAborted {
                            api_id: api.to_string(),
                            page_id: page_id.to_string(),
                            applied,
                            planned,
                        })
                        .caused_by(e),
                    ));
                }
            }
        }
        tx.commit();
        Ok(saved)
    }
}

fn not_found(page_id: &PageId) -> Box<PagedirError> {
    PagedirError::boxed(ErrorKind::PageNotFound {
        page_id: page_id.to_string(),
    })
}

/// Log a collaborator failure on its way up and hand it back.
fn log_failure(e: Box<PagedirError>, message: &str) -> Box<PagedirError> {
    error!(error = %e, "{}", message);
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageType;
    use crate::store::InMemoryStore;

    fn create_test_service() -> PageService {
        PageService::new(StoreHandle::new(InMemoryStore::new()))
    }

    fn api() -> ApiId {
        ApiId::from_string("petstore")
    }

    fn new_page(name: &str) -> NewPage {
        NewPage {
            name: name.to_string(),
            page_type: Some(PageType::Markdown),
            content: Some(format!("# {}", name)),
            ..NewPage::default()
        }
    }

    /// Create pages A, B, C, ... and return their ids in creation order.
    fn seed(service: &PageService, names: &[&str]) -> Vec<PageId> {
        names
            .iter()
            .map(|name| service.create(&api(), new_page(name)).unwrap().id)
            .collect()
    }

    fn listing(service: &PageService) -> String {
        service
            .find_by_api(&api())
            .unwrap()
            .iter()
            .map(|item| format!("{}:{}", item.order, item.name))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn move_to(service: &PageService, id: &PageId, order: Position) -> PagedirResult<PageEntity> {
        let current = service.store().find_by_id(id).unwrap().unwrap();
        service.update(id, UpdatePage::from_page(&current).with_order(order))
    }

    #[test]
    fn test_create_appends_pages() {
        let service = create_test_service();
        seed(&service, &["A", "B", "C"]);

        assert_eq!(listing(&service), "1:A 2:B 3:C");
        assert_eq!(service.find_max_page_order_by_api(&api()).unwrap(), 3);
    }

    #[test]
    fn test_max_order_of_empty_api() {
        let service = create_test_service();
        assert_eq!(
            service.find_max_page_order_by_api(&api()).unwrap(),
            FIRST_POSITION - 1
        );
    }

    #[test]
    fn test_create_with_explicit_free_order() {
        let service = create_test_service();
        let page = service
            .create(
                &api(),
                NewPage {
                    order: Some(1),
                    ..new_page("A")
                },
            )
            .unwrap();
        assert_eq!(page.order, 1);
        assert_eq!(page.content_type.as_deref(), Some("text/yaml"));
    }

    #[test]
    fn test_create_with_taken_order_conflicts() {
        let service = create_test_service();
        seed(&service, &["A", "B"]);

        let error = service
            .create(
                &api(),
                NewPage {
                    order: Some(2),
                    ..new_page("C")
                },
            )
            .unwrap_err();

        assert!(matches!(
            error.kind(),
            ErrorKind::PositionConflict { position: 2, .. }
        ));
        assert_eq!(listing(&service), "1:A 2:B");
    }

    #[test]
    fn test_create_below_first_position_is_rejected() {
        let service = create_test_service();
        seed(&service, &["A"]);

        let error = service
            .create(
                &api(),
                NewPage {
                    order: Some(0),
                    ..new_page("Z")
                },
            )
            .unwrap_err();

        assert!(matches!(
            error.kind(),
            ErrorKind::PositionOutOfRange {
                position: 0,
                first: 1,
                last: 2,
                ..
            }
        ));
        assert_eq!(listing(&service), "1:A");
    }

    #[test]
    fn test_create_past_append_slot_is_rejected() {
        let service = create_test_service();
        seed(&service, &["A"]);

        let error = service
            .create(
                &api(),
                NewPage {
                    order: Some(3),
                    ..new_page("N")
                },
            )
            .unwrap_err();

        assert!(matches!(
            error.kind(),
            ErrorKind::PositionOutOfRange { position: 3, .. }
        ));
        assert_eq!(
            error.to_string(),
            "Position 3 is outside 1..=2 in API [petstore]"
        );
        assert!(service.check_partition(&api()).unwrap().is_consistent());
    }

    #[test]
    fn test_create_at_append_slot_is_accepted() {
        let service = create_test_service();
        seed(&service, &["A"]);

        service
            .create(
                &api(),
                NewPage {
                    order: Some(2),
                    ..new_page("B")
                },
            )
            .unwrap();

        assert_eq!(listing(&service), "1:A 2:B");
    }

    #[test]
    fn test_append_after_highest_position_fails_without_overflow() {
        let service = create_test_service();
        service
            .store()
            .create(Page::create(
                PageId::from_string("last"),
                api(),
                new_page("Z"),
                Position::MAX,
                Utc::now(),
            ))
            .unwrap();

        let error = service.create(&api(), new_page("A")).unwrap_err();

        assert!(error.to_string().contains("has no position left"));
        assert_eq!(service.store().len().unwrap(), 1);
    }

    #[test]
    fn test_find_by_id_missing_page() {
        let service = create_test_service();
        let error = service.find_by_id(&PageId::from_string("ghost")).unwrap_err();
        assert!(error.is_not_found());
    }

    #[test]
    fn test_update_without_order_change() {
        let service = create_test_service();
        let ids = seed(&service, &["A", "B"]);
        let created = service.find_by_id(&ids[0]).unwrap();

        let updated = service
            .update(
                &ids[0],
                UpdatePage {
                    name: "Intro".to_string(),
                    content: Some("{\"openapi\": \"3.0.0\"}".to_string()),
                    last_contributor: Some("alice".to_string()),
                    order: 1,
                    published: true,
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Intro");
        assert_eq!(updated.content_type.as_deref(), Some("application/json"));
        assert_eq!(updated.page_type, Some(PageType::Markdown));
        assert!(updated.last_modification_date >= created.last_modification_date);
        assert_eq!(listing(&service), "1:Intro 2:B");
    }

    #[test]
    fn test_update_moves_page_and_keeps_payload() {
        let service = create_test_service();
        let ids = seed(&service, &["A", "B", "C", "D"]);

        let current = service.store().find_by_id(&ids[3]).unwrap().unwrap();
        let moved = service
            .update(
                &ids[3],
                UpdatePage {
                    name: "Changelog".to_string(),
                    ..UpdatePage::from_page(&current).with_order(2)
                },
            )
            .unwrap();

        assert_eq!(moved.order, 2);
        assert_eq!(moved.name, "Changelog");
        assert_eq!(listing(&service), "1:A 2:Changelog 3:B 4:C");
        assert!(service.check_partition(&api()).unwrap().is_consistent());
    }

    #[test]
    fn test_move_first_to_last() {
        let service = create_test_service();
        let ids = seed(&service, &["A", "B", "C"]);

        move_to(&service, &ids[0], 3).unwrap();

        assert_eq!(listing(&service), "1:B 2:C 3:A");
    }

    #[test]
    fn test_move_out_of_range_is_rejected_without_writes() {
        let service = create_test_service();
        let ids = seed(&service, &["A", "B", "C"]);

        let error = move_to(&service, &ids[0], 7).unwrap_err();

        assert!(matches!(
            error.kind(),
            ErrorKind::InvalidReorderRequest { .. }
        ));
        assert_eq!(listing(&service), "1:A 2:B 3:C");
    }

    #[test]
    fn test_reorders_are_isolated_per_api() {
        let service = create_test_service();
        let ids = seed(&service, &["A", "B", "C"]);
        let other = ApiId::from_string("billing");
        service.create(&other, new_page("Invoices")).unwrap();
        service.create(&other, new_page("Refunds")).unwrap();

        move_to(&service, &ids[2], 1).unwrap();

        assert_eq!(listing(&service), "1:C 2:A 3:B");
        let billing: Vec<(Position, String)> = service
            .find_by_api(&other)
            .unwrap()
            .into_iter()
            .map(|item| (item.order, item.name))
            .collect();
        assert_eq!(
            billing,
            vec![(1, "Invoices".to_string()), (2, "Refunds".to_string())]
        );
    }

    #[test]
    fn test_delete_leaves_gap_and_compact_closes_it() {
        let service = create_test_service();
        let ids = seed(&service, &["A", "B", "C", "D"]);

        service.delete(&ids[1]).unwrap();
        assert_eq!(listing(&service), "1:A 3:C 4:D");

        let report = service.check_partition(&api()).unwrap();
        assert_eq!(report.gaps, vec![2]);

        assert_eq!(service.compact(&api()).unwrap(), 2);
        assert_eq!(listing(&service), "1:A 2:C 3:D");
        assert_eq!(service.compact(&api()).unwrap(), 0);
    }

    #[test]
    fn test_delete_missing_page() {
        let service = create_test_service();
        let error = service.delete(&PageId::from_string("ghost")).unwrap_err();
        assert!(error.is_not_found());
    }

    #[test]
    fn test_list_of_unknown_api_is_empty() {
        let service = create_test_service();
        assert!(
            service
                .find_by_api(&ApiId::from_string("nothing"))
                .unwrap()
                .is_empty()
        );
    }
}
