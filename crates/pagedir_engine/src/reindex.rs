/* 📖 # How does sibling reindexing work?

Moving a page from slot `o` to slot `t` in a dense ordering is a rotation of
the range between the two slots. Every page strictly between them shifts one
slot against the direction of the move, the moved page lands on `t`, and
everything outside the range keeps its position.

The walk visits siblings in position order and carries one flag, `passed`,
which flips when the moved page is visited. Before that point a page at or
above `t` is being pushed up to open the target slot. After it, a page at or
below `t` is being pulled down to close the slot the moved page left.

Positions are computed from the snapshot only, never from earlier entries of
the plan, so the plan can be written in any order. The service still writes
it in walk order.
*/

use std::cmp::Ordering;

use pagedir_base::{ErrorKind, PagedirError, PagedirResult};

use crate::page::{FIRST_POSITION, Page, PageId, Position};

/// One entry of a write plan: a sibling and the position it must be stored at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub page_id: PageId,
    pub old_position: Position,
    pub new_position: Position,
}

/// Computes write plans that keep a partition's positions unique and contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiblingReindexer {
    base: Position,
}

impl Default for SiblingReindexer {
    fn default() -> Self {
        Self::new(FIRST_POSITION)
    }
}

impl SiblingReindexer {
    /// Create a reindexer for partitions whose first slot is `base`.
    pub fn new(base: Position) -> Self {
        Self { base }
    }

    /// Compute the write plan moving `moved` to `requested` among `siblings`.
    ///
    /// `siblings` must be the complete partition, in any order. Only pages whose
    /// position changes appear in the plan, in ascending order of their
    /// original position. Moving a page onto its current slot yields an empty
    /// plan.
    ///
    /// # Errors
    /// `InvalidReorderRequest` if `moved` is not in `siblings`, if `requested`
    /// lies outside `[base, base + n - 1]`, or if the snapshot holds duplicate
    /// positions that cannot be shifted.
    pub fn reindex(
        &self,
        siblings: &[Page],
        moved: &PageId,
        requested: Position,
    ) -> PagedirResult<Vec<PositionUpdate>> {
        let mut sorted: Vec<&Page> = siblings.iter().collect();
        sorted.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

        if !sorted.iter().any(|page| &page.id == moved) {
            return Err(invalid_request(
                moved,
                "page is not part of the sibling set".to_string(),
            ));
        }

        let last = self.base + (sorted.len() as Position - 1);
        if requested < self.base || requested > last {
            return Err(invalid_request(
                moved,
                format!(
                    "position {} outside [{}, {}]",
                    requested, self.base, last
                ),
            ));
        }

        let mut passed = false;
        let mut plan = Vec::new();
        for page in sorted {
            let current = page.order;
            let new_position = if &page.id == moved {
                passed = true;
                requested
            } else {
                let shifted = match current.cmp(&requested) {
                    Ordering::Less if passed => current.checked_sub(1),
                    Ordering::Less => Some(current),
                    Ordering::Greater if passed => Some(current),
                    Ordering::Greater => current.checked_add(1),
                    Ordering::Equal if passed => current.checked_sub(1),
                    Ordering::Equal => current.checked_add(1),
                };
                shifted.ok_or_else(|| {
                    invalid_request(
                        moved,
                        format!(
                            "sibling [{}] at position {} can not be shifted",
                            page.id, current
                        ),
                    )
                })?
            };

            if new_position != current {
                plan.push(PositionUpdate {
                    page_id: page.id.clone(),
                    old_position: current,
                    new_position,
                });
            }
        }

        Ok(plan)
    }
}

/// Project a plan over a snapshot, returning the siblings with their new positions.
pub fn apply_plan(siblings: &[Page], plan: &[PositionUpdate]) -> Vec<Page> {
    siblings
        .iter()
        .map(|page| {
            match plan.iter().find(|update| update.page_id == page.id) {
                Some(update) => page.with_order(update.new_position),
                None => page.clone(),
            }
        })
        .collect()
}

fn invalid_request(page_id: &PageId, reason: String) -> Box<PagedirError> {
    PagedirError::boxed(ErrorKind::InvalidReorderRequest {
        page_id: page_id.to_string(),
        reason,
    })
}
