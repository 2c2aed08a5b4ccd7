//! Per-view gallery state.
//!
//! One `GalleryStore` is built per gallery view and shared by the controllers through
//! `SharedStore`. Every mutation happens inside a single `borrow_mut` with no await in
//! between, so the collection, the grid and the lightbox never diverge half-way.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::models::{GalleryFilters, MediaCollection, MediaItem};
use crate::ui::{GridSurface, Lightbox, NoticeKind, Notices};

pub type SharedStore = Rc<RefCell<GalleryStore>>;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

#[derive(Debug)]
pub struct GalleryStore {
    pub collection: MediaCollection,
    pub grid: GridSurface,
    pub lightbox: Lightbox,
    pub notices: Notices,
    pub filters: GalleryFilters,
    login_required: bool,
    torn_down: bool,
}

impl GalleryStore {
    pub fn new(filters: GalleryFilters, grid: GridSurface, notice_ttl: Duration) -> Self {
        Self {
            collection: MediaCollection::new(),
            grid,
            lightbox: Lightbox::new(),
            notices: Notices::new(notice_ttl),
            filters,
            login_required: false,
            torn_down: false,
        }
    }

    pub fn shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }

    /// Seed with server-rendered items before the first page request.
    pub fn seed(&mut self, items: Vec<MediaItem>) -> usize {
        self.apply_page(items)
    }

    /// Dedup, append and materialize one page. Returns how many items were accepted.
    ///
    /// In the deleted view a page is ordered by retention (stable, unknown last) so
    /// group headings come out contiguous.
    pub fn apply_page(&mut self, mut items: Vec<MediaItem>) -> usize {
        if self.filters.show_deleted {
            items.sort_by_key(MediaItem::retention_days);
        }
        let start = self.collection.len();
        let accepted = self.collection.append(items);
        self.grid.materialize(&accepted, start);
        accepted.len()
    }

    /// Soft-delete flag of a selected id; ids not paginated in yet take the view's scope.
    pub fn is_deleted(&self, id: i64) -> bool {
        self.collection
            .find_by_id(id)
            .map(|item| item.deleted)
            .unwrap_or(self.filters.show_deleted)
    }

    /// Drop an item from collection and grid, keeping the lightbox on a valid index.
    pub fn remove_item(&mut self, id: i64) -> Option<MediaItem> {
        let removed = self.remove_items(&[id]).pop();
        if removed.is_none() {
            debug!(id, "Remove of unknown item");
        }
        removed
    }

    /// Batch removal: one pass over the collection, one relayout, one lightbox sync.
    /// Returns the removed items in collection order.
    pub fn remove_items(&mut self, ids: &[i64]) -> Vec<MediaItem> {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        let removed = self.collection.remove_ids(&wanted);
        self.grid.remove_tiles(ids);
        if let Some(tile) = self.lightbox.sync_with(&self.collection) {
            self.grid.focus_tile(tile);
        }
        removed
    }

    pub fn favorite_count(&self) -> usize {
        self.collection.favorite_count()
    }

    /// Surface a failed remote call as a transient notice.
    pub fn report(&mut self, action: &str, err: &ApiError) {
        match err {
            ApiError::AuthExpired => {
                if !self.login_required {
                    info!(action, "Session expired, login required");
                    self.notices.push(NoticeKind::LoginRequired, SESSION_EXPIRED_MESSAGE);
                }
                self.login_required = true;
            }
            ApiError::RateLimited => {
                warn!(action, "Rate limited");
                self.notices.push(NoticeKind::RateLimited, RATE_LIMITED_MESSAGE);
            }
            other => {
                warn!(action, error = %other, "Request failed");
                self.notices
                    .push(NoticeKind::Error, format!("{action} failed. Please try again."));
            }
        }
    }

    /// Set once any call bounced off the auth boundary; the host routes to login.
    pub fn login_required(&self) -> bool {
        self.login_required
    }

    /// Stop accepting results; responses still in flight are discarded on arrival.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.lightbox.close();
        debug!(items = self.collection.len(), "Gallery store torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::layout::MasonryLayout;
    use crate::models::{MediaType, UNKNOWN_DAYS_LEFT};
    use crate::ui::GridNode;

    pub(crate) fn store(filters: GalleryFilters) -> SharedStore {
        let show_deleted = filters.show_deleted;
        let mut layout = MasonryLayout::default();
        layout.set_width(720.0);
        GalleryStore::new(
            filters,
            GridSurface::headless(layout, show_deleted),
            Duration::from_secs(4),
        )
        .shared()
    }

    pub(crate) fn item(id: i64) -> MediaItem {
        MediaItem::new(id, MediaType::Image, format!("/storage/{id}.jpg"))
    }

    fn deleted(id: i64, days: Option<u32>) -> MediaItem {
        let mut item = item(id);
        item.deleted = true;
        item.days_left = days;
        item
    }

    #[test]
    fn test_deleted_view_sorts_and_groups_pages() {
        let store = store(GalleryFilters::deleted());
        let mut store = store.borrow_mut();
        store.apply_page(vec![
            deleted(1, None),
            deleted(2, Some(3)),
            deleted(3, Some(0)),
            deleted(4, Some(3)),
        ]);
        assert_eq!(store.collection.ids(), vec![3, 2, 4, 1]);
        let labels: Vec<_> = store.grid.headings().iter().map(|h| h.label.clone()).collect();
        assert_eq!(
            labels,
            vec!["Deleting soon", "3 days left", "Deletion date unknown"]
        );
        assert!(matches!(
            store.grid.nodes().last(),
            Some(GridNode::Tile(tile)) if tile.id == 1
        ));
        assert_eq!(
            store.collection.find_by_id(1).map(MediaItem::retention_days),
            Some(UNKNOWN_DAYS_LEFT)
        );
    }

    #[test]
    fn test_remove_item_keeps_lightbox_valid() {
        let store = store(GalleryFilters::default());
        let mut store = store.borrow_mut();
        store.apply_page((1..=3).map(item).collect());
        let GalleryStore {
            collection,
            lightbox,
            ..
        } = &mut *store;
        lightbox.open_at(2, collection, Some(3)).unwrap();

        assert!(store.remove_item(3).is_some());
        assert_eq!(store.lightbox.current_index(), Some(1));
        assert_eq!(store.grid.tile_count(), 2);
        assert!(store.remove_item(99).is_none());
    }

    #[test]
    fn test_remove_items_relayouts_once() {
        let store = store(GalleryFilters::default());
        let mut store = store.borrow_mut();
        store.apply_page((1..=6).map(item).collect());
        let GalleryStore {
            collection,
            lightbox,
            ..
        } = &mut *store;
        lightbox.open_at(4, collection, Some(5)).unwrap();
        let rebuilds = store.grid.rebuild_count();

        let removed = store.remove_items(&[5, 2, 6, 40]);
        assert_eq!(removed.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2, 5, 6]);
        assert_eq!(store.grid.rebuild_count(), rebuilds + 1);
        assert_eq!(store.collection.ids(), vec![1, 3, 4]);
        assert_eq!(store.grid.tile_ids(), vec![1, 3, 4]);
        assert_eq!(store.lightbox.current_index(), Some(2));
    }

    #[test]
    fn test_report_distinguishes_failures() {
        let store = store(GalleryFilters::default());
        let mut store = store.borrow_mut();
        store.report("Delete", &ApiError::RateLimited);
        assert_eq!(
            store.notices.latest().map(|n| (n.kind, n.message.as_str())),
            Some((NoticeKind::RateLimited, RATE_LIMITED_MESSAGE))
        );
        store.report("Delete", &ApiError::Status(500));
        assert_eq!(
            store.notices.latest().map(|n| n.message.as_str()),
            Some("Delete failed. Please try again.")
        );
        assert!(!store.login_required());
        store.report("Loading", &ApiError::AuthExpired);
        store.report("Loading", &ApiError::AuthExpired);
        assert!(store.login_required());
        assert_eq!(store.notices.len(), 3);
    }

    #[test]
    fn test_unknown_ids_take_view_scope() {
        let normal = store(GalleryFilters::default());
        assert!(!normal.borrow().is_deleted(42));
        let trash = store(GalleryFilters::deleted());
        assert!(trash.borrow().is_deleted(42));
    }
}
