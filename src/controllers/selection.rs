//! Multi-select and bulk actions.
//!
//! The selection is always read back from the grid's checkboxes (plus ids checked by a
//! select-all before they were paginated in); no separate set is kept.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, info, trace};

use crate::api::{ApiError, BulkAction, GalleryApi};
use crate::models::MediaItem;
use crate::store::{GalleryStore, SharedStore};
use crate::ui::NoticeKind;

pub const SELECT_ALL_LABEL: &str = "Select All";
pub const DESELECT_ALL_LABEL: &str = "Deselect All";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllMode {
    /// Every id in the active filter scope, fetched from the server.
    Matching,
    /// Only tiles currently in the grid (modifier-key invocation).
    Materialized,
}

/// Derived state of the bulk action bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSummary {
    pub count: usize,
    pub bar_visible: bool,
    pub delete_enabled: bool,
    pub restore_enabled: bool,
    pub permanent_delete_enabled: bool,
    pub zip_enabled: bool,
    pub add_to_album_enabled: bool,
    pub select_all_label: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BulkOutcome {
    /// Nothing in the selection satisfies the action's precondition.
    Noop,
    /// The same action is already in flight.
    Busy,
    Completed {
        action: BulkAction,
        ids: Vec<i64>,
        /// Snapshots of affected items after the local update.
        updated: Vec<MediaItem>,
        archive: Option<Vec<u8>>,
    },
    Failed(ApiError),
    /// The view was torn down while the request was in flight.
    Discarded,
}

pub struct SelectionController<A> {
    api: Rc<A>,
    store: SharedStore,
    in_flight: RefCell<Vec<BulkAction>>,
}

impl<A: GalleryApi> SelectionController<A> {
    pub fn new(api: Rc<A>, store: SharedStore) -> Self {
        Self {
            api,
            store,
            in_flight: RefCell::new(Vec::new()),
        }
    }

    pub fn selected_ids(&self) -> BTreeSet<i64> {
        self.store.borrow().grid.checked_ids()
    }

    pub fn summary(&self) -> SelectionSummary {
        let store = self.store.borrow();
        let selected = store.grid.checked_ids();
        let any_deleted = selected.iter().any(|id| store.is_deleted(*id));
        let any_live = selected.iter().any(|id| !store.is_deleted(*id));
        let idle = |action: BulkAction| !self.is_busy(action);
        let count = selected.len();

        SelectionSummary {
            count,
            bar_visible: count > 0,
            delete_enabled: any_live && idle(BulkAction::Delete),
            restore_enabled: any_deleted && idle(BulkAction::Restore),
            permanent_delete_enabled: any_deleted && idle(BulkAction::PermanentDelete),
            zip_enabled: count > 0 && idle(BulkAction::Zip),
            add_to_album_enabled: count > 0,
            select_all_label: if store.grid.all_materialized_checked() {
                DESELECT_ALL_LABEL
            } else {
                SELECT_ALL_LABEL
            },
        }
    }

    pub fn is_busy(&self, action: BulkAction) -> bool {
        self.in_flight.borrow().contains(&action)
    }

    pub fn toggle(&self, id: i64, checked: bool) -> bool {
        self.store.borrow_mut().grid.set_checked(id, checked)
    }

    pub fn clear(&self) {
        self.store.borrow_mut().grid.clear_selection();
    }

    /// Select (or, when everything shown is already selected, deselect) all.
    ///
    /// Returns the number of selected ids afterwards.
    pub async fn select_all(&self, mode: SelectAllMode) -> usize {
        let filters = {
            let mut store = self.store.borrow_mut();
            if store.grid.all_materialized_checked() {
                match mode {
                    SelectAllMode::Matching => store.grid.clear_selection(),
                    SelectAllMode::Materialized => {
                        let ids = store.grid.tile_ids();
                        store.grid.uncheck_ids(&ids);
                    }
                }
                return store.grid.checked_ids().len();
            }
            if mode == SelectAllMode::Materialized {
                let ids = store.grid.tile_ids();
                store.grid.check_ids(&ids);
                return store.grid.checked_ids().len();
            }
            store.filters.clone()
        };

        let result = self.api.fetch_matching_ids(&filters).await;

        let mut store = self.store.borrow_mut();
        if store.is_torn_down() {
            return 0;
        }
        match result {
            Ok(ids) => {
                debug!(count = ids.len(), "Selecting all matching ids");
                store.grid.check_ids(&ids);
            }
            Err(err) => store.report("Select all", &err),
        }
        store.grid.checked_ids().len()
    }

    /// Run `action` over the applicable part of the selection in one request.
    pub async fn run(&self, action: BulkAction) -> BulkOutcome {
        let ids: Vec<i64> = {
            let store = self.store.borrow();
            if store.is_torn_down() {
                return BulkOutcome::Discarded;
            }
            store
                .grid
                .checked_ids()
                .into_iter()
                .filter(|id| action.applies_to(store.is_deleted(*id)))
                .collect()
        };
        if ids.is_empty() {
            trace!(?action, "Bulk action has nothing to do");
            return BulkOutcome::Noop;
        }
        if self.is_busy(action) {
            return BulkOutcome::Busy;
        }

        self.in_flight.borrow_mut().push(action);
        let result = self.api.bulk(action, &ids).await;
        self.in_flight.borrow_mut().retain(|busy| *busy != action);

        let mut store = self.store.borrow_mut();
        if store.is_torn_down() {
            return BulkOutcome::Discarded;
        }
        match result {
            Ok(receipt) => {
                let updated = apply_bulk(&mut store, action, &ids);
                store.grid.uncheck_ids(&ids);
                info!(?action, count = ids.len(), "Bulk action completed");
                if let BulkAction::AddToAlbum { .. } = action {
                    store
                        .notices
                        .push(NoticeKind::Info, format!("Added {} items to album", ids.len()));
                }
                BulkOutcome::Completed {
                    action,
                    ids,
                    updated,
                    archive: receipt.archive,
                }
            }
            Err(err) => {
                store.report(action.label(), &err);
                BulkOutcome::Failed(err)
            }
        }
    }
}

/// Reflect a confirmed bulk action locally. Items that left the filter scope are
/// removed from collection and grid in one batch.
fn apply_bulk(store: &mut GalleryStore, action: BulkAction, ids: &[i64]) -> Vec<MediaItem> {
    let show_deleted = store.filters.show_deleted;
    let wanted: HashSet<i64> = ids.iter().copied().collect();
    let flag = match action {
        BulkAction::Delete => Some(true),
        BulkAction::Restore => Some(false),
        _ => None,
    };
    if let Some(deleted) = flag {
        let marked = store.collection.mark_deleted_ids(&wanted, deleted);
        if marked < wanted.len() {
            debug!(missing = wanted.len() - marked, "Bulk update for items not loaded yet");
        }
    }
    let leaves_scope = match action {
        BulkAction::Delete => !show_deleted,
        BulkAction::Restore => show_deleted,
        BulkAction::PermanentDelete => true,
        BulkAction::Zip | BulkAction::AddToAlbum { .. } => false,
    };

    if leaves_scope {
        return store.remove_items(ids);
    }
    let updated: Vec<MediaItem> = store
        .collection
        .iter()
        .filter(|item| wanted.contains(&item.id))
        .cloned()
        .collect();
    if flag.is_some() {
        let flags: HashMap<i64, bool> = updated.iter().map(|item| (item.id, item.deleted)).collect();
        store.grid.set_deleted_flags(&flags);
    }
    updated
}
