//! Infinite-scroll pagination.
//!
//! Requests are strictly sequential: a trigger while `Loading` is ignored, so pages are
//! applied in the order the server cursor hands them out.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::api::{ApiError, GalleryApi};
use crate::store::SharedStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Idle,
    Loading,
    Exhausted,
}

/// Why a fetch is being considered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchTrigger {
    /// Scroll position; fires when the bottom is within the threshold of the end.
    Scroll {
        scroll_bottom: f64,
        document_height: f64,
    },
    /// The end-of-grid sentinel entered the viewport.
    Sentinel,
    /// Fewer items than one page are loaded while more are available.
    Underfill,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page applied; `accepted` may be zero when the page only repeated known ids.
    Applied { accepted: usize, exhausted: bool },
    /// Swallowed failure; the next trigger retries.
    Failed(ApiError),
    /// Not started (busy, exhausted, or trigger not met) or result discarded.
    Skipped,
}

#[derive(Debug, Clone, Copy)]
pub struct PaginationSettings {
    pub page_size: usize,
    pub skeleton_count: usize,
    pub scroll_threshold_px: f64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: 60,
            skeleton_count: 8,
            scroll_threshold_px: 800.0,
        }
    }
}

pub struct PaginationController<A> {
    api: Rc<A>,
    store: SharedStore,
    settings: PaginationSettings,
    state: Cell<PaginationState>,
    cursor: Cell<u64>,
}

impl<A: GalleryApi> PaginationController<A> {
    pub fn new(api: Rc<A>, store: SharedStore, settings: PaginationSettings) -> Self {
        Self {
            api,
            store,
            settings,
            state: Cell::new(PaginationState::Idle),
            cursor: Cell::new(0),
        }
    }

    /// Start after server-rendered seed data, at the cursor the page shipped with.
    pub fn resume_from(&self, cursor: Option<u64>) {
        match cursor {
            Some(offset) => self.cursor.set(offset),
            None => self.finish(),
        }
    }

    pub fn state(&self) -> PaginationState {
        self.state.get()
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.get()
    }

    pub fn should_fetch(&self, trigger: FetchTrigger) -> bool {
        if self.state.get() != PaginationState::Idle {
            return false;
        }
        match trigger {
            FetchTrigger::Scroll {
                scroll_bottom,
                document_height,
            } => document_height - scroll_bottom <= self.settings.scroll_threshold_px,
            FetchTrigger::Sentinel => true,
            FetchTrigger::Underfill => self.store.borrow().collection.len() < self.settings.page_size,
        }
    }

    /// Fetch the next page if `trigger` calls for it.
    pub async fn fetch_if(&self, trigger: FetchTrigger) -> FetchOutcome {
        if !self.should_fetch(trigger) {
            return FetchOutcome::Skipped;
        }
        self.fetch_next().await
    }

    /// Fetch and apply the next page.
    pub async fn fetch_next(&self) -> FetchOutcome {
        if self.state.get() != PaginationState::Idle {
            return FetchOutcome::Skipped;
        }
        let filters = {
            let mut store = self.store.borrow_mut();
            if store.is_torn_down() {
                return FetchOutcome::Skipped;
            }
            store.grid.insert_skeletons(self.settings.skeleton_count);
            store.filters.clone()
        };
        self.state.set(PaginationState::Loading);
        let offset = self.cursor.get();
        debug!(offset, limit = self.settings.page_size, "Fetching page");

        let result = self
            .api
            .fetch_page(offset, self.settings.page_size, &filters)
            .await;

        let mut store = self.store.borrow_mut();
        if store.is_torn_down() {
            debug!(offset, "Discarding page for torn down view");
            self.state.set(PaginationState::Idle);
            return FetchOutcome::Skipped;
        }
        store.grid.remove_skeletons();

        match result {
            Ok(page) => {
                let accepted = store.apply_page(page.items);
                let exhausted = match page.next_offset {
                    Some(next) => {
                        self.cursor.set(next);
                        self.state.set(PaginationState::Idle);
                        false
                    }
                    None => {
                        drop(store);
                        self.finish();
                        true
                    }
                };
                debug!(offset, accepted, exhausted, "Page applied");
                FetchOutcome::Applied {
                    accepted,
                    exhausted,
                }
            }
            Err(err) => {
                self.state.set(PaginationState::Idle);
                if err.is_auth() {
                    store.report("Loading", &err);
                } else {
                    warn!(offset, error = %err, "Page fetch failed");
                }
                FetchOutcome::Failed(err)
            }
        }
    }

    fn finish(&self) {
        self.state.set(PaginationState::Exhausted);
        let mut store = self.store.borrow_mut();
        store.grid.set_end_reached(true);
        info!(items = store.collection.len(), "Gallery fully loaded");
    }
}
