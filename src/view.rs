//! One gallery view: store plus controllers, driven by host input.
//!
//! The host toolkit forwards pointer, key, scroll and resize input here and mirrors
//! `GridSurface`, `Lightbox` and `Notices` back on screen.

use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::api::GalleryApi;
use crate::config::GalleryConfig;
use crate::controllers::{
    AlbumsController, FavoriteController, FavoriteOutcome, FetchOutcome, FetchTrigger,
    PaginationController, SelectionController,
};
use crate::layout::MasonryLayout;
use crate::models::{GalleryFilters, MediaItem};
use crate::preview::LazyObserver;
use crate::store::{GalleryStore, SharedStore};
use crate::ui::keybindings::{self, Key, KeyAction, Modifiers, ViewMode};
use crate::ui::{GridSurface, LightboxError, TileEvent, TileTarget};

pub struct GalleryView<A> {
    store: SharedStore,
    pub pagination: PaginationController<A>,
    pub selection: SelectionController<A>,
    pub favorites: FavoriteController<A>,
    /// Present when the view belongs to an event.
    pub albums: Option<AlbumsController<A>>,
}

impl<A: GalleryApi> GalleryView<A> {
    pub fn new(
        api: Rc<A>,
        config: &GalleryConfig,
        filters: GalleryFilters,
        observer: Box<dyn LazyObserver>,
    ) -> Self {
        let layout = MasonryLayout::new(config.layout_mode, config.target_column_width);
        let grid = GridSurface::new(
            layout,
            observer,
            filters.show_deleted,
            config.near_viewport_rows,
        );
        let store = GalleryStore::new(filters, grid, config.notice_ttl()).shared();
        let albums = config
            .event_id
            .map(|event_id| AlbumsController::new(Rc::clone(&api), Rc::clone(&store), event_id));

        Self {
            pagination: PaginationController::new(
                Rc::clone(&api),
                Rc::clone(&store),
                config.pagination(),
            ),
            selection: SelectionController::new(Rc::clone(&api), Rc::clone(&store)),
            favorites: FavoriteController::new(api, Rc::clone(&store)),
            albums,
            store,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Server-rendered first page, with the cursor it came with.
    pub fn seed(&self, items: Vec<MediaItem>, next_offset: Option<u64>) -> usize {
        let accepted = self.store.borrow_mut().seed(items);
        self.pagination.resume_from(next_offset);
        accepted
    }

    /// Initial load: fetch while fewer than one page is shown and more is available.
    pub async fn start(&self) -> FetchOutcome {
        let mut last = FetchOutcome::Skipped;
        while self.pagination.should_fetch(FetchTrigger::Underfill) {
            last = self.pagination.fetch_next().await;
            match last {
                FetchOutcome::Applied {
                    accepted: 0,
                    exhausted: false,
                }
                | FetchOutcome::Failed(_)
                | FetchOutcome::Skipped => break,
                FetchOutcome::Applied { .. } => {}
            }
        }
        last
    }

    pub fn resize(&self, available_width: f32) -> bool {
        self.store.borrow_mut().grid.resize(available_width)
    }

    pub async fn scroll(&self, scroll_bottom: f64, document_height: f64) -> FetchOutcome {
        self.pagination
            .fetch_if(FetchTrigger::Scroll {
                scroll_bottom,
                document_height,
            })
            .await
    }

    pub async fn sentinel_visible(&self) -> FetchOutcome {
        self.pagination.fetch_if(FetchTrigger::Sentinel).await
    }

    pub fn set_visible_rows(&self, first: usize, last: usize) {
        self.store.borrow_mut().grid.set_visible_rows(first, last);
    }

    pub fn pump_previews(&self) -> usize {
        self.store.borrow_mut().grid.pump_previews()
    }

    pub fn expire_notices(&self, now: Instant) -> usize {
        self.store.borrow_mut().notices.expire(now)
    }

    /// Pointer click on part of a tile.
    pub async fn click(&self, id: i64, target: TileTarget) -> Option<TileEvent> {
        let event = self.store.borrow_mut().grid.tile_mut(id)?.click(target);
        self.handle_tile_event(event).await;
        Some(event)
    }

    pub async fn handle_tile_event(&self, event: TileEvent) {
        match event {
            TileEvent::Open { id } => {
                if let Err(err) = self.open(id) {
                    debug!(id, %err, "Cannot open lightbox");
                }
            }
            TileEvent::SelectionChanged { id, checked } => {
                trace!(id, checked, "Selection changed");
            }
            TileEvent::FavoriteRequested { id } => {
                self.favorites.toggle(id).await;
            }
        }
    }

    /// Open the lightbox on `id`, resolved to its index now rather than at tile creation.
    pub fn open(&self, id: i64) -> Result<(), LightboxError> {
        let mut store = self.store.borrow_mut();
        let GalleryStore {
            collection,
            lightbox,
            ..
        } = &mut *store;
        let index = collection.index_of(id).ok_or(LightboxError::OutOfRange {
            index: collection.len(),
            len: collection.len(),
        })?;
        lightbox.open_at(index, collection, Some(id))
    }

    pub fn close_lightbox(&self) {
        let mut store = self.store.borrow_mut();
        if let Some(tile) = store.lightbox.close() {
            store.grid.focus_tile(tile);
        }
    }

    /// The lightbox media for `generation` finished loading.
    pub fn media_ready(&self, generation: u64) -> bool {
        self.store.borrow_mut().lightbox.media_ready(generation)
    }

    /// Returns false when the key is not handled and should propagate.
    pub async fn handle_key(&self, key: Key, modifiers: Modifiers) -> bool {
        let mode = if self.store.borrow().lightbox.is_open() {
            ViewMode::Lightbox
        } else {
            ViewMode::Grid
        };
        let Some(action) = keybindings::resolve(mode, key, modifiers) else {
            return false;
        };
        trace!(?action, "Key action");

        match action {
            KeyAction::CloseLightbox => self.close_lightbox(),
            KeyAction::Next | KeyAction::Previous => {
                let mut store = self.store.borrow_mut();
                let GalleryStore {
                    collection,
                    lightbox,
                    ..
                } = &mut *store;
                if action == KeyAction::Next {
                    lightbox.next(collection);
                } else {
                    lightbox.previous(collection);
                }
            }
            KeyAction::CycleFocus { backwards } => {
                self.store.borrow_mut().lightbox.cycle_focus(backwards);
            }
            KeyAction::TogglePlayback => {
                self.store.borrow_mut().lightbox.toggle_playback();
            }
            KeyAction::MoveFocus(delta) => {
                self.store.borrow_mut().grid.move_focus(delta);
            }
            KeyAction::MoveFocusRows(rows) => {
                let mut store = self.store.borrow_mut();
                let columns = store.grid.layout().columns() as isize;
                store.grid.move_focus(rows * columns);
            }
            KeyAction::OpenFocused => {
                let focused = self.store.borrow().grid.focused();
                if let Some(id) = focused {
                    self.click(id, TileTarget::Media).await;
                }
            }
            KeyAction::ToggleFocusedSelection => {
                let focused = self.store.borrow().grid.focused();
                if let Some(id) = focused {
                    self.click(id, TileTarget::Checkbox).await;
                }
            }
            KeyAction::ToggleFavorite => {
                let target = {
                    let store = self.store.borrow();
                    match mode {
                        ViewMode::Lightbox => store.lightbox.current_id(),
                        ViewMode::Grid => store.grid.focused(),
                    }
                };
                if let Some(id) = target {
                    self.favorites.toggle(id).await;
                }
            }
        }
        true
    }

    pub async fn toggle_favorite(&self, id: i64) -> FavoriteOutcome {
        self.favorites.toggle(id).await
    }

    pub fn favorite_count(&self) -> usize {
        self.store.borrow().favorite_count()
    }

    pub fn login_required(&self) -> bool {
        self.store.borrow().login_required()
    }

    /// Navigation away: in-flight responses are dropped when they land.
    pub fn teardown(&self) {
        self.store.borrow_mut().teardown();
    }
}
