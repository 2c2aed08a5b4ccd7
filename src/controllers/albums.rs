//! Album listing and creation for the "add to album" flow.
//!
//! Adding the selection itself is a bulk action and goes through `SelectionController`.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::api::{AlbumSummary, ApiError, GalleryApi};
use crate::store::SharedStore;

pub struct AlbumsController<A> {
    api: Rc<A>,
    store: SharedStore,
    event_id: i64,
    albums: RefCell<Vec<AlbumSummary>>,
}

impl<A: GalleryApi> AlbumsController<A> {
    pub fn new(api: Rc<A>, store: SharedStore, event_id: i64) -> Self {
        Self {
            api,
            store,
            event_id,
            albums: RefCell::new(Vec::new()),
        }
    }

    pub fn event_id(&self) -> i64 {
        self.event_id
    }

    /// Last fetched album list.
    pub fn albums(&self) -> Vec<AlbumSummary> {
        self.albums.borrow().clone()
    }

    fn torn_down(&self) -> bool {
        self.store.borrow().is_torn_down()
    }

    pub async fn refresh(&self) -> Result<Vec<AlbumSummary>, ApiError> {
        if self.torn_down() {
            return Err(ApiError::Discarded);
        }
        let result = self.api.list_albums(self.event_id).await;
        if self.torn_down() {
            debug!(event_id = self.event_id, "Dropping album list for torn down view");
            return Err(ApiError::Discarded);
        }
        match result {
            Ok(albums) => {
                debug!(event_id = self.event_id, count = albums.len(), "Albums loaded");
                *self.albums.borrow_mut() = albums.clone();
                Ok(albums)
            }
            Err(err) => {
                self.store.borrow_mut().report("Loading albums", &err);
                Err(err)
            }
        }
    }

    /// Create an album and add it to the cached list. Blank names are refused locally.
    pub async fn create(&self, name: &str, description: &str) -> Result<i64, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Rejected);
        }
        if self.torn_down() {
            return Err(ApiError::Discarded);
        }
        let result = self.api.create_album(self.event_id, name, description.trim()).await;
        if self.torn_down() {
            return Err(ApiError::Discarded);
        }
        match result {
            Ok(album_id) => {
                info!(album_id, name, "Album created");
                self.albums.borrow_mut().push(AlbumSummary {
                    id: album_id,
                    name: name.to_string(),
                    count: 0,
                });
                Ok(album_id)
            }
            Err(err) => {
                self.store.borrow_mut().report("Creating album", &err);
                Err(err)
            }
        }
    }
}
