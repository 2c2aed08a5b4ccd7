//! Optimistic favorite toggling.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::api::{ApiError, GalleryApi};
use crate::store::SharedStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteOutcome {
    /// Server accepted the new value.
    Confirmed(bool),
    /// Server refused; the flag was put back if nothing changed it meanwhile.
    RolledBack(ApiError),
    /// The id is not in the collection (stale tile reference).
    Missing,
    Discarded,
}

pub struct FavoriteController<A> {
    api: Rc<A>,
    store: SharedStore,
}

impl<A: GalleryApi> FavoriteController<A> {
    pub fn new(api: Rc<A>, store: SharedStore) -> Self {
        Self { api, store }
    }

    /// Flip the flag locally right away, then confirm with the server.
    pub async fn toggle(&self, id: i64) -> FavoriteOutcome {
        let target = {
            let mut store = self.store.borrow_mut();
            if store.is_torn_down() {
                return FavoriteOutcome::Discarded;
            }
            let Some(current) = store.collection.find_by_id(id).map(|item| item.favorite) else {
                debug!(id, "Favorite toggle for unknown item");
                return FavoriteOutcome::Missing;
            };
            let target = !current;
            if store.collection.mark_favorite(id, target).is_err() {
                return FavoriteOutcome::Missing;
            }
            if let Some(tile) = store.grid.tile_mut(id) {
                tile.set_favorite(target);
            }
            target
        };

        let result = self.api.set_favorite(id, target).await;

        let mut store = self.store.borrow_mut();
        if store.is_torn_down() {
            return FavoriteOutcome::Discarded;
        }
        match result {
            Ok(()) => {
                debug!(id, favorite = target, "Favorite confirmed");
                FavoriteOutcome::Confirmed(target)
            }
            Err(err) => {
                // A later toggle owns the flag now; leave it alone.
                let still_ours = store
                    .collection
                    .find_by_id(id)
                    .map(|item| item.favorite == target)
                    .unwrap_or(false);
                if still_ours {
                    warn!(id, error = %err, "Favorite rejected, rolling back");
                    if let Err(missing) = store.collection.mark_favorite(id, !target) {
                        debug!(%missing, "Rollback target vanished");
                    }
                    if let Some(tile) = store.grid.tile_mut(id) {
                        tile.set_favorite(!target);
                    }
                }
                store.report("Favorite", &err);
                FavoriteOutcome::RolledBack(err)
            }
        }
    }
}
