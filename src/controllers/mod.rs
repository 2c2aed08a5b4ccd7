//! Async controllers over the shared gallery store.
//!
//! Each controller holds the `GalleryApi` and the `SharedStore`. Store borrows are
//! scoped so none is ever held across an await.

pub mod albums;
pub mod favorite;
pub mod pagination;
pub mod selection;

pub use albums::AlbumsController;
pub use favorite::{FavoriteController, FavoriteOutcome};
pub use pagination::{
    FetchOutcome, FetchTrigger, PaginationController, PaginationSettings, PaginationState,
};
pub use selection::{BulkOutcome, SelectAllMode, SelectionController, SelectionSummary};
