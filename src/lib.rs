//! Client-side engine for a paginated media gallery.
//!
//! - `models` - media items, the ordered collection and filter scope
//! - `layout` - deterministic masonry column assignment
//! - `ui` - retained grid surface, tiles, lightbox, keybindings, notices
//! - `preview` - lazy preview loading near the viewport
//! - `api` - remote gallery source
//! - `controllers` - pagination, selection, favorites, albums
//! - `view` - one gallery view wiring all of the above

pub mod api;
pub mod config;
pub mod controllers;
pub mod driver;
pub mod layout;
pub mod models;
pub mod preview;
pub mod store;
pub mod ui;
pub mod view;

pub use config::GalleryConfig;
pub use store::{GalleryStore, SharedStore};
pub use view::GalleryView;
