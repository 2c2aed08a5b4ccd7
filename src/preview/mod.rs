//! Lazy preview loading for grid tiles.
//!
//! - `LazyObserver` - what the grid registers tile media with
//! - `PreviewCache` - in-memory LRU of decoded preview metadata
//! - `PreviewLoader` - worker pool that fetches previews near the viewport

pub mod cache;
pub mod loader;

pub use cache::{CachedPreview, PreviewCache};
pub use loader::{HttpPreviewSource, PreviewLoader, PreviewSource};

/// Outcome of one preview load, delivered back to the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewResult {
    pub id: i64,
    /// Intrinsic preview dimensions, or the failure reason.
    pub outcome: Result<(u32, u32), String>,
}

/// Registration surface for off-screen media.
///
/// Tiles register their preview source when materialized; the grid then reports which
/// tiles are near the viewport and only those get fetched.
pub trait LazyObserver {
    fn observe(&mut self, id: i64, url: &str);

    fn unobserve(&mut self, id: i64);

    /// Tiles currently within the near-viewport margin.
    fn request_visible(&mut self, _ids: &[i64]) {}

    /// Completed loads since the last poll.
    fn poll(&mut self) -> Vec<PreviewResult> {
        Vec::new()
    }
}

/// Observer for hosts that load media natively.
#[derive(Debug, Default)]
pub struct NullObserver;

impl LazyObserver for NullObserver {
    fn observe(&mut self, _id: i64, _url: &str) {}

    fn unobserve(&mut self, _id: i64) {}
}
