//! Remote gallery source.
//!
//! `GalleryApi` is the seam between the controllers and the server. The HTTP
//! implementation lives in `http`; tests drive the controllers through a scripted
//! in-memory implementation.

pub mod http;

#[cfg(test)]
pub(crate) mod fake;

use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use crate::models::{GalleryFilters, MediaItem};

pub use http::HttpGalleryApi;

/// Typed failure of one remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    /// 401/403, an unexpected redirect, or HTML where JSON was expected.
    #[error("session expired")]
    AuthExpired,
    #[error("rate limited")]
    RateLimited,
    /// The server answered `{ok: false}`.
    #[error("request rejected by server")]
    Rejected,
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The view was torn down: the call was never sent or its answer was dropped.
    #[error("view closed")]
    Discarded,
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

/// Raw `/gallery/data` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub files: Vec<serde_json::Value>,
    #[serde(default)]
    pub next_offset: Option<u64>,
}

impl PageResponse {
    /// Decode the page. Records that do not parse are skipped, not fatal.
    pub fn into_page(self) -> Result<Page, ApiError> {
        if self.ok == Some(false) {
            return Err(ApiError::Rejected);
        }
        let offered = self.files.len();
        let items: Vec<MediaItem> = self
            .files
            .into_iter()
            .filter_map(MediaItem::from_value)
            .collect();
        if items.len() != offered {
            trace!(offered, parsed = items.len(), "Dropped unparsable page records");
        }
        Ok(Page {
            items,
            next_offset: self.next_offset,
        })
    }
}

/// One decoded page. `next_offset == None` means the source is exhausted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<MediaItem>,
    pub next_offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlbumSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub count: u64,
}

/// Server-side batch operation over selected file ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Delete,
    Restore,
    PermanentDelete,
    Zip,
    AddToAlbum { event_id: i64, album_id: i64 },
}

impl BulkAction {
    /// Whether an item with this soft-delete flag is part of the action's subset.
    pub fn applies_to(&self, deleted: bool) -> bool {
        match self {
            Self::Delete => !deleted,
            Self::Restore | Self::PermanentDelete => deleted,
            Self::Zip | Self::AddToAlbum { .. } => true,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Delete => "/gallery/actions/delete".to_string(),
            Self::Restore => "/gallery/actions/restore".to_string(),
            Self::PermanentDelete => "/gallery/actions/permadelete".to_string(),
            Self::Zip => "/gallery/download-zip".to_string(),
            Self::AddToAlbum { event_id, album_id } => {
                format!("/events/{event_id}/albums/{album_id}/add")
            }
        }
    }

    /// Form field carrying each id.
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::AddToAlbum { .. } => "file_id",
            _ => "file_ids",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Delete => "Delete",
            Self::Restore => "Restore",
            Self::PermanentDelete => "Delete permanently",
            Self::Zip => "Download",
            Self::AddToAlbum { .. } => "Add to album",
        }
    }
}

/// Settled bulk request. `archive` holds the zip body for `BulkAction::Zip`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReceipt {
    pub archive: Option<Vec<u8>>,
}

/// Remote source of truth for the gallery.
///
/// All calls run on the view's single-threaded executor; implementations need not be
/// `Send`.
#[allow(async_fn_in_trait)]
pub trait GalleryApi {
    async fn fetch_page(
        &self,
        offset: u64,
        limit: usize,
        filters: &GalleryFilters,
    ) -> Result<Page, ApiError>;

    /// Every id in the filter scope, paginated or not.
    async fn fetch_matching_ids(&self, filters: &GalleryFilters) -> Result<Vec<i64>, ApiError>;

    async fn set_favorite(&self, id: i64, favorite: bool) -> Result<(), ApiError>;

    /// One request carrying the whole subset.
    async fn bulk(&self, action: BulkAction, ids: &[i64]) -> Result<BulkReceipt, ApiError>;

    async fn list_albums(&self, event_id: i64) -> Result<Vec<AlbumSummary>, ApiError>;

    /// Returns the new album id.
    async fn create_album(
        &self,
        event_id: i64,
        name: &str,
        description: &str,
    ) -> Result<i64, ApiError>;
}
