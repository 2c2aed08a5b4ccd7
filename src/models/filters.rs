use crate::models::MediaType;

/// Active filter scope of a gallery view.
///
/// The same scope is sent to the page endpoint and to the select-all-matching
/// endpoint so both see the same set of ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryFilters {
    pub media_type: Option<MediaType>,
    pub show_deleted: bool,
    pub favorites: bool,
    pub album_id: Option<i64>,
}

impl GalleryFilters {
    pub fn favorites() -> Self {
        Self {
            favorites: true,
            ..Self::default()
        }
    }

    pub fn deleted() -> Self {
        Self {
            show_deleted: true,
            ..Self::default()
        }
    }

    /// Query pairs in a stable order; unset filters are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(kind) = self.media_type {
            pairs.push(("type", kind.as_str().to_string()));
        }
        if self.show_deleted {
            pairs.push(("show_deleted", "1".to_string()));
        }
        if self.favorites {
            pairs.push(("favorites", "1".to_string()));
        }
        if let Some(album) = self.album_id {
            pairs.push(("album_id", album.to_string()));
        }
        pairs
    }
}
