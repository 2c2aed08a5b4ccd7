//! Tile materialization: one media item turned into an interactive grid element.
//!
//! A tile knows nothing about placement. It carries its controls (checkbox, favorite
//! toggle), its media surface and badges, and translates pointer input into
//! `TileEvent`s for the controllers.

use crate::models::{MediaItem, MediaType};
use crate::preview::LazyObserver;

const FAVORITE_GLYPH: &str = "★";
const NOT_FAVORITE_GLYPH: &str = "☆";

/// Preview state of a tile's media surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    /// Registered with the lazy observer, not fetched yet.
    Pending,
    Loaded { width: u32, height: u32 },
    /// No preview; the tile stays selectable and removable.
    Failed,
    /// Video without a poster frame; the host streams it directly.
    Streamed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileMedia {
    Image {
        src: String,
        srcset: Option<String>,
        alt: String,
        full: String,
    },
    Video {
        src: String,
        poster: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkbox {
    pub id: i64,
    pub checked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteToggle {
    pub id: i64,
    pub active: bool,
}

impl FavoriteToggle {
    pub fn glyph(&self) -> &'static str {
        if self.active {
            FAVORITE_GLYPH
        } else {
            NOT_FAVORITE_GLYPH
        }
    }

    pub fn title(&self) -> &'static str {
        if self.active {
            "Unfavorite"
        } else {
            "Favorite"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Video,
    Deleted,
}

/// Part of a tile that received a pointer click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileTarget {
    Checkbox,
    Favorite,
    Media,
    Overlay,
    /// Tile chrome outside media and controls.
    Body,
}

/// What a tile asks the controllers to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileEvent {
    /// Open the lightbox at this item's current index.
    Open { id: i64 },
    SelectionChanged { id: i64, checked: bool },
    FavoriteRequested { id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub id: i64,
    /// Index at creation time. Informational only: the lightbox resolves by id.
    pub created_index: usize,
    pub name: String,
    pub checkbox: Checkbox,
    pub media: TileMedia,
    pub preview: PreviewState,
    pub favorite: FavoriteToggle,
    pub badges: Vec<Badge>,
    pub focused: bool,
}

impl Tile {
    /// Build the tile for `item` and register its media with `observer`.
    pub fn materialize(
        item: &MediaItem,
        index: usize,
        show_deleted: bool,
        observer: &mut dyn LazyObserver,
    ) -> Self {
        let media = match item.media_type {
            MediaType::Image => TileMedia::Image {
                src: item.preview_url().to_string(),
                srcset: item.srcset.clone().filter(|s| !s.is_empty()),
                alt: item.name.clone(),
                full: item.url.clone(),
            },
            MediaType::Video => TileMedia::Video {
                src: item.url.clone(),
                poster: item.thumb_url.clone().filter(|s| !s.is_empty()),
            },
        };

        let preview = match &media {
            TileMedia::Image { src, .. } => {
                observer.observe(item.id, src);
                PreviewState::Pending
            }
            TileMedia::Video {
                poster: Some(poster),
                ..
            } => {
                observer.observe(item.id, poster);
                PreviewState::Pending
            }
            TileMedia::Video { poster: None, .. } => PreviewState::Streamed,
        };

        let mut tile = Self {
            id: item.id,
            created_index: index,
            name: item.name.clone(),
            checkbox: Checkbox {
                id: item.id,
                checked: false,
            },
            media,
            preview,
            favorite: FavoriteToggle {
                id: item.id,
                active: item.favorite,
            },
            badges: Vec::new(),
            focused: false,
        };
        if item.is_video() {
            tile.badges.push(Badge::Video);
        }
        tile.set_deleted(item.deleted, show_deleted);
        tile
    }

    pub fn is_checked(&self) -> bool {
        self.checkbox.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checkbox.checked = checked;
    }

    pub fn set_favorite(&mut self, active: bool) {
        self.favorite.active = active;
    }

    /// The deleted badge only shows outside the deleted view, where it would be noise.
    pub fn set_deleted(&mut self, deleted: bool, show_deleted: bool) {
        self.badges.retain(|badge| *badge != Badge::Deleted);
        if deleted && !show_deleted {
            self.badges.push(Badge::Deleted);
        }
    }

    pub fn has_badge(&self, badge: Badge) -> bool {
        self.badges.contains(&badge)
    }

    pub fn set_preview(&mut self, outcome: &Result<(u32, u32), String>) {
        self.preview = match outcome {
            Ok((width, height)) => PreviewState::Loaded {
                width: *width,
                height: *height,
            },
            Err(_) => PreviewState::Failed,
        };
    }

    /// Translate a click into an event. Controls never open the lightbox.
    pub fn click(&mut self, target: TileTarget) -> TileEvent {
        match target {
            TileTarget::Checkbox | TileTarget::Body => {
                self.checkbox.checked = !self.checkbox.checked;
                TileEvent::SelectionChanged {
                    id: self.id,
                    checked: self.checkbox.checked,
                }
            }
            TileTarget::Favorite => TileEvent::FavoriteRequested { id: self.id },
            TileTarget::Media | TileTarget::Overlay => TileEvent::Open { id: self.id },
        }
    }
}
