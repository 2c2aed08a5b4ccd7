// Lightbox controller for the gallery
// Features:
// - Closed / Open(index) state machine over the media collection
// - Wrap-around next/previous navigation
// - Load generations so rapid navigation never leaves stale media mounted
// - Focus trap across the lightbox controls, focus restored to the opening tile

use thiserror::Error;
use tracing::{debug, trace};

use crate::models::{MediaCollection, MediaType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LightboxError {
    #[error("index {index} is out of range for {len} items")]
    OutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightboxState {
    Closed,
    Open { index: usize },
}

/// Focusable controls inside the lightbox, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Close,
    Previous,
    Next,
    VideoControls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPhase {
    /// Source assigned, not yet decoded/ready.
    Loading,
    /// On screen.
    Shown,
}

/// One media element mounted in the lightbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaElement {
    /// Load generation; only the newest generation may become `Shown`.
    pub generation: u64,
    pub item_id: i64,
    pub kind: MediaType,
    pub src: String,
    pub phase: MediaPhase,
    pub playing: bool,
}

#[derive(Debug)]
pub struct Lightbox {
    state: LightboxState,
    current_id: Option<i64>,
    mounted: Vec<MediaElement>,
    generation: u64,
    focus: Option<FocusTarget>,
    /// Tile that opened the lightbox; focus returns there on close.
    return_focus: Option<i64>,
}

impl Default for Lightbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lightbox {
    pub fn new() -> Self {
        Self {
            state: LightboxState::Closed,
            current_id: None,
            mounted: Vec::new(),
            generation: 0,
            focus: None,
            return_focus: None,
        }
    }

    pub fn state(&self) -> LightboxState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, LightboxState::Open { .. })
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            LightboxState::Open { index } => Some(index),
            LightboxState::Closed => None,
        }
    }

    pub fn current_id(&self) -> Option<i64> {
        self.current_id
    }

    pub fn mounted(&self) -> &[MediaElement] {
        &self.mounted
    }

    pub fn focus(&self) -> Option<FocusTarget> {
        self.focus
    }

    /// Open at `index`. `trigger` is the tile to refocus on close.
    pub fn open_at(
        &mut self,
        index: usize,
        collection: &MediaCollection,
        trigger: Option<i64>,
    ) -> Result<(), LightboxError> {
        let len = collection.len();
        if index >= len {
            return Err(LightboxError::OutOfRange { index, len });
        }
        if !self.is_open() {
            self.return_focus = trigger;
        }
        self.show(index, collection);
        self.focus = Some(FocusTarget::Close);
        debug!(index, "Lightbox opened");
        Ok(())
    }

    pub fn next(&mut self, collection: &MediaCollection) {
        let len = collection.len();
        if let (LightboxState::Open { index }, true) = (self.state, len > 0) {
            self.show((index + 1) % len, collection);
        }
    }

    pub fn previous(&mut self, collection: &MediaCollection) {
        let len = collection.len();
        if let (LightboxState::Open { index }, true) = (self.state, len > 0) {
            self.show((index + len - 1) % len, collection);
        }
    }

    /// Close, pausing and releasing all media. Returns the tile that should get focus.
    pub fn close(&mut self) -> Option<i64> {
        if !self.is_open() {
            return None;
        }
        for element in &mut self.mounted {
            element.playing = false;
        }
        self.mounted.clear();
        self.state = LightboxState::Closed;
        self.current_id = None;
        self.focus = None;
        debug!("Lightbox closed");
        self.return_focus.take()
    }

    /// The element for `generation` finished loading.
    ///
    /// The current generation becomes visible and everything else is unmounted; a stale
    /// generation is unmounted on its own. Returns true if it became visible.
    pub fn media_ready(&mut self, generation: u64) -> bool {
        if generation == self.generation && self.is_open() {
            self.mounted.retain(|element| element.generation == generation);
            if let Some(element) = self.mounted.first_mut() {
                element.phase = MediaPhase::Shown;
            }
            return true;
        }
        trace!(generation, current = self.generation, "Dropping stale media");
        self.mounted.retain(|element| element.generation != generation);
        false
    }

    /// Generation of the element for the current index.
    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    pub fn toggle_playback(&mut self) -> bool {
        let generation = self.generation;
        match self
            .mounted
            .iter_mut()
            .find(|element| element.generation == generation && element.kind == MediaType::Video)
        {
            Some(video) => {
                video.playing = !video.playing;
                video.playing
            }
            None => false,
        }
    }

    /// Tab/Shift+Tab inside the lightbox, wrapping at both ends.
    pub fn cycle_focus(&mut self, backwards: bool) -> Option<FocusTarget> {
        if !self.is_open() {
            return None;
        }
        let ring = self.focus_ring();
        let position = self
            .focus
            .and_then(|target| ring.iter().position(|candidate| *candidate == target));
        let next = match (position, backwards) {
            (None, false) => 0,
            (None, true) => ring.len() - 1,
            (Some(pos), false) => (pos + 1) % ring.len(),
            (Some(pos), true) => (pos + ring.len() - 1) % ring.len(),
        };
        self.focus = Some(ring[next]);
        self.focus
    }

    /// Re-resolve the open item after the collection changed.
    ///
    /// Follows the item by id; if it is gone the index is clamped, and an empty
    /// collection closes the lightbox.
    pub fn sync_with(&mut self, collection: &MediaCollection) -> Option<i64> {
        let LightboxState::Open { index } = self.state else {
            return None;
        };
        if collection.is_empty() {
            return self.close();
        }
        let resolved = self.current_id.and_then(|id| collection.index_of(id));
        match resolved {
            Some(found) if found == index => {}
            Some(found) => self.state = LightboxState::Open { index: found },
            None => self.show(index.min(collection.len() - 1), collection),
        }
        None
    }

    fn focus_ring(&self) -> Vec<FocusTarget> {
        let mut ring = vec![FocusTarget::Close, FocusTarget::Previous, FocusTarget::Next];
        let showing_video = self
            .mounted
            .iter()
            .any(|element| element.generation == self.generation && element.kind == MediaType::Video);
        if showing_video {
            ring.push(FocusTarget::VideoControls);
        }
        ring
    }

    fn show(&mut self, index: usize, collection: &MediaCollection) {
        let Some(item) = collection.get(index) else {
            return;
        };
        self.state = LightboxState::Open { index };
        self.current_id = Some(item.id);
        self.generation += 1;

        // At most one element is still loading: the newest.
        self.mounted.retain(|element| element.phase == MediaPhase::Shown);
        for element in &mut self.mounted {
            element.playing = false;
        }
        self.mounted.push(MediaElement {
            generation: self.generation,
            item_id: item.id,
            kind: item.media_type,
            src: item.full_url().to_string(),
            phase: MediaPhase::Loading,
            playing: false,
        });
        if self.focus == Some(FocusTarget::VideoControls) && item.media_type != MediaType::Video
        {
            self.focus = Some(FocusTarget::Close);
        }
        trace!(index, id = item.id, generation = self.generation, "Lightbox media mounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaItem;

    fn collection(n: i64) -> MediaCollection {
        MediaCollection::seeded(
            (1..=n)
                .map(|id| MediaItem::new(id, MediaType::Image, format!("/storage/{id}.jpg")))
                .collect(),
        )
    }

    fn loading_count(lightbox: &Lightbox) -> usize {
        lightbox
            .mounted()
            .iter()
            .filter(|element| element.phase == MediaPhase::Loading)
            .count()
    }

    #[test]
    fn test_open_validates_index() {
        let items = collection(3);
        let mut lightbox = Lightbox::new();
        assert_eq!(
            lightbox.open_at(3, &items, None),
            Err(LightboxError::OutOfRange { index: 3, len: 3 })
        );
        assert_eq!(lightbox.state(), LightboxState::Closed);
        lightbox.open_at(2, &items, Some(3)).unwrap();
        assert_eq!(lightbox.state(), LightboxState::Open { index: 2 });
        assert_eq!(lightbox.mounted()[0].src, "/storage/3.jpg");
    }

    #[test]
    fn test_next_wraps_back_to_start() {
        let items = collection(4);
        let mut lightbox = Lightbox::new();
        lightbox.open_at(1, &items, None).unwrap();
        for _ in 0..4 {
            lightbox.next(&items);
            let index = lightbox.current_index().unwrap();
            assert!(index < items.len());
        }
        assert_eq!(lightbox.current_index(), Some(1));
    }

    #[test]
    fn test_previous_wraps_to_end() {
        let items = collection(3);
        let mut lightbox = Lightbox::new();
        lightbox.open_at(0, &items, None).unwrap();
        lightbox.previous(&items);
        assert_eq!(lightbox.current_index(), Some(2));
    }

    #[test]
    fn test_navigation_is_noop_when_closed_or_empty() {
        let empty = MediaCollection::new();
        let mut lightbox = Lightbox::new();
        lightbox.next(&empty);
        lightbox.previous(&empty);
        assert_eq!(lightbox.state(), LightboxState::Closed);
        assert!(lightbox.open_at(0, &empty, None).is_err());
    }

    #[test]
    fn test_close_restores_focus_and_releases_media() {
        let items = collection(2);
        let mut lightbox = Lightbox::new();
        lightbox.open_at(0, &items, Some(1)).unwrap();
        lightbox.next(&items);
        assert_eq!(lightbox.close(), Some(1));
        assert!(lightbox.mounted().is_empty());
        assert_eq!(lightbox.state(), LightboxState::Closed);
        assert_eq!(lightbox.close(), None);
    }

    #[test]
    fn test_rapid_navigation_keeps_one_loading_element() {
        let items = collection(5);
        let mut lightbox = Lightbox::new();
        lightbox.open_at(0, &items, None).unwrap();
        let first = lightbox.current_generation();
        assert!(lightbox.media_ready(first));

        for _ in 0..4 {
            lightbox.next(&items);
            assert!(loading_count(&lightbox) <= 1);
        }
        // Old shown element stays until the newest is ready.
        assert_eq!(lightbox.mounted().len(), 2);

        // A stale completion does not become visible.
        assert!(!lightbox.media_ready(first + 1));
        assert!(lightbox.media_ready(lightbox.current_generation()));
        assert_eq!(lightbox.mounted().len(), 1);
        assert_eq!(lightbox.mounted()[0].item_id, 5);
        assert_eq!(lightbox.mounted()[0].phase, MediaPhase::Shown);
    }

    #[test]
    fn test_focus_trap_wraps() {
        let mut items = collection(1);
        items.append(vec![MediaItem::new(2, MediaType::Video, "/storage/2.mp4")]);
        let mut lightbox = Lightbox::new();
        lightbox.open_at(0, &items, None).unwrap();
        assert_eq!(lightbox.focus(), Some(FocusTarget::Close));
        assert_eq!(lightbox.cycle_focus(false), Some(FocusTarget::Previous));
        assert_eq!(lightbox.cycle_focus(false), Some(FocusTarget::Next));
        assert_eq!(lightbox.cycle_focus(false), Some(FocusTarget::Close));
        assert_eq!(lightbox.cycle_focus(true), Some(FocusTarget::Next));

        lightbox.next(&items);
        assert_eq!(lightbox.cycle_focus(false), Some(FocusTarget::VideoControls));
        assert_eq!(lightbox.cycle_focus(false), Some(FocusTarget::Close));
    }

    #[test]
    fn test_video_playback_toggle_and_pause_on_close() {
        let items = MediaCollection::seeded(vec![MediaItem::new(1, MediaType::Video, "/v.mp4")]);
        let mut lightbox = Lightbox::new();
        lightbox.open_at(0, &items, None).unwrap();
        assert!(!lightbox.mounted()[0].playing);
        assert!(lightbox.toggle_playback());
        assert!(lightbox.mounted()[0].playing);
        lightbox.close();
        assert!(lightbox.mounted().is_empty());
    }

    #[test]
    fn test_sync_follows_item_after_removal() {
        let mut items = collection(4);
        let mut lightbox = Lightbox::new();
        lightbox.open_at(2, &items, None).unwrap();
        items.remove_by_id(1).unwrap();
        lightbox.sync_with(&items);
        assert_eq!(lightbox.current_index(), Some(1));
        assert_eq!(lightbox.current_id(), Some(3));

        items.remove_by_id(3).unwrap();
        items.remove_by_id(4).unwrap();
        lightbox.sync_with(&items);
        assert_eq!(lightbox.current_index(), Some(0));
        assert_eq!(lightbox.current_id(), Some(2));

        items.remove_by_id(2).unwrap();
        lightbox.sync_with(&items);
        assert_eq!(lightbox.state(), LightboxState::Closed);
    }
}
