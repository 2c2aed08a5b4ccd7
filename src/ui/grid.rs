//! Retained grid surface.
//!
//! Ordered nodes (tiles, group headings, loading skeletons) mirrored by the host
//! toolkit, plus the masonry placement of those nodes. Every mutation path ends in an
//! explicit layout notification; nothing is inferred by observing the node list.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace};

use crate::layout::{MasonryLayout, NodeKey};
use crate::models::{days_left_label, MediaItem};
use crate::preview::{LazyObserver, NullObserver};
use crate::ui::tile::Tile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHeading {
    pub days: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridNode {
    Tile(Tile),
    Heading(GroupHeading),
    Skeleton(u32),
}

impl GridNode {
    pub fn key(&self) -> NodeKey {
        match self {
            Self::Tile(tile) => NodeKey::Tile(tile.id),
            Self::Heading(heading) => NodeKey::Heading(heading.days),
            Self::Skeleton(slot) => NodeKey::Skeleton(*slot),
        }
    }
}

/// How the node list changed since the last layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayoutChange {
    /// `n` nodes were pushed at the end.
    Appended(usize),
    /// Anything else: rebuild from scratch.
    Rebuilt,
}

pub struct GridSurface {
    nodes: Vec<GridNode>,
    layout: MasonryLayout,
    observer: Box<dyn LazyObserver>,
    show_deleted: bool,
    /// Ids checked before their tile exists (select-all over the whole filter scope).
    preselected: BTreeSet<i64>,
    near_viewport_rows: usize,
    visible_rows: (usize, usize),
    end_reached: bool,
    focused: Option<i64>,
    rebuilds: usize,
}

impl std::fmt::Debug for GridSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridSurface")
            .field("nodes", &self.nodes.len())
            .field("columns", &self.layout.columns())
            .field("show_deleted", &self.show_deleted)
            .field("preselected", &self.preselected.len())
            .field("observer", &"<observer>")
            .finish()
    }
}

impl GridSurface {
    pub fn new(
        layout: MasonryLayout,
        observer: Box<dyn LazyObserver>,
        show_deleted: bool,
        near_viewport_rows: usize,
    ) -> Self {
        Self {
            nodes: Vec::new(),
            layout,
            observer,
            show_deleted,
            preselected: BTreeSet::new(),
            near_viewport_rows,
            visible_rows: (0, 0),
            end_reached: false,
            focused: None,
            rebuilds: 0,
        }
    }

    /// Grid without lazy previews, for hosts that load media themselves.
    pub fn headless(layout: MasonryLayout, show_deleted: bool) -> Self {
        Self::new(layout, Box::new(NullObserver), show_deleted, 0)
    }

    pub fn show_deleted(&self) -> bool {
        self.show_deleted
    }

    pub fn layout(&self) -> &MasonryLayout {
        &self.layout
    }

    pub fn nodes(&self) -> &[GridNode] {
        &self.nodes
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.nodes.iter().filter_map(|node| match node {
            GridNode::Tile(tile) => Some(tile),
            _ => None,
        })
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    pub fn tile_ids(&self) -> Vec<i64> {
        self.tiles().map(|tile| tile.id).collect()
    }

    pub fn tile(&self, id: i64) -> Option<&Tile> {
        self.tiles().find(|tile| tile.id == id)
    }

    pub fn tile_mut(&mut self, id: i64) -> Option<&mut Tile> {
        self.nodes.iter_mut().find_map(|node| match node {
            GridNode::Tile(tile) if tile.id == id => Some(tile),
            _ => None,
        })
    }

    pub fn headings(&self) -> Vec<&GroupHeading> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                GridNode::Heading(heading) => Some(heading),
                _ => None,
            })
            .collect()
    }

    pub fn skeleton_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, GridNode::Skeleton(_)))
            .count()
    }

    /// Materialize accepted items at the end of the grid.
    ///
    /// `start_index` is the collection length before the append. In the deleted view a
    /// full-width heading is inserted whenever the retention bucket changes.
    pub fn materialize(&mut self, items: &[MediaItem], start_index: usize) {
        if items.is_empty() {
            return;
        }
        let before = self.nodes.len();
        let mut last_heading = self.last_heading_days();

        for (offset, item) in items.iter().enumerate() {
            if self.show_deleted {
                let days = item.retention_days();
                if last_heading != Some(days) {
                    self.nodes.push(GridNode::Heading(GroupHeading {
                        days,
                        label: days_left_label(days),
                    }));
                    last_heading = Some(days);
                }
            }

            let mut tile = Tile::materialize(
                item,
                start_index + offset,
                self.show_deleted,
                self.observer.as_mut(),
            );
            if self.preselected.remove(&item.id) {
                tile.set_checked(true);
            }
            self.nodes.push(GridNode::Tile(tile));
        }

        let added = self.nodes.len() - before;
        trace!(added, "Materialized tiles");
        self.notify_layout(LayoutChange::Appended(added));
        self.request_near_viewport();
    }

    /// Placeholders at the end of the grid, placed with the same modulo rule so their
    /// later removal leaves real tiles where they are.
    pub fn insert_skeletons(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        for slot in 0..count {
            self.nodes.push(GridNode::Skeleton(slot as u32));
        }
        self.notify_layout(LayoutChange::Appended(count));
    }

    pub fn remove_skeletons(&mut self) {
        let before = self.nodes.len();
        self.nodes
            .retain(|node| !matches!(node, GridNode::Skeleton(_)));
        if self.nodes.len() != before {
            self.notify_layout(LayoutChange::Rebuilt);
        }
    }

    /// Remove one tile; a heading left without tiles goes with it.
    pub fn remove_tile(&mut self, id: i64) -> bool {
        self.remove_tiles(&[id]) > 0
    }

    /// Remove a batch of tiles in one pass with a single relayout. Returns how many
    /// tiles were present.
    pub fn remove_tiles(&mut self, ids: &[i64]) -> usize {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        for id in &wanted {
            self.preselected.remove(id);
        }
        let before = self.nodes.len();
        self.nodes
            .retain(|node| !matches!(node, GridNode::Tile(tile) if wanted.contains(&tile.id)));
        let removed = before - self.nodes.len();
        if removed == 0 {
            return 0;
        }

        for id in &wanted {
            self.observer.unobserve(*id);
        }
        if self.focused.is_some_and(|id| wanted.contains(&id)) {
            self.focused = None;
        }
        self.drop_orphan_headings();
        self.notify_layout(LayoutChange::Rebuilt);
        debug!(removed, "Removed tiles");
        removed
    }

    /// Update deleted badges for the tiles in `flags` in one pass.
    pub fn set_deleted_flags(&mut self, flags: &HashMap<i64, bool>) {
        let show_deleted = self.show_deleted;
        for node in &mut self.nodes {
            if let GridNode::Tile(tile) = node {
                if let Some(deleted) = flags.get(&tile.id) {
                    tile.set_deleted(*deleted, show_deleted);
                }
            }
        }
    }

    /// Full layout passes run so far.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Apply a viewport width; a changed column count rebuilds the layout from scratch.
    pub fn resize(&mut self, available_width: f32) -> bool {
        if self.layout.set_width(available_width) {
            self.rebuilds += 1;
            self.request_near_viewport();
            return true;
        }
        false
    }

    // ---- selection ----

    pub fn set_checked(&mut self, id: i64, checked: bool) -> bool {
        match self.tile_mut(id) {
            Some(tile) => {
                tile.set_checked(checked);
                true
            }
            None => false,
        }
    }

    /// Check ids, remembering the ones not materialized yet.
    pub fn check_ids(&mut self, ids: &[i64]) {
        let mut pending: HashSet<i64> = ids.iter().copied().collect();
        for node in &mut self.nodes {
            if let GridNode::Tile(tile) = node {
                if pending.remove(&tile.id) {
                    tile.set_checked(true);
                }
            }
        }
        self.preselected.extend(pending);
    }

    pub fn uncheck_ids(&mut self, ids: &[i64]) {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        for node in &mut self.nodes {
            if let GridNode::Tile(tile) = node {
                if wanted.contains(&tile.id) {
                    tile.set_checked(false);
                }
            }
        }
        self.preselected.retain(|id| !wanted.contains(id));
    }

    pub fn clear_selection(&mut self) {
        for node in &mut self.nodes {
            if let GridNode::Tile(tile) = node {
                tile.set_checked(false);
            }
        }
        self.preselected.clear();
    }

    /// Current selection, read from tile checkboxes plus pending preselection.
    pub fn checked_ids(&self) -> BTreeSet<i64> {
        self.tiles()
            .filter(|tile| tile.is_checked())
            .map(|tile| tile.id)
            .chain(self.preselected.iter().copied())
            .collect()
    }

    pub fn all_materialized_checked(&self) -> bool {
        let mut any = false;
        for tile in self.tiles() {
            if !tile.is_checked() {
                return false;
            }
            any = true;
        }
        any
    }

    // ---- focus ----

    pub fn focused(&self) -> Option<i64> {
        self.focused
    }

    pub fn focus_tile(&mut self, id: i64) -> bool {
        if self.tile(id).is_none() {
            return false;
        }
        for node in &mut self.nodes {
            if let GridNode::Tile(tile) = node {
                tile.focused = tile.id == id;
            }
        }
        self.focused = Some(id);
        true
    }

    /// Move focus by `delta` tiles in grid order, clamped at both ends.
    pub fn move_focus(&mut self, delta: isize) -> Option<i64> {
        let ids = self.tile_ids();
        if ids.is_empty() {
            return None;
        }
        let current = self
            .focused
            .and_then(|id| ids.iter().position(|candidate| *candidate == id));
        let target = match current {
            Some(pos) => (pos as isize + delta).clamp(0, ids.len() as isize - 1) as usize,
            None => 0,
        };
        let id = ids[target];
        self.focus_tile(id);
        Some(id)
    }

    // ---- viewport ----

    pub fn end_reached(&self) -> bool {
        self.end_reached
    }

    pub fn set_end_reached(&mut self, reached: bool) {
        self.end_reached = reached;
    }

    /// Report the rows currently on screen; tiles within the margin get their previews.
    pub fn set_visible_rows(&mut self, first: usize, last: usize) {
        self.visible_rows = (first, last.max(first));
        self.request_near_viewport();
    }

    /// Apply finished preview loads. Returns how many tiles changed.
    pub fn pump_previews(&mut self) -> usize {
        let results = self.observer.poll();
        let mut applied = 0;
        for result in results {
            if let Some(tile) = self.tile_mut(result.id) {
                tile.set_preview(&result.outcome);
                applied += 1;
            }
        }
        applied
    }

    fn request_near_viewport(&mut self) {
        let (first, last) = self.visible_rows;
        let margin = self.near_viewport_rows;
        let ids = self
            .layout
            .tiles_in_rows(first.saturating_sub(margin), last.saturating_add(margin));
        if !ids.is_empty() {
            self.observer.request_visible(&ids);
        }
    }

    fn last_heading_days(&self) -> Option<u32> {
        self.nodes.iter().rev().find_map(|node| match node {
            GridNode::Heading(heading) => Some(heading.days),
            _ => None,
        })
    }

    fn drop_orphan_headings(&mut self) {
        let mut keep = vec![true; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            if let GridNode::Heading(_) = node {
                let has_tile = self.nodes[index + 1..]
                    .iter()
                    .take_while(|next| !matches!(next, GridNode::Heading(_)))
                    .any(|next| matches!(next, GridNode::Tile(_)));
                keep[index] = has_tile;
            }
        }
        let mut flags = keep.into_iter();
        self.nodes.retain(|_| flags.next().unwrap_or(true));
    }

    fn notify_layout(&mut self, change: LayoutChange) {
        match change {
            LayoutChange::Appended(count) => {
                let start = self.nodes.len().saturating_sub(count);
                let keys: Vec<NodeKey> = self.nodes[start..].iter().map(GridNode::key).collect();
                self.layout.append(&keys);
            }
            LayoutChange::Rebuilt => {
                self.rebuilds += 1;
                let keys: Vec<NodeKey> = self.nodes.iter().map(GridNode::key).collect();
                self.layout.relayout(&keys);
            }
        }
    }
}
