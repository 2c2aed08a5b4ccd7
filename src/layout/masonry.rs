use std::collections::HashMap;

use tracing::debug;

/// Column count bounds for the masonry grid.
pub const MIN_COLUMNS: usize = 1;
pub const MAX_COLUMNS: usize = 5;

/// Identity of a node placed by the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// A materialized media tile, keyed by item id.
    Tile(i64),
    /// A loading placeholder; the payload is its slot number within the current fetch.
    Skeleton(u32),
    /// A full-width group heading; the payload is the retention bucket in days.
    Heading(u32),
}

impl NodeKey {
    /// Breaks span the full width and take no part in the modulo sequence.
    pub fn is_break(&self) -> bool {
        matches!(self, Self::Heading(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutBlock {
    /// A run of media nodes split into `columns` vertical stacks.
    Columns(Vec<Vec<NodeKey>>),
    /// A full-width break between column runs.
    Break(NodeKey),
}

/// Where a media node ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Position among media nodes only (breaks excluded).
    pub media_index: usize,
    pub column: usize,
    pub row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Modulo column assignment.
    #[default]
    Masonry,
    /// Single column flow, for hosts that do not render columns.
    Flow,
}

/// Number of columns that fit `available_width`, clamped to `[1, 5]`.
pub fn column_count(available_width: f32, target_column_width: f32) -> usize {
    let usable = |v: f32| v.is_finite() && v > 0.0;
    if !usable(available_width) || !usable(target_column_width) {
        return MIN_COLUMNS;
    }
    let fit = (available_width / target_column_width).floor() as usize;
    fit.clamp(MIN_COLUMNS, MAX_COLUMNS)
}

/// Column of the media node at `index`. Pure in `(index, columns)`.
pub fn column_for(index: usize, columns: usize) -> usize {
    index % columns.max(MIN_COLUMNS)
}

/// Deterministic column layout.
///
/// Placement never depends on measured heights: a node's column is a function of its
/// media index and the column count only, so late-decoding images never reshuffle the
/// grid. A column count change discards everything and redistributes from scratch.
#[derive(Debug, Clone)]
pub struct MasonryLayout {
    pub mode: LayoutMode,
    pub target_column_width: f32,
    columns: usize,
    blocks: Vec<LayoutBlock>,
    placements: HashMap<NodeKey, Placement>,
    media_count: usize,
}

impl Default for MasonryLayout {
    fn default() -> Self {
        Self::new(LayoutMode::Masonry, 240.0)
    }
}

impl MasonryLayout {
    pub fn new(mode: LayoutMode, target_column_width: f32) -> Self {
        Self {
            mode,
            target_column_width,
            columns: MIN_COLUMNS,
            blocks: Vec::new(),
            placements: HashMap::new(),
            media_count: 0,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn blocks(&self) -> &[LayoutBlock] {
        &self.blocks
    }

    pub fn placement(&self, key: &NodeKey) -> Option<Placement> {
        self.placements.get(key).copied()
    }

    pub fn media_count(&self) -> usize {
        self.media_count
    }

    /// Column count for a viewport width under the current mode.
    pub fn columns_for_width(&self, available_width: f32) -> usize {
        match self.mode {
            LayoutMode::Masonry => column_count(available_width, self.target_column_width),
            LayoutMode::Flow => MIN_COLUMNS,
        }
    }

    /// Adopts the column count for `available_width`.
    ///
    /// Returns true when the count changed, in which case every node already placed is
    /// redistributed over the new columns in its original order.
    pub fn set_width(&mut self, available_width: f32) -> bool {
        let columns = self.columns_for_width(available_width);
        if columns == self.columns {
            return false;
        }
        debug!(from = self.columns, to = columns, "Column count changed");
        let keys = self.sequence();
        self.columns = columns;
        self.relayout(&keys);
        true
    }

    /// Placed nodes in the order they were laid out.
    pub fn sequence(&self) -> Vec<NodeKey> {
        let mut keys = Vec::with_capacity(self.placements.len() + self.blocks.len());
        for block in &self.blocks {
            match block {
                LayoutBlock::Break(key) => keys.push(*key),
                LayoutBlock::Columns(stacks) => {
                    let mut run: Vec<(usize, NodeKey)> = stacks
                        .iter()
                        .flatten()
                        .filter_map(|key| {
                            self.placements.get(key).map(|placement| (placement.media_index, *key))
                        })
                        .collect();
                    run.sort_unstable_by_key(|(media_index, _)| *media_index);
                    keys.extend(run.into_iter().map(|(_, key)| key));
                }
            }
        }
        keys
    }

    /// Full recompute: `columns` empty stacks, every node redistributed in order.
    pub fn relayout(&mut self, keys: &[NodeKey]) {
        self.blocks.clear();
        self.placements.clear();
        self.media_count = 0;
        self.append(keys);
    }

    /// Places nodes after everything already laid out.
    pub fn append(&mut self, keys: &[NodeKey]) {
        let columns = self.columns.max(MIN_COLUMNS);
        for key in keys {
            if key.is_break() {
                self.blocks.push(LayoutBlock::Break(*key));
                continue;
            }

            let media_index = self.media_count;
            let column = column_for(media_index, columns);
            let placement = Placement {
                media_index,
                column,
                row: media_index / columns,
            };

            if !matches!(
                self.blocks.last(),
                Some(LayoutBlock::Columns(stacks)) if stacks.len() == columns
            ) {
                self.blocks.push(LayoutBlock::Columns(vec![Vec::new(); columns]));
            }
            if let Some(LayoutBlock::Columns(stacks)) = self.blocks.last_mut() {
                stacks[column].push(*key);
            }
            self.placements.insert(*key, placement);
            self.media_count += 1;
        }
    }

    /// Tile ids whose row falls in `[first_row, last_row]`.
    pub fn tiles_in_rows(&self, first_row: usize, last_row: usize) -> Vec<i64> {
        let mut hits: Vec<(usize, i64)> = self
            .placements
            .iter()
            .filter_map(|(key, placement)| match key {
                NodeKey::Tile(id) if (first_row..=last_row).contains(&placement.row) => {
                    Some((placement.media_index, *id))
                }
                _ => None,
            })
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// Contents of each column across all blocks, top to bottom.
    pub fn column_contents(&self) -> Vec<Vec<NodeKey>> {
        let mut out = vec![Vec::new(); self.columns.max(MIN_COLUMNS)];
        for block in &self.blocks {
            if let LayoutBlock::Columns(stacks) = block {
                for (column, stack) in stacks.iter().enumerate() {
                    out[column].extend(stack.iter().copied());
                }
            }
        }
        out
    }
}
