pub mod masonry;

pub use masonry::{
    column_count, column_for, LayoutBlock, LayoutMode, MasonryLayout, NodeKey, Placement,
    MAX_COLUMNS, MIN_COLUMNS,
};
