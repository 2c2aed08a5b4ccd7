pub mod grid;
pub mod keybindings;
pub mod lightbox;
pub mod notice;
pub mod tile;

pub use grid::{GridNode, GridSurface, GroupHeading};
pub use keybindings::{Key, KeyAction, Modifiers, ViewMode};
pub use lightbox::{FocusTarget, Lightbox, LightboxError, LightboxState, MediaElement, MediaPhase};
pub use notice::{Notice, NoticeKind, Notices};
pub use tile::{Badge, PreviewState, Tile, TileEvent, TileMedia, TileTarget};
