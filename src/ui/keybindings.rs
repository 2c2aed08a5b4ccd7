// Keybindings for the gallery grid and lightbox
// Maps toolkit-neutral key presses to actions; the view decides what they do.
//
// Keybindings:
// - Escape: Close lightbox
// - ArrowLeft / ArrowRight (h / l): Previous / next item, or move grid focus
// - ArrowUp / ArrowDown (k / j): Move grid focus one row
// - Tab / Shift+Tab: Cycle focus inside the lightbox (focus trap)
// - Enter: Open lightbox on the focused tile
// - Space: Toggle selection of focused tile, or play/pause video in the lightbox
// - +: Toggle favorite

/// Key identity as delivered by the host toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Tab,
    Enter,
    Space,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
    };
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
    };
}

/// Current view mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Grid,
    Lightbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    CloseLightbox,
    Next,
    Previous,
    /// Focus trap step; `backwards` for Shift+Tab.
    CycleFocus { backwards: bool },
    TogglePlayback,
    /// Move grid focus by this many tiles.
    MoveFocus(isize),
    /// Move grid focus by this many rows; the view scales by the column count.
    MoveFocusRows(isize),
    OpenFocused,
    ToggleFocusedSelection,
    ToggleFavorite,
}

/// Resolve a key press for the given mode. `None` means the key is not handled and
/// should propagate.
pub fn resolve(mode: ViewMode, key: Key, modifiers: Modifiers) -> Option<KeyAction> {
    if modifiers.ctrl {
        return None;
    }

    // Favorite toggle works in both modes
    if matches!(key, Key::Char('+') | Key::Char('=')) {
        return Some(KeyAction::ToggleFavorite);
    }

    match mode {
        ViewMode::Lightbox => match key {
            Key::Escape => Some(KeyAction::CloseLightbox),
            Key::ArrowRight | Key::Char('l') => Some(KeyAction::Next),
            Key::ArrowLeft | Key::Char('h') => Some(KeyAction::Previous),
            Key::Tab => Some(KeyAction::CycleFocus {
                backwards: modifiers.shift,
            }),
            Key::Space => Some(KeyAction::TogglePlayback),
            _ => None,
        },
        ViewMode::Grid => match key {
            Key::ArrowRight | Key::Char('l') => Some(KeyAction::MoveFocus(1)),
            Key::ArrowLeft | Key::Char('h') => Some(KeyAction::MoveFocus(-1)),
            Key::ArrowDown | Key::Char('j') => Some(KeyAction::MoveFocusRows(1)),
            Key::ArrowUp | Key::Char('k') => Some(KeyAction::MoveFocusRows(-1)),
            Key::Enter => Some(KeyAction::OpenFocused),
            Key::Space => Some(KeyAction::ToggleFocusedSelection),
            _ => None,
        },
    }
}
