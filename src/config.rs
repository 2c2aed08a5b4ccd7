use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use reqwest::Url;
use serde::Deserialize;
use tracing::{info, warn};

use crate::controllers::PaginationSettings;
use crate::layout::LayoutMode;

pub const CONFIG_FILE: &str = "config.json";
pub const ENV_BASE_URL: &str = "GALLERY_BASE_URL";
pub const ENV_SESSION: &str = "GALLERY_SESSION";

#[derive(Clone, Debug, PartialEq)]
pub struct GalleryConfig {
    pub base_url: String,
    pub page_size: usize,
    pub event_id: Option<i64>,
    pub target_column_width: f32,
    pub layout_mode: LayoutMode,
    pub scroll_threshold_px: f64,
    pub skeleton_count: usize,
    pub near_viewport_rows: usize,
    /// 0 disables lazy previews.
    pub preview_workers: usize,
    pub preview_cache_entries: usize,
    pub request_timeout_secs: u64,
    pub notice_ttl_ms: u64,
    pub session_cookie: Option<String>,
    pub csrf_token: Option<String>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            page_size: 60,
            event_id: None,
            target_column_width: 240.0,
            layout_mode: LayoutMode::Masonry,
            scroll_threshold_px: 800.0,
            skeleton_count: 8,
            near_viewport_rows: 3,
            preview_workers: 2,
            preview_cache_entries: 512,
            request_timeout_secs: 20,
            notice_ttl_ms: 4000,
            session_cookie: None,
            csrf_token: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    base_url: Option<String>,
    page_size: Option<usize>,
    event_id: Option<i64>,
    target_column_width: Option<f32>,
    layout_mode: Option<String>,
    scroll_threshold_px: Option<f64>,
    skeleton_count: Option<usize>,
    near_viewport_rows: Option<usize>,
    preview_workers: Option<usize>,
    preview_cache_entries: Option<usize>,
    request_timeout_secs: Option<u64>,
    notice_ttl_ms: Option<u64>,
    session_cookie: Option<String>,
    csrf_token: Option<String>,
}

fn parse_layout_mode(s: &str) -> Option<LayoutMode> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "masonry" | "columns" => Some(LayoutMode::Masonry),
        "flow" | "list" | "single" => Some(LayoutMode::Flow),
        _ => None,
    }
}

impl GalleryConfig {
    /// `$XDG_CONFIG_HOME/gallery-view/config.json`.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "gallery-view")
            .context("Failed to determine project directories")?;
        Ok(dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from `path` or the default location, then apply environment overrides.
    ///
    /// A missing file means defaults; a malformed one is logged and ignored.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => match Self::default_path() {
                Ok(path) => Some(path),
                Err(err) => {
                    warn!("No config directory ({err:#}); using defaults");
                    None
                }
            },
        };
        let mut cfg = path
            .as_deref()
            .map(Self::from_file)
            .unwrap_or_default();
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    pub fn from_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match Self::from_json(&raw) {
                Ok(cfg) => {
                    info!("Loaded config from {}", path.display());
                    cfg
                }
                Err(err) => {
                    warn!("Failed to parse {} ({err:#}). Using defaults.", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: RawConfig = serde_json::from_str(raw).context("Invalid config JSON")?;
        let mut cfg = Self::default();

        if let Some(url) = parsed.base_url.filter(|u| !u.trim().is_empty()) {
            cfg.base_url = url;
        }
        if let Some(size) = parsed.page_size.filter(|n| *n > 0) {
            cfg.page_size = size;
        }
        cfg.event_id = parsed.event_id;
        if let Some(width) = parsed.target_column_width {
            if width.is_finite() && width > 0.0 {
                cfg.target_column_width = width;
            } else {
                warn!("Ignoring target_column_width {width}");
            }
        }
        if let Some(mode) = parsed.layout_mode {
            match parse_layout_mode(&mode) {
                Some(mode) => cfg.layout_mode = mode,
                None => warn!("Unknown layout_mode `{mode}`; falling back to masonry."),
            }
        }
        if let Some(threshold) = parsed.scroll_threshold_px {
            cfg.scroll_threshold_px = threshold.max(0.0);
        }
        if let Some(count) = parsed.skeleton_count {
            cfg.skeleton_count = count;
        }
        if let Some(rows) = parsed.near_viewport_rows {
            cfg.near_viewport_rows = rows;
        }
        if let Some(workers) = parsed.preview_workers {
            cfg.preview_workers = workers;
        }
        if let Some(entries) = parsed.preview_cache_entries.filter(|n| *n > 0) {
            cfg.preview_cache_entries = entries;
        }
        if let Some(secs) = parsed.request_timeout_secs.filter(|n| *n > 0) {
            cfg.request_timeout_secs = secs;
        }
        if let Some(ttl) = parsed.notice_ttl_ms {
            cfg.notice_ttl_ms = ttl;
        }
        if parsed.session_cookie.is_some() {
            cfg.session_cookie = parsed.session_cookie;
        }
        if parsed.csrf_token.is_some() {
            cfg.csrf_token = parsed.csrf_token;
        }
        Ok(cfg)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(session) = lookup(ENV_SESSION).filter(|v| !v.trim().is_empty()) {
            self.session_cookie = Some(session);
        }
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("Invalid base_url: {}", self.base_url))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    pub fn pagination(&self) -> PaginationSettings {
        PaginationSettings {
            page_size: self.page_size,
            skeleton_count: self.skeleton_count,
            scroll_threshold_px: self.scroll_threshold_px,
        }
    }
}
