//! Headless driver: loads a gallery the way a scrolling user would and prints the
//! resulting column layout.

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::api::{GalleryApi, HttpGalleryApi};
use crate::config::GalleryConfig;
use crate::controllers::{FetchOutcome, PaginationState};
use crate::layout::NodeKey;
use crate::models::{GalleryFilters, MediaType};
use crate::preview::{HttpPreviewSource, LazyObserver, NullObserver, PreviewCache, PreviewLoader};
use crate::view::GalleryView;

/// Consecutive failed page fetches before giving up.
const MAX_FAILURES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct DriverArgs {
    pub config: Option<PathBuf>,
    pub filters: GalleryFilters,
    pub width: f32,
    /// Rows treated as on screen when requesting previews.
    pub visible_rows: usize,
    pub preview_wait_ms: u64,
}

impl Default for DriverArgs {
    fn default() -> Self {
        Self {
            config: None,
            filters: GalleryFilters::default(),
            width: 1280.0,
            visible_rows: 4,
            preview_wait_ms: 2000,
        }
    }
}

pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<DriverArgs> {
    let mut parsed = DriverArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().context("Missing value for --config")?;
                parsed.config = Some(PathBuf::from(value));
            }
            "--show-deleted" => parsed.filters.show_deleted = true,
            "--favorites" => parsed.filters.favorites = true,
            "--type" => {
                let value = args.next().context("Missing value for --type")?;
                parsed.filters.media_type = Some(
                    MediaType::from_str(&value)
                        .with_context(|| format!("Unknown media type `{value}`"))?,
                );
            }
            "--album" => {
                let value = args.next().context("Missing value for --album")?;
                parsed.filters.album_id = Some(
                    value
                        .parse::<i64>()
                        .context("Failed to parse --album as an integer")?,
                );
            }
            "--width" => {
                let value = args.next().context("Missing value for --width")?;
                parsed.width = value
                    .parse::<f32>()
                    .context("Failed to parse --width as a number")?;
            }
            "--visible-rows" => {
                let value = args.next().context("Missing value for --visible-rows")?;
                parsed.visible_rows = value
                    .parse::<usize>()
                    .context("Failed to parse --visible-rows as a non-negative integer")?;
            }
            "--preview-wait-ms" => {
                let value = args.next().context("Missing value for --preview-wait-ms")?;
                parsed.preview_wait_ms = value
                    .parse::<u64>()
                    .context("Failed to parse --preview-wait-ms as a non-negative integer")?;
            }
            other => bail!("Unknown argument `{other}`"),
        }
    }
    Ok(parsed)
}

fn observer(config: &GalleryConfig) -> Result<Box<dyn LazyObserver>> {
    if config.preview_workers == 0 {
        return Ok(Box::new(NullObserver));
    }
    let source = HttpPreviewSource::new(
        config.base_url()?,
        config.request_timeout(),
        config.session_cookie.clone(),
    );
    Ok(Box::new(PreviewLoader::new(
        config.preview_workers,
        PreviewCache::new(config.preview_cache_entries),
        Arc::new(source),
    )))
}

/// Must run inside a `LocalSet`.
pub async fn run(args: DriverArgs) -> Result<()> {
    let config = GalleryConfig::load(args.config.as_deref());
    let api = HttpGalleryApi::new(
        config.base_url()?,
        config.request_timeout(),
        config.session_cookie.as_deref(),
        config.csrf_token.clone(),
    )?;
    let view = GalleryView::new(Rc::new(api), &config, args.filters.clone(), observer(&config)?);
    view.resize(args.width);

    let started = Instant::now();
    load_pages(&view).await?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Gallery loaded");

    view.set_visible_rows(0, args.visible_rows.saturating_sub(1));
    let deadline = Instant::now() + Duration::from_millis(args.preview_wait_ms);
    let mut previews = 0;
    while Instant::now() < deadline {
        previews += view.pump_previews();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    print_summary(&view, previews);
    Ok(())
}

/// Underfill the first screen, then keep the sentinel "visible" until the source runs
/// dry, stops advancing, or keeps failing.
pub async fn load_pages<A: GalleryApi>(view: &GalleryView<A>) -> Result<()> {
    view.start().await;

    let mut failures = 0;
    while view.pagination.state() != PaginationState::Exhausted {
        if view.login_required() {
            break;
        }
        let previous_cursor = view.pagination.cursor();
        match view.sentinel_visible().await {
            FetchOutcome::Failed(err) => {
                failures += 1;
                warn!(failures, error = %err, "Page fetch failed");
                if failures >= MAX_FAILURES {
                    bail!("Giving up after {failures} failed page fetches: {err}");
                }
            }
            FetchOutcome::Skipped => break,
            FetchOutcome::Applied { accepted: 0, .. }
                if view.pagination.cursor() == previous_cursor =>
            {
                warn!(cursor = previous_cursor, "Server cursor stopped advancing; stopping");
                break;
            }
            FetchOutcome::Applied { .. } => failures = 0,
        }
    }
    if view.login_required() {
        bail!("Session expired; set {} to a valid session cookie", crate::config::ENV_SESSION);
    }
    Ok(())
}

fn print_summary<A: GalleryApi>(view: &GalleryView<A>, previews: usize) {
    let store = view.store().borrow();
    let layout = store.grid.layout();
    println!(
        "{} items, {} columns, {} favorites, {} previews loaded",
        store.collection.len(),
        layout.columns(),
        store.favorite_count(),
        previews
    );
    for heading in store.grid.headings() {
        println!("  group: {}", heading.label);
    }
    for (column, stack) in layout.column_contents().iter().enumerate() {
        let ids: Vec<String> = stack
            .iter()
            .filter_map(|key| match key {
                NodeKey::Tile(id) => Some(id.to_string()),
                _ => None,
            })
            .collect();
        println!("  column {column}: {} tiles [{}]", ids.len(), ids.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeApi, Request};
    use serde_json::json;

    fn fake_view(api: &Rc<FakeApi>) -> GalleryView<FakeApi> {
        let config = GalleryConfig {
            page_size: 3,
            ..GalleryConfig::default()
        };
        let view = GalleryView::new(
            Rc::clone(api),
            &config,
            GalleryFilters::default(),
            Box::new(NullObserver),
        );
        view.resize(1000.0);
        view
    }

    fn page_offsets(api: &FakeApi) -> Vec<u64> {
        api.requests()
            .into_iter()
            .filter_map(|request| match request {
                Request::Page { offset, .. } => Some(offset),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_load_pages_until_exhausted() {
        let api = Rc::new(FakeApi::new());
        api.push_page_json(json!({"files": [{"id": 1}, {"id": 2}, {"id": 3}], "next_offset": 3}))
            .push_page_json(json!({"files": [{"id": 4}], "next_offset": 4}))
            .push_page_json(json!({"files": [{"id": 5}], "next_offset": null}));
        let view = fake_view(&api);

        load_pages(&view).await.unwrap();
        assert_eq!(view.pagination.state(), PaginationState::Exhausted);
        assert_eq!(page_offsets(&api), vec![0, 3, 4]);
        assert_eq!(view.store().borrow().collection.len(), 5);
    }

    #[tokio::test]
    async fn test_load_pages_stops_when_cursor_repeats() {
        let api = Rc::new(FakeApi::new());
        api.push_page_json(json!({"files": [{"id": 1}, {"id": 2}], "next_offset": 2}))
            .push_page_json(json!({"files": [], "next_offset": 2}))
            .push_page_json(json!({"files": [], "next_offset": 2}))
            .push_page_json(json!({"files": [], "next_offset": 2}));
        let view = fake_view(&api);

        load_pages(&view).await.unwrap();
        assert_eq!(page_offsets(&api), vec![0, 2, 2]);
        assert_eq!(view.pagination.state(), PaginationState::Idle);
        assert_eq!(view.store().borrow().collection.len(), 2);
    }

    #[tokio::test]
    async fn test_load_pages_gives_up_after_repeated_failures() {
        let api = Rc::new(FakeApi::new());
        let view = fake_view(&api);
        assert!(load_pages(&view).await.is_err());
        assert_eq!(page_offsets(&api), vec![0; MAX_FAILURES + 1]);
    }

    fn args(list: &[&str]) -> Result<DriverArgs> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_filters_and_width() {
        let parsed = args(&["--favorites", "--type", "video", "--width", "960", "--album", "3"]).unwrap();
        assert!(parsed.filters.favorites);
        assert_eq!(parsed.filters.media_type, Some(MediaType::Video));
        assert_eq!(parsed.filters.album_id, Some(3));
        assert_eq!(parsed.width, 960.0);
        assert!(parsed.config.is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(args(&["--width"]).is_err());
        assert!(args(&["--type", "audio"]).is_err());
        assert!(args(&["--bogus"]).is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(args(&[]).unwrap(), DriverArgs::default());
    }
}
