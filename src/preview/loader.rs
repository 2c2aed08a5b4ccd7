//! Preview worker queue.
//!
//! - Bounded worker pool fetching preview bytes off the main thread
//! - Only tiles reported near the viewport are requested
//! - Results flow back over flume and are drained by the grid on its own schedule

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flume::{Receiver, RecvTimeoutError, Sender, TrySendError};
use image::ImageReader;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::Url;
use tracing::{debug, trace, warn};

use super::cache::{CachedPreview, PreviewCache};
use super::{LazyObserver, PreviewResult};

/// Maximum number of worker threads.
const MAX_WORKERS: usize = 4;

/// Maximum number of pending requests in the queue.
const MAX_QUEUE_SIZE: usize = 256;

/// Results handed to the grid per poll, so one poll never stalls input handling.
const MAX_RESULTS_PER_POLL: usize = 32;

/// How often idle workers check the shutdown flag.
const WORKER_POLL_MS: u64 = 100;

/// Where preview bytes come from.
pub trait PreviewSource: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches previews over HTTP relative to the gallery origin.
///
/// The blocking client is built lazily on the first fetch, which always happens on a
/// worker thread and never inside the async runtime.
pub struct HttpPreviewSource {
    base: Url,
    timeout: Duration,
    session_cookie: Option<String>,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpPreviewSource {
    pub fn new(base: Url, timeout: Duration, session_cookie: Option<String>) -> Self {
        Self {
            base,
            timeout,
            session_cookie,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("image/avif,image/webp,image/*;q=0.8,*/*;q=0.5"),
        );
        if let Some(cookie) = &self.session_cookie {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(cookie).context("Invalid session cookie")?,
            );
        }
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("gallery-view/", env!("CARGO_PKG_VERSION"), " preview"))
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build preview HTTP client")?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl PreviewSource for HttpPreviewSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let target = self
            .base
            .join(url)
            .with_context(|| format!("Invalid preview url: {url}"))?;
        let response = self
            .client()?
            .get(target)
            .send()
            .with_context(|| format!("Failed to fetch preview: {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("Preview {url} returned {status}");
        }
        let bytes = response
            .bytes()
            .with_context(|| format!("Failed to read preview body: {url}"))?;
        Ok(bytes.to_vec())
    }
}

/// Read intrinsic dimensions from encoded image bytes without a full decode.
pub fn decode_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to guess image format")?;
    reader
        .into_dimensions()
        .context("Failed to read preview dimensions")
}

#[derive(Debug, Clone)]
struct PreviewRequest {
    id: i64,
    url: String,
}

/// Worker pool plus the registry of observed tiles.
pub struct PreviewLoader {
    request_tx: Option<Sender<PreviewRequest>>,
    result_rx: Receiver<PreviewResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    cache: PreviewCache,
    /// Observed tiles and their preview source.
    registered: HashMap<i64, String>,
    /// Tiles already queued or finished; not requested again.
    requested: HashSet<i64>,
}

impl PreviewLoader {
    pub fn new(workers: usize, cache: PreviewCache, source: Arc<dyn PreviewSource>) -> Self {
        let num_workers = workers.clamp(1, MAX_WORKERS);

        let (request_tx, request_rx) = flume::bounded(MAX_QUEUE_SIZE);
        let (result_tx, result_rx) = flume::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let cache = cache.clone();
            let source = Arc::clone(&source);

            let spawned = thread::Builder::new()
                .name(format!("preview-worker-{}", worker_id))
                .spawn(move || worker_loop(worker_id, rx, tx, shutdown, cache, source));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => warn!(worker_id, error = %err, "Failed to spawn preview worker"),
            }
        }

        debug!(num_workers = handles.len(), "Started preview worker queue");

        Self {
            request_tx: Some(request_tx),
            result_rx,
            workers: handles,
            shutdown,
            cache,
            registered: HashMap::new(),
            requested: HashSet::new(),
        }
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    pub fn is_requested(&self, id: i64) -> bool {
        self.requested.contains(&id)
    }

    /// Block until a result arrives. Used by the headless driver and tests.
    pub fn wait_for_result(&mut self, timeout: Duration) -> Option<PreviewResult> {
        loop {
            let result = self.result_rx.recv_timeout(timeout).ok()?;
            if self.registered.contains_key(&result.id) {
                return Some(result);
            }
        }
    }
}

impl LazyObserver for PreviewLoader {
    fn observe(&mut self, id: i64, url: &str) {
        self.registered.insert(id, url.to_string());
    }

    fn unobserve(&mut self, id: i64) {
        self.registered.remove(&id);
        self.requested.remove(&id);
    }

    fn request_visible(&mut self, ids: &[i64]) {
        let Some(tx) = &self.request_tx else {
            return;
        };
        for id in ids {
            if self.requested.contains(id) {
                continue;
            }
            let Some(url) = self.registered.get(id) else {
                continue;
            };
            match tx.try_send(PreviewRequest {
                id: *id,
                url: url.clone(),
            }) {
                Ok(()) => {
                    self.requested.insert(*id);
                }
                Err(TrySendError::Full(_)) => {
                    // Picked up again on the next viewport report.
                    trace!(id, "Preview queue full");
                    break;
                }
                Err(TrySendError::Disconnected(_)) => {
                    warn!("Preview workers are gone");
                    break;
                }
            }
        }
    }

    fn poll(&mut self) -> Vec<PreviewResult> {
        self.result_rx
            .try_iter()
            .take(MAX_RESULTS_PER_POLL)
            .filter(|result| self.registered.contains_key(&result.id))
            .collect()
    }
}

impl Drop for PreviewLoader {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.request_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    rx: Receiver<PreviewRequest>,
    tx: Sender<PreviewResult>,
    shutdown: Arc<AtomicBool>,
    cache: PreviewCache,
    source: Arc<dyn PreviewSource>,
) {
    trace!(worker_id, "Preview worker started");
    while !shutdown.load(Ordering::Relaxed) {
        let request = match rx.recv_timeout(Duration::from_millis(WORKER_POLL_MS)) {
            Ok(request) => request,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let outcome = load_preview(&request.url, &cache, source.as_ref()).map_err(|err| {
            debug!(id = request.id, url = %request.url, error = %err, "Preview failed");
            format!("{err:#}")
        });
        if tx
            .send(PreviewResult {
                id: request.id,
                outcome,
            })
            .is_err()
        {
            break;
        }
    }
    trace!(worker_id, "Preview worker stopped");
}

fn load_preview(url: &str, cache: &PreviewCache, source: &dyn PreviewSource) -> Result<(u32, u32)> {
    if let Some(hit) = cache.get(url) {
        return Ok((hit.width, hit.height));
    }
    let bytes = source.fetch(url)?;
    let (width, height) = decode_dimensions(&bytes)?;
    cache.insert(url, CachedPreview::new(width, height, bytes));
    Ok((width, height))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use parking_lot::Mutex;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// Serves a PNG for urls containing "ok", fails everything else.
    #[derive(Default)]
    pub(crate) struct StaticSource {
        pub fetched: Mutex<Vec<String>>,
    }

    impl PreviewSource for StaticSource {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.fetched.lock().push(url.to_string());
            if url.contains("ok") {
                Ok(png_bytes(6, 4))
            } else {
                bail!("404 for {url}")
            }
        }
    }

    fn drain_all(loader: &mut PreviewLoader, expected: usize) -> Vec<PreviewResult> {
        let mut out = Vec::new();
        while out.len() < expected {
            match loader.wait_for_result(Duration::from_secs(5)) {
                Some(result) => out.push(result),
                None => break,
            }
        }
        out.sort_by_key(|r| r.id);
        out
    }

    #[test]
    fn test_decode_dimensions() {
        assert_eq!(decode_dimensions(&png_bytes(3, 2)).unwrap(), (3, 2));
        assert!(decode_dimensions(b"not an image").is_err());
    }

    #[test]
    fn test_only_visible_tiles_are_fetched() {
        let source = Arc::new(StaticSource::default());
        let mut loader = PreviewLoader::new(2, PreviewCache::new(8), source.clone());
        loader.observe(1, "/thumbs/ok-1.jpg");
        loader.observe(2, "/thumbs/ok-2.jpg");
        loader.observe(3, "/thumbs/ok-3.jpg");

        loader.request_visible(&[1, 2]);
        let results = drain_all(&mut loader, 2);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].outcome, Ok((6, 4)));
        assert!(!loader.is_requested(3));
        assert_eq!(source.fetched.lock().len(), 2);
        assert_eq!(loader.cache().len(), 2);
    }

    #[test]
    fn test_failure_is_reported_not_fatal() {
        let source = Arc::new(StaticSource::default());
        let mut loader = PreviewLoader::new(1, PreviewCache::new(8), source);
        loader.observe(9, "/thumbs/missing.jpg");
        loader.request_visible(&[9]);

        let results = drain_all(&mut loader, 1);
        assert_eq!(results.len(), 1);
        assert!(results[0].outcome.is_err());
    }

    #[test]
    fn test_requests_are_not_repeated() {
        let source = Arc::new(StaticSource::default());
        let mut loader = PreviewLoader::new(1, PreviewCache::new(8), source.clone());
        loader.observe(1, "/thumbs/ok-1.jpg");
        loader.request_visible(&[1]);
        loader.request_visible(&[1, 1]);
        drain_all(&mut loader, 1);
        assert_eq!(source.fetched.lock().len(), 1);
    }

    #[test]
    fn test_unobserved_results_are_dropped() {
        let source = Arc::new(StaticSource::default());
        let mut loader = PreviewLoader::new(1, PreviewCache::new(8), source);
        loader.observe(1, "/thumbs/ok-1.jpg");
        loader.request_visible(&[1]);
        loader.unobserve(1);
        assert!(loader.wait_for_result(Duration::from_millis(300)).is_none());
    }
}
