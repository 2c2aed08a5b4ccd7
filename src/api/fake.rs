//! Scripted in-memory `GalleryApi` for controller tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tokio::sync::Notify;

use super::{AlbumSummary, ApiError, BulkAction, BulkReceipt, GalleryApi, Page, PageResponse};
use crate::models::GalleryFilters;

/// One call as the server would have seen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Page { offset: u64, limit: usize, query: String },
    Ids { query: String },
    Favorite { id: i64, favorite: bool },
    Bulk { action: BulkAction, ids: Vec<i64> },
    Albums { event_id: i64 },
    CreateAlbum { event_id: i64, name: String },
}

/// Render filters the way they appear on the wire, e.g. `favorites=1`.
pub fn query_string(filters: &GalleryFilters) -> String {
    filters
        .query_pairs()
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[derive(Default)]
pub struct FakeApi {
    pages: RefCell<VecDeque<Result<PageResponse, ApiError>>>,
    ids: RefCell<VecDeque<Result<Vec<i64>, ApiError>>>,
    favorites: RefCell<VecDeque<Result<(), ApiError>>>,
    bulk: RefCell<VecDeque<Result<BulkReceipt, ApiError>>>,
    albums: RefCell<VecDeque<Result<Vec<AlbumSummary>, ApiError>>>,
    created: RefCell<VecDeque<Result<i64, ApiError>>>,
    requests: RefCell<Vec<Request>>,
    /// When set, every call waits on `release` before answering.
    gated: Cell<bool>,
    release: Rc<Notify>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, response: Result<PageResponse, ApiError>) -> &Self {
        self.pages.borrow_mut().push_back(response);
        self
    }

    /// Script a page from raw JSON, e.g. `json!({"files": [...], "next_offset": 2})`.
    pub fn push_page_json(&self, value: serde_json::Value) -> &Self {
        let response = serde_json::from_value(value).map_err(|e| ApiError::Malformed(e.to_string()));
        self.push_page(response)
    }

    pub fn push_ids(&self, response: Result<Vec<i64>, ApiError>) -> &Self {
        self.ids.borrow_mut().push_back(response);
        self
    }

    pub fn push_favorite(&self, response: Result<(), ApiError>) -> &Self {
        self.favorites.borrow_mut().push_back(response);
        self
    }

    pub fn push_bulk(&self, response: Result<BulkReceipt, ApiError>) -> &Self {
        self.bulk.borrow_mut().push_back(response);
        self
    }

    pub fn push_albums(&self, response: Result<Vec<AlbumSummary>, ApiError>) -> &Self {
        self.albums.borrow_mut().push_back(response);
        self
    }

    pub fn push_created(&self, response: Result<i64, ApiError>) -> &Self {
        self.created.borrow_mut().push_back(response);
        self
    }

    pub fn gate(&self) {
        self.gated.set(true);
    }

    /// Let one gated call answer.
    pub fn release_one(&self) {
        self.release.notify_one();
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }

    fn record(&self, request: Request) {
        self.requests.borrow_mut().push(request);
    }

    async fn wait_gate(&self) {
        if self.gated.get() {
            let release = Rc::clone(&self.release);
            release.notified().await;
        }
    }

    fn next<T>(queue: &RefCell<VecDeque<Result<T, ApiError>>>) -> Result<T, ApiError> {
        queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted response".into())))
    }
}

impl GalleryApi for FakeApi {
    async fn fetch_page(
        &self,
        offset: u64,
        limit: usize,
        filters: &GalleryFilters,
    ) -> Result<Page, ApiError> {
        self.record(Request::Page {
            offset,
            limit,
            query: query_string(filters),
        });
        self.wait_gate().await;
        Self::next(&self.pages)?.into_page()
    }

    async fn fetch_matching_ids(&self, filters: &GalleryFilters) -> Result<Vec<i64>, ApiError> {
        self.record(Request::Ids {
            query: query_string(filters),
        });
        self.wait_gate().await;
        Self::next(&self.ids)
    }

    async fn set_favorite(&self, id: i64, favorite: bool) -> Result<(), ApiError> {
        self.record(Request::Favorite { id, favorite });
        self.wait_gate().await;
        Self::next(&self.favorites)
    }

    async fn bulk(&self, action: BulkAction, ids: &[i64]) -> Result<BulkReceipt, ApiError> {
        self.record(Request::Bulk {
            action,
            ids: ids.to_vec(),
        });
        self.wait_gate().await;
        Self::next(&self.bulk)
    }

    async fn list_albums(&self, event_id: i64) -> Result<Vec<AlbumSummary>, ApiError> {
        self.record(Request::Albums { event_id });
        self.wait_gate().await;
        Self::next(&self.albums)
    }

    async fn create_album(
        &self,
        event_id: i64,
        name: &str,
        _description: &str,
    ) -> Result<i64, ApiError> {
        self.record(Request::CreateAlbum {
            event_id,
            name: name.to_string(),
        });
        self.wait_gate().await;
        Self::next(&self.created)
    }
}
