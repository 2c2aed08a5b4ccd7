//! `GalleryApi` over HTTP.
//!
//! Redirects are never followed: a 303 from a form endpoint is the success signal,
//! while a redirect on a JSON endpoint means the session bounced to the login page.

use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AlbumSummary, ApiError, BulkAction, BulkReceipt, GalleryApi, Page, PageResponse};
use crate::models::GalleryFilters;

/// What kind of body an endpoint is expected to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Json,
    /// Form submission answered by a redirect or an arbitrary body.
    Form,
}

/// Map a status code to success or a typed failure.
pub fn classify_status(status: u16, expect: Expect) -> Result<(), ApiError> {
    match status {
        401 | 403 => Err(ApiError::AuthExpired),
        429 => Err(ApiError::RateLimited),
        200..=299 => Ok(()),
        303 if expect == Expect::Form => Ok(()),
        300..=399 => Err(ApiError::AuthExpired),
        other => Err(ApiError::Status(other)),
    }
}

fn is_json_content_type(value: Option<&str>) -> bool {
    value
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Status plus content type of a response to a JSON endpoint. A non-JSON body there
/// is the login page served in place of data.
pub fn check_json(status: u16, content_type: Option<&str>) -> Result<(), ApiError> {
    classify_status(status, Expect::Json)?;
    if !is_json_content_type(content_type) {
        return Err(ApiError::AuthExpired);
    }
    Ok(())
}

fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Malformed(e.to_string()))
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

#[derive(Debug, Deserialize)]
struct IdsResponse {
    #[serde(default)]
    ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct OkResponse {
    #[serde(default)]
    ok: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct AlbumsResponse {
    #[serde(default)]
    items: Vec<AlbumSummary>,
}

#[derive(Debug, Deserialize)]
struct CreateAlbumResponse {
    #[serde(default)]
    ok: Option<bool>,
    album_id: Option<i64>,
}

/// Only an explicit `ok: true` confirms a favorite change.
fn favorite_result(response: OkResponse) -> Result<(), ApiError> {
    match response.ok {
        Some(true) => Ok(()),
        _ => Err(ApiError::Rejected),
    }
}

fn create_album_result(response: CreateAlbumResponse) -> Result<i64, ApiError> {
    match (response.ok, response.album_id) {
        (Some(false), _) | (_, None) => Err(ApiError::Rejected),
        (_, Some(album_id)) => Ok(album_id),
    }
}

pub struct HttpGalleryApi {
    client: Client,
    base: Url,
    csrf_token: Option<String>,
}

impl HttpGalleryApi {
    pub fn new(
        base: Url,
        timeout: Duration,
        session_cookie: Option<&str>,
        csrf_token: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = session_cookie {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(cookie).context("Invalid session cookie")?,
            );
        }
        let client = Client::builder()
            .user_agent(concat!("gallery-view/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::none())
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build gallery HTTP client")?;
        Ok(Self {
            client,
            base,
            csrf_token,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Malformed(format!("bad endpoint {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        Self::read_json(path, response).await
    }

    async fn post_form_json<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Vec<(&str, String)>,
    ) -> Result<T, ApiError> {
        let response = self.post_form(path, form).await?;
        Self::read_json(path, response).await
    }

    async fn post_form(&self, path: &str, mut form: Vec<(&str, String)>) -> Result<Response, ApiError> {
        if let Some(token) = &self.csrf_token {
            form.push(("csrf_token", token.clone()));
        }
        let url = self.endpoint(path)?;
        self.client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(transport)
    }

    async fn read_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        if let Err(err) = check_json(status, content_type) {
            warn!(path, status, ?content_type, error = %err, "Request failed");
            return Err(err);
        }
        let body = response.bytes().await.map_err(transport)?;
        decode_json(&body)
    }
}

impl GalleryApi for HttpGalleryApi {
    async fn fetch_page(
        &self,
        offset: u64,
        limit: usize,
        filters: &GalleryFilters,
    ) -> Result<Page, ApiError> {
        let mut query = vec![("offset", offset.to_string()), ("limit", limit.to_string())];
        query.extend(filters.query_pairs());
        let response: PageResponse = self.get_json("/gallery/data", &query).await?;
        response.into_page()
    }

    async fn fetch_matching_ids(&self, filters: &GalleryFilters) -> Result<Vec<i64>, ApiError> {
        let response: IdsResponse = self.get_json("/gallery/ids", &filters.query_pairs()).await?;
        debug!(count = response.ids.len(), "Fetched matching ids");
        Ok(response.ids)
    }

    async fn set_favorite(&self, id: i64, favorite: bool) -> Result<(), ApiError> {
        let path = if favorite {
            "/gallery/favorite"
        } else {
            "/gallery/unfavorite"
        };
        let response: OkResponse = self
            .post_form_json(path, vec![("file_id", id.to_string())])
            .await?;
        favorite_result(response)
    }

    async fn bulk(&self, action: BulkAction, ids: &[i64]) -> Result<BulkReceipt, ApiError> {
        let field = action.id_field();
        let form = ids.iter().map(|id| (field, id.to_string())).collect();
        let path = action.path();
        let response = self.post_form(&path, form).await?;
        let status = response.status().as_u16();
        classify_status(status, Expect::Form)?;

        let archive = if action == BulkAction::Zip && status != 303 {
            Some(response.bytes().await.map_err(transport)?.to_vec())
        } else {
            None
        };
        debug!(path = %path, count = ids.len(), status, "Bulk request settled");
        Ok(BulkReceipt { archive })
    }

    async fn list_albums(&self, event_id: i64) -> Result<Vec<AlbumSummary>, ApiError> {
        let response: AlbumsResponse = self
            .get_json(&format!("/events/{event_id}/albums"), &[])
            .await?;
        Ok(response.items)
    }

    async fn create_album(
        &self,
        event_id: i64,
        name: &str,
        description: &str,
    ) -> Result<i64, ApiError> {
        let response: CreateAlbumResponse = self
            .post_form_json(
                &format!("/events/{event_id}/albums/create"),
                vec![
                    ("name", name.to_string()),
                    ("description", description.to_string()),
                ],
            )
            .await?;
        create_album_result(response)
    }
}
