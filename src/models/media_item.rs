use serde::{Deserialize, Serialize};

/// `daysLeft` sentinel the server uses when the purge date is unknown.
pub const UNKNOWN_DAYS_LEFT: u32 = 9999;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "images" => Some(Self::Image),
            "video" | "videos" => Some(Self::Video),
            _ => None,
        }
    }
}

/// One gallery asset as served by the data endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub thumb_url: Option<String>,
    #[serde(default)]
    pub srcset: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub days_left: Option<u32>,
    #[serde(default)]
    pub ordinal: Option<i64>,
    #[serde(default)]
    pub datetime: Option<String>,
}

impl MediaItem {
    /// Create a new MediaItem with just the essential display fields
    pub fn new(id: i64, media_type: MediaType, url: impl Into<String>) -> Self {
        Self {
            id,
            media_type,
            name: String::new(),
            url: url.into(),
            thumb_url: None,
            srcset: None,
            width: None,
            height: None,
            favorite: false,
            deleted: false,
            days_left: None,
            ordinal: None,
            datetime: None,
        }
    }

    /// Lenient conversion from one entry of a page's `files` array.
    ///
    /// A missing `type` means image. Entries with a missing or non-integer `id`, or an
    /// unknown `type`, yield `None` so one malformed record cannot poison a whole page.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    pub fn has_valid_id(&self) -> bool {
        self.id > 0
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    /// Grid preview source: the thumbnail when present, the full asset otherwise.
    pub fn preview_url(&self) -> &str {
        match self.thumb_url.as_deref() {
            Some(thumb) if !thumb.is_empty() => thumb,
            _ => &self.url,
        }
    }

    /// Lightbox source: the full asset, falling back to the thumbnail.
    pub fn full_url(&self) -> &str {
        if self.url.is_empty() {
            self.thumb_url.as_deref().unwrap_or_default()
        } else {
            &self.url
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => w as f32 / h as f32,
            _ => 1.0,
        }
    }

    /// Retention bucket used for grouping in the deleted view.
    pub fn retention_days(&self) -> u32 {
        self.days_left.unwrap_or(UNKNOWN_DAYS_LEFT)
    }
}

/// Heading text for a deleted-view retention group.
pub fn days_left_label(days: u32) -> String {
    match days {
        d if d >= UNKNOWN_DAYS_LEFT => "Deletion date unknown".to_string(),
        0 => "Deleting soon".to_string(),
        1 => "1 day left".to_string(),
        d => format!("{d} days left"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_server_record() {
        let item = MediaItem::from_value(json!({
            "id": 7,
            "type": "image",
            "name": "a.jpg",
            "url": "/storage/1/2/a.jpg",
            "thumb_url": "/thumbs/7.jpg?w=480",
            "favorite": true,
            "deleted": false,
            "days_left": null,
            "event_id": 2
        }))
        .unwrap();

        assert_eq!(item.id, 7);
        assert_eq!(item.media_type, MediaType::Image);
        assert!(item.favorite);
        assert_eq!(item.preview_url(), "/thumbs/7.jpg?w=480");
        assert_eq!(item.full_url(), "/storage/1/2/a.jpg");
    }

    #[test]
    fn test_malformed_records_are_rejected() {
        assert!(MediaItem::from_value(json!({"id": "7", "type": "image"})).is_none());
        assert!(MediaItem::from_value(json!({"type": "image"})).is_none());
        assert!(MediaItem::from_value(json!({"id": 3, "type": "audio"})).is_none());
    }

    #[test]
    fn test_preview_falls_back_to_url() {
        let mut item = MediaItem::new(1, MediaType::Video, "/storage/v.mp4");
        assert_eq!(item.preview_url(), "/storage/v.mp4");
        item.thumb_url = Some(String::new());
        assert_eq!(item.preview_url(), "/storage/v.mp4");
    }

    #[test]
    fn test_days_left_labels() {
        assert_eq!(days_left_label(UNKNOWN_DAYS_LEFT), "Deletion date unknown");
        assert_eq!(days_left_label(0), "Deleting soon");
        assert_eq!(days_left_label(1), "1 day left");
        assert_eq!(days_left_label(12), "12 days left");
    }
}
