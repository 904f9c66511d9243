//! The persisted experience record.

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// Kind of media an experience points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Classify a MIME type: anything under `video/` is a video, the rest
    /// is treated as an image.
    pub fn from_mime(mime: &str) -> Self {
        if mime.trim().to_ascii_lowercase().starts_with("video") {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }

    /// Classify by file extension when no MIME type is available.
    pub fn from_file_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp4" | "m4v" | "mov" | "webm" | "mkv" | "avi" | "3gp" => MediaType::Video,
            _ => MediaType::Image,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

/// A record about to be appended. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExperience {
    #[serde(rename = "type")]
    pub media_type: MediaType,

    /// Resolved address of the stored blob.
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    #[serde(rename = "createdAt")]
    pub created_at: TimestampMs,
}

/// A stored experience as seen by readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    /// Store-assigned identifier.
    pub id: String,

    #[serde(rename = "type")]
    pub media_type: MediaType,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    #[serde(rename = "createdAt")]
    pub created_at: TimestampMs,
}

/// Why a stored entry could not be read as an experience.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record is not an object")]
    NotAnObject,

    #[error("invalid fields: {0}")]
    InvalidFields(#[from] serde_json::Error),

    #[error("url is empty")]
    EmptyUrl,

    #[error("createdAt is negative ({0})")]
    NegativeTimestamp(TimestampMs),
}

impl NewExperience {
    /// Build a record, dropping blank author fields.
    pub fn new(
        media_type: MediaType,
        url: impl Into<String>,
        name: Option<String>,
        caption: Option<String>,
        created_at: TimestampMs,
    ) -> Self {
        Self {
            media_type,
            url: url.into(),
            name: non_blank(name),
            caption: non_blank(caption),
            created_at,
        }
    }

    /// Field map as written to the store.
    pub fn to_fields(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Attach the id the store assigned.
    pub fn with_id(self, id: impl Into<String>) -> Experience {
        Experience {
            id: id.into(),
            media_type: self.media_type,
            url: self.url,
            name: self.name,
            caption: self.caption,
            created_at: self.created_at,
        }
    }
}

impl Experience {
    /// Parse one entry of a store snapshot.
    ///
    /// Unknown fields are ignored; missing or mistyped required fields,
    /// an empty `url` or a negative `createdAt` make the entry malformed.
    pub fn from_record(id: &str, fields: &serde_json::Value) -> Result<Self, RecordError> {
        if !fields.is_object() {
            return Err(RecordError::NotAnObject);
        }
        let record: NewExperience = serde_json::from_value(fields.clone())?;
        if record.url.trim().is_empty() {
            return Err(RecordError::EmptyUrl);
        }
        if record.created_at < 0 {
            return Err(RecordError::NegativeTimestamp(record.created_at));
        }
        let NewExperience {
            media_type,
            url,
            name,
            caption,
            created_at,
        } = record;
        Ok(NewExperience::new(media_type, url, name, caption, created_at).with_id(id))
    }

    /// Display label for the author, if one was given.
    pub fn author(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
