//! Core types shared between daemon and client.

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// The type of clipboard content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
}

impl ContentType {
    /// Check if this is an image type.
    pub fn is_image(&self) -> bool {
        matches!(self, ContentType::Image)
    }
}

/// PNG-encoded image data.
///
/// Cloning is cheap; the bytes are shared. On the wire the blob is a
/// standard base64 string.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob(Arc<[u8]>);

impl ImageBlob {
    /// Wrap already PNG-encoded bytes.
    pub fn from_png(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Decode a base64 string into a blob.
    pub fn from_base64(data: &str) -> Result<Self, base64::DecodeError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(data.trim())?;
        Ok(Self::from_png(bytes))
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read width and height from the PNG header, if the blob is a PNG.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

        let content = &self.0;
        if content.len() < 24 || !content.starts_with(PNG_SIGNATURE) {
            return None;
        }
        let width = u32::from_be_bytes([content[16], content[17], content[18], content[19]]);
        let height = u32::from_be_bytes([content[20], content[21], content[22], content[23]]);
        Some((width, height))
    }
}

impl From<Vec<u8>> for ImageBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_png(bytes)
    }
}

impl fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageBlob({} bytes)", self.0.len())
    }
}

impl Serialize for ImageBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for ImageBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = String::deserialize(deserializer)?;
        Self::from_base64(&data).map_err(serde::de::Error::custom)
    }
}

/// Content of a history entry. Exactly one kind per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipPayload {
    Text(String),
    Image(ImageBlob),
}

impl ClipPayload {
    pub fn content_type(&self) -> ContentType {
        match self {
            ClipPayload::Text(_) => ContentType::Text,
            ClipPayload::Image(_) => ContentType::Image,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ClipPayload::Text(text) => Some(text),
            ClipPayload::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageBlob> {
        match self {
            ClipPayload::Image(blob) => Some(blob),
            ClipPayload::Text(_) => None,
        }
    }
}

/// A clipboard history entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipEntry {
    /// Unique, monotonically increasing identifier.
    pub id: u64,
    /// The copied content.
    pub payload: ClipPayload,
    /// Unix timestamp in milliseconds when this was captured.
    pub created_at: i64,
}

impl ClipEntry {
    pub fn content_type(&self) -> ContentType {
        self.payload.content_type()
    }

    /// Single-line preview: first 200 chars of text with whitespace
    /// collapsed, or the image dimensions.
    pub fn preview(&self) -> String {
        match &self.payload {
            ClipPayload::Text(text) => {
                let preview: String = text.chars().take(200).collect();
                preview.split_whitespace().collect::<Vec<_>>().join(" ")
            }
            ClipPayload::Image(blob) => match blob.dimensions() {
                Some((width, height)) => format!("image {}x{}", width, height),
                None => "image".to_string(),
            },
        }
    }

    /// Case-insensitive substring match on text entries.
    ///
    /// An empty `search` matches every entry; otherwise images never match.
    pub fn matches(&self, search: &str) -> bool {
        if search.is_empty() {
            return true;
        }
        match &self.payload {
            ClipPayload::Text(text) => text.to_lowercase().contains(&search.to_lowercase()),
            ClipPayload::Image(_) => false,
        }
    }

    /// Generate an accessible description for screen readers.
    pub fn accessible_description(&self) -> String {
        match self.content_type() {
            ContentType::Text => format!("Text: {}", self.preview()),
            ContentType::Image => format!("Image: {}", self.preview()),
        }
    }
}
