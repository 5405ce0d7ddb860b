//! IPC protocol types for communication between daemon and client.

use serde::{Deserialize, Serialize};

use crate::types::{ClipEntry, ImageBlob};

/// Request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Get clipboard history, newest first.
    GetHistory {
        /// Maximum number of entries to return.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
        /// Case-insensitive text filter. Images never match a non-empty
        /// search.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search: Option<String>,
    },

    /// Put text on the clipboard and record it in history.
    CopyText {
        /// Text to copy.
        text: String,
    },

    /// Put an image on the clipboard and record it in history.
    CopyImage {
        /// PNG data (base64 encoded).
        data: ImageBlob,
    },

    /// Clear all history.
    ClearHistory,

    /// Copy an entry back to the clipboard and paste it into the
    /// focused application.
    PasteItem {
        /// The entry to paste.
        entry: ClipEntry,
    },

    /// Turn this connection into a stream of history and visibility
    /// updates. Closing the connection unsubscribes.
    Subscribe,

    /// Show the history surface if hidden, hide it otherwise.
    ToggleVisibility,

    /// Hide the history surface.
    HideSurface,

    /// Get daemon status.
    GetStatus,

    /// Ping to check if daemon is alive.
    Ping,
}

/// Response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Clipboard history, newest first.
    History {
        entries: Vec<ClipEntry>,
    },

    /// Result of a text copy.
    Copied {
        success: bool,
    },

    /// Generic success response.
    Ok,

    /// Error response.
    Error {
        /// Error code.
        code: ErrorCode,
        /// Human-readable error message.
        message: String,
    },

    /// Daemon status.
    Status {
        /// Daemon version.
        version: String,
        /// Number of entries in history.
        entry_count: u64,
        /// History capacity.
        max_entries: u64,
        /// Whether the history surface is shown.
        visible: bool,
        /// Number of active history subscribers.
        subscribers: u64,
    },

    /// Pong response to ping.
    Pong,

    /// Acknowledges a subscription; updates follow on the same connection.
    Subscribed,

    /// Pushed after every history mutation.
    HistoryChanged {
        entries: Vec<ClipEntry>,
    },

    /// Pushed when the history surface is shown or hidden.
    Visibility {
        visible: bool,
    },
}

/// Error codes for error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Image data is not a decodable PNG.
    InvalidImage,
    /// Invalid request.
    InvalidRequest,
    /// Internal error.
    InternalError,
}

impl Response {
    /// Create an error response.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// Encode a request to JSON bytes with newline delimiter.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, serde_json::Error> {
    let mut json = serde_json::to_vec(request)?;
    json.push(b'\n');
    Ok(json)
}

/// Encode a response to JSON bytes with newline delimiter.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, serde_json::Error> {
    let mut json = serde_json::to_vec(response)?;
    json.push(b'\n');
    Ok(json)
}

/// Decode a request from JSON bytes.
pub fn decode_request(data: &[u8]) -> Result<Request, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Decode a response from JSON bytes.
pub fn decode_response(data: &[u8]) -> Result<Response, serde_json::Error> {
    serde_json::from_slice(data)
}
