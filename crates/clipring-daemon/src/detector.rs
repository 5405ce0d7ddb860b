//! Clipboard change detection.
//!
//! OS change notifications are not reliable across platforms, so the
//! clipboard is sampled on a fixed interval and compared against the last
//! observed value of each kind. Only immediate repeats are suppressed; a
//! value seen earlier in history is recorded again when it comes back.

use clipring_common::{ClipEntry, ClipPayload};
use tracing::{debug, info, warn};

use crate::clipboard::{ClipboardHandle, ClipboardSample, RgbaImage};
use crate::history::HistoryStore;

/// Default polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 800;

/// Sample the clipboard once and record anything new.
pub async fn poll(clipboard: &ClipboardHandle, store: &mut HistoryStore) -> Vec<ClipEntry> {
    let ClipboardSample { text, image } = clipboard.sample().await;

    let text = text.unwrap_or_else(|e| {
        debug!("Skipping text check: {}", e);
        None
    });
    let image = image.unwrap_or_else(|e| {
        debug!("Skipping image check: {}", e);
        None
    });

    observe(store, text, image)
}

/// Compare one observation against the last seen values and insert changes.
///
/// Text is checked before the image; both may produce an entry.
pub fn observe(
    store: &mut HistoryStore,
    text: Option<String>,
    image: Option<RgbaImage>,
) -> Vec<ClipEntry> {
    let mut inserted = Vec::new();

    if let Some(text) = text {
        let trimmed = text.trim();
        if !trimmed.is_empty() && store.last_seen().text.as_deref() != Some(trimmed) {
            info!("New text detected: {}", preview(trimmed));
            store.last_seen_mut().text = Some(trimmed.to_string());
            inserted.push(store.insert(ClipPayload::Text(trimmed.to_string())));
        }
    }

    if let Some(image) = image.filter(|image| !image.is_empty()) {
        let signature = image.signature();
        if store.last_seen().image_signature.as_deref() != Some(signature.as_str()) {
            // Remember the signature even if encoding fails so a broken
            // image is not retried every tick.
            store.last_seen_mut().image_signature = Some(signature);
            match image.encode_png() {
                Ok(blob) => {
                    info!("New image detected ({}x{})", image.width, image.height);
                    inserted.push(store.insert(ClipPayload::Image(blob)));
                }
                Err(e) => warn!("Failed to encode clipboard image: {}", e),
            }
        }
    }

    inserted
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(50).collect();
    if preview.len() < text.len() {
        preview.push_str("...");
    }
    preview
}
