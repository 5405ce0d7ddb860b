//! The clipboard history engine.
//!
//! Owns the history, the paste injector and the surface state. All
//! mutations go through `&mut Engine` from the daemon's single event loop,
//! so detector ticks and client commands never interleave.

use clipring_common::{ClipEntry, ClipPayload, ErrorCode, ImageBlob, Request, Response};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clipboard::{ClipboardError, ClipboardHandle, RgbaImage};
use crate::config::Config;
use crate::detector;
use crate::history::HistoryStore;
use crate::ipc::{IpcEvent, SubscriptionStreams};
use crate::notify::SubscriptionId;
use crate::paste::{PasteInjector, PasteStrategy};
use crate::surface::{Surface, SurfaceIntent};

pub struct Engine {
    store: HistoryStore,
    clipboard: ClipboardHandle,
    injector: PasteInjector,
    surface: Surface,
}

impl Engine {
    pub fn new(
        config: &Config,
        clipboard: ClipboardHandle,
        strategy: Arc<dyn PasteStrategy>,
    ) -> Self {
        let injector = PasteInjector::new(
            clipboard.clone(),
            strategy,
            config.paste.settle_delay(),
            config.paste.auto_paste,
        );
        Self {
            store: HistoryStore::new(config.history.max_entries),
            clipboard,
            injector,
            surface: Surface::new(),
        }
    }

    pub fn paste_strategy(&self) -> &'static str {
        self.injector.strategy_name()
    }

    /// One change-detector tick.
    pub async fn poll_clipboard(&mut self) -> usize {
        detector::poll(&self.clipboard, &mut self.store).await.len()
    }

    pub fn history(&self) -> Vec<ClipEntry> {
        self.store.snapshot()
    }

    /// History filtered by a case-insensitive text search and truncated to
    /// `limit` entries.
    pub fn search_history(&self, search: Option<&str>, limit: Option<usize>) -> Vec<ClipEntry> {
        self.store.query(search, limit)
    }

    /// Put text on the clipboard and record it. Returns false if the
    /// clipboard write failed, in which case history is unchanged.
    pub async fn copy_text(&mut self, text: String) -> bool {
        if let Err(e) = self.clipboard.write_text(&text).await {
            warn!("Failed to copy text: {}", e);
            return false;
        }
        self.store.last_seen_mut().text = Some(text.trim().to_string());
        self.store.insert(ClipPayload::Text(text));
        true
    }

    /// Put a PNG image on the clipboard and record it.
    pub async fn copy_image(&mut self, blob: ImageBlob) -> Result<ClipEntry, ClipboardError> {
        let image = RgbaImage::decode_png(blob.as_bytes())?;
        let signature = image.signature();
        self.clipboard.write_image(image).await?;
        self.store.last_seen_mut().image_signature = Some(signature);
        Ok(self.store.insert(ClipPayload::Image(blob)))
    }

    pub fn clear_history(&mut self) {
        self.store.clear();
        info!("History cleared");
    }

    /// Copy `entry` back to the clipboard and paste it into the focused
    /// application. Failures are logged only.
    pub async fn paste_item(&mut self, entry: &ClipEntry) {
        debug!("Pasting entry {}", entry.id);
        if let Err(e) = self
            .injector
            .inject(&entry.payload, self.store.last_seen_mut(), &self.surface)
            .await
        {
            warn!("Failed to paste entry {}: {}", entry.id, e);
        }
    }

    pub fn apply(&self, intent: SurfaceIntent) {
        self.surface.apply(intent);
    }

    pub fn subscribe(&mut self) -> SubscriptionStreams {
        SubscriptionStreams {
            history: self.store.subscribe(),
            visibility: self.surface.watch(),
        }
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        if self.store.unsubscribe(id) {
            debug!("Subscription {:?} closed", id);
        }
    }

    /// Stop any paste keystroke still waiting to run.
    pub fn shutdown(&mut self) {
        self.injector.cancel_pending();
    }

    pub async fn handle_ipc_event(&mut self, event: IpcEvent) {
        match event {
            IpcEvent::Request {
                request,
                response_tx,
            } => {
                let response = self.handle_request(request).await;
                let _ = response_tx.send(response);
            }
            IpcEvent::Subscribe { reply } => {
                let _ = reply.send(self.subscribe());
            }
            IpcEvent::Unsubscribe { id } => self.unsubscribe(id),
        }
    }

    pub async fn handle_request(&mut self, request: Request) -> Response {
        match request {
            Request::GetHistory { limit, search } => Response::History {
                entries: self.search_history(search.as_deref(), limit),
            },

            Request::CopyText { text } => Response::Copied {
                success: self.copy_text(text).await,
            },

            Request::CopyImage { data } => match self.copy_image(data).await {
                Ok(_) => Response::Copied { success: true },
                Err(ClipboardError::Image(e)) => {
                    Response::error(ErrorCode::InvalidImage, e.to_string())
                }
                Err(e) => {
                    warn!("Failed to copy image: {}", e);
                    Response::Copied { success: false }
                }
            },

            Request::ClearHistory => {
                self.clear_history();
                Response::Ok
            }

            Request::PasteItem { entry } => {
                self.paste_item(&entry).await;
                Response::Ok
            }

            Request::ToggleVisibility => {
                self.apply(SurfaceIntent::Toggle);
                Response::Ok
            }

            Request::HideSurface => {
                self.apply(SurfaceIntent::Hide);
                Response::Ok
            }

            Request::GetStatus => Response::Status {
                version: crate::VERSION.to_string(),
                entry_count: self.store.len() as u64,
                max_entries: self.store.capacity() as u64,
                visible: self.surface.is_visible(),
                subscribers: self.store.subscriber_count() as u64,
            },

            Request::Ping => Response::Pong,

            Request::Subscribe => Response::error(
                ErrorCode::InternalError,
                "subscriptions are handled by the connection",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::paste::tests::{wait_for, MarkerPaste};
    use crate::paste::KeystrokeCommand;
    use std::path::PathBuf;

    struct NoKeystrokeTool;

    impl PasteStrategy for NoKeystrokeTool {
        fn name(&self) -> &'static str {
            "none"
        }

        fn command(&self) -> KeystrokeCommand {
            KeystrokeCommand::new("clipring-missing-paste-tool", &[])
        }
    }

    fn engine_with(strategy: Arc<dyn PasteStrategy>) -> (MemoryClipboard, Engine) {
        let clipboard = MemoryClipboard::new();
        let handle = ClipboardHandle::spawn({
            let clipboard = clipboard.clone();
            move || Ok(clipboard.clone())
        })
        .unwrap();

        let mut config = Config::default();
        config.paste.settle_delay_ms = 10;
        (clipboard, Engine::new(&config, handle, strategy))
    }

    fn engine() -> (MemoryClipboard, Engine) {
        engine_with(Arc::new(NoKeystrokeTool))
    }

    fn pixel(rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::new(1, 1, rgba.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_text_image_clear_redetect_scenario() {
        let (clipboard, mut engine) = engine();

        clipboard.set_text("hello");
        assert_eq!(engine.poll_clipboard().await, 1);
        let first = engine.history();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].payload.as_text(), Some("hello"));

        clipboard.set_image(pixel([1, 2, 3, 255]));
        assert_eq!(engine.poll_clipboard().await, 1);
        let history = engine.history();
        assert_eq!(history.len(), 2);
        assert!(history[0].payload.as_image().is_some());
        assert_eq!(history[1].payload.as_text(), Some("hello"));

        engine.clear_history();
        assert!(engine.history().is_empty());

        clipboard.set_text("hello");
        assert_eq!(engine.poll_clipboard().await, 1);
        let history = engine.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].payload.as_text(), Some("hello"));
        assert!(history[0].id > first[0].id);
    }

    #[tokio::test]
    async fn test_get_history_applies_search_and_limit() {
        let (clipboard, mut engine) = engine();
        for text in ["Rust book", "grocery list", "rusty nail"] {
            clipboard.set_text(text);
            engine.poll_clipboard().await;
        }
        clipboard.set_image(pixel([9, 9, 9, 255]));
        engine.poll_clipboard().await;

        let response = engine
            .handle_request(Request::GetHistory {
                limit: None,
                search: Some("RUST".to_string()),
            })
            .await;
        match response {
            Response::History { entries } => {
                let texts: Vec<_> = entries.iter().filter_map(|e| e.payload.as_text()).collect();
                assert_eq!(entries.len(), 2);
                assert_eq!(texts, vec!["rusty nail", "Rust book"]);
            }
            other => panic!("unexpected response: {:?}", other),
        }

        let response = engine
            .handle_request(Request::GetHistory {
                limit: Some(1),
                search: None,
            })
            .await;
        match response {
            Response::History { entries } => {
                assert_eq!(entries.len(), 1);
                assert!(entries[0].payload.as_image().is_some());
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_copy_text_is_not_redetected() {
        let (clipboard, mut engine) = engine();

        assert!(engine.copy_text("manual copy".to_string()).await);
        assert_eq!(clipboard.text().as_deref(), Some("manual copy"));
        assert_eq!(engine.history().len(), 1);

        assert_eq!(engine.poll_clipboard().await, 0);
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn test_copy_image_validates_png() {
        let (clipboard, mut engine) = engine();

        let response = engine
            .handle_request(Request::CopyImage {
                data: ImageBlob::from_png(b"not png".to_vec()),
            })
            .await;
        assert!(matches!(
            response,
            Response::Error {
                code: ErrorCode::InvalidImage,
                ..
            }
        ));
        assert!(engine.history().is_empty());

        let image = pixel([5, 6, 7, 255]);
        let response = engine
            .handle_request(Request::CopyImage {
                data: image.encode_png().unwrap(),
            })
            .await;
        assert!(matches!(response, Response::Copied { success: true }));
        assert_eq!(clipboard.image(), Some(image));
        assert_eq!(engine.poll_clipboard().await, 0);
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn test_paste_leaves_text_on_clipboard_when_keystroke_fails() {
        let (clipboard, mut engine) = engine();
        clipboard.set_text("first");
        engine.poll_clipboard().await;
        clipboard.set_text("second");
        engine.poll_clipboard().await;

        let older = engine.history()[1].clone();
        engine.apply(SurfaceIntent::Toggle);
        let response = engine.handle_request(Request::PasteItem { entry: older }).await;

        assert!(matches!(response, Response::Ok));
        assert_eq!(clipboard.text().as_deref(), Some("first"));
        assert!(!engine.surface.is_visible());

        // Pasting neither records a new entry nor gets picked up as one.
        assert_eq!(engine.poll_clipboard().await, 0);
        assert_eq!(engine.history().len(), 2);
    }

    #[tokio::test]
    async fn test_paste_runs_keystroke_after_settle_delay() {
        let dir = tempfile::tempdir().unwrap();
        let marker: PathBuf = dir.path().join("pasted");
        let (clipboard, mut engine) = engine_with(Arc::new(MarkerPaste(marker.clone())));

        engine.copy_text("to paste".to_string()).await;
        let entry = engine.history()[0].clone();
        engine.paste_item(&entry).await;

        assert_eq!(clipboard.text_writes(), 2);
        assert!(wait_for(&marker).await);
    }

    #[tokio::test]
    async fn test_subscribers_get_one_snapshot_per_mutation() {
        let (clipboard, mut engine) = engine();
        let mut streams = engine.subscribe();

        clipboard.set_text("a");
        engine.poll_clipboard().await;
        engine.copy_text("b".to_string()).await;
        engine.clear_history();

        let mut lens = Vec::new();
        while let Ok(snapshot) = streams.history.updates.try_recv() {
            lens.push(snapshot.len());
        }
        assert_eq!(lens, vec![1, 2, 0]);

        engine.unsubscribe(streams.history.id);
        let status = engine.handle_request(Request::GetStatus).await;
        assert!(matches!(status, Response::Status { subscribers: 0, .. }));
    }

    #[tokio::test]
    async fn test_surface_intents_reach_watchers() {
        let (_clipboard, mut engine) = engine();
        let streams = engine.subscribe();
        let mut visibility = streams.visibility;

        engine.handle_request(Request::ToggleVisibility).await;
        assert!(visibility.has_changed().unwrap());
        assert!(*visibility.borrow_and_update());

        engine.handle_request(Request::HideSurface).await;
        assert!(!*visibility.borrow_and_update());
    }
}
