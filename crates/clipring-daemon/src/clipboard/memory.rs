//! In-memory clipboard for tests.

use super::{ClipboardError, ClipboardPort, RgbaImage};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    text: Option<String>,
    image: Option<RgbaImage>,
    fail_reads: bool,
    text_writes: usize,
}

/// A clipboard shared between a test and the clipboard worker.
#[derive(Clone, Default)]
pub struct MemoryClipboard {
    state: Arc<Mutex<State>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate another application copying text. Replaces any image.
    pub fn set_text(&self, text: &str) {
        let mut state = self.state.lock().unwrap();
        state.text = Some(text.to_string());
        state.image = None;
    }

    /// Simulate another application copying an image. Replaces any text.
    pub fn set_image(&self, image: RgbaImage) {
        let mut state = self.state.lock().unwrap();
        state.image = Some(image);
        state.text = None;
    }

    pub fn text(&self) -> Option<String> {
        self.state.lock().unwrap().text.clone()
    }

    pub fn image(&self) -> Option<RgbaImage> {
        self.state.lock().unwrap().image.clone()
    }

    pub fn text_writes(&self) -> usize {
        self.state.lock().unwrap().text_writes
    }

    /// Make every subsequent read fail until turned off again.
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }
}

impl ClipboardPort for MemoryClipboard {
    fn read_text(&mut self) -> Result<Option<String>, ClipboardError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(ClipboardError::Unavailable("read failure".to_string()));
        }
        Ok(state.text.clone())
    }

    fn read_image(&mut self) -> Result<Option<RgbaImage>, ClipboardError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(ClipboardError::Unavailable("read failure".to_string()));
        }
        Ok(state.image.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut state = self.state.lock().unwrap();
        state.text = Some(text.to_string());
        state.image = None;
        state.text_writes += 1;
        Ok(())
    }

    fn write_image(&mut self, image: &RgbaImage) -> Result<(), ClipboardError> {
        let mut state = self.state.lock().unwrap();
        state.image = Some(image.clone());
        state.text = None;
        Ok(())
    }
}
