//! Paste injection: put an entry on the clipboard, then simulate the paste
//! keystroke in whatever application has focus.
//!
//! The clipboard write always happens first, so a failed keystroke still
//! leaves the user able to paste by hand.

mod applescript;
mod sendkeys;
mod virtual_keyboard;

pub use applescript::AppleScriptPaste;
pub use sendkeys::SendKeysPaste;
pub use virtual_keyboard::{VirtualKeyboard, VirtualKeyboardPaste};

use clipring_common::ClipPayload;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::task::AbortHandle;
use tracing::{info, warn};

use crate::clipboard::{ClipboardError, ClipboardHandle, RgbaImage};
use crate::history::LastSeen;
use crate::surface::Surface;

/// Default wait between hiding the surface and sending the keystroke.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 300;

/// A process invocation that sends the paste keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystrokeCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl KeystrokeCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// One way of simulating the paste keystroke.
pub trait PasteStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn command(&self) -> KeystrokeCommand;
}

/// Pick the keystroke strategy for an operating system name as reported by
/// `std::env::consts::OS`.
pub fn strategy_for(os: &str, wayland: bool) -> Arc<dyn PasteStrategy> {
    match os {
        "macos" => Arc::new(AppleScriptPaste),
        "windows" => Arc::new(SendKeysPaste),
        _ if wayland => Arc::new(VirtualKeyboardPaste::new(VirtualKeyboard::Wtype)),
        _ => Arc::new(VirtualKeyboardPaste::new(VirtualKeyboard::Xdotool)),
    }
}

/// The keystroke strategy for the running host.
pub fn platform_strategy() -> Arc<dyn PasteStrategy> {
    let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some();
    strategy_for(std::env::consts::OS, wayland)
}

pub struct PasteInjector {
    clipboard: ClipboardHandle,
    strategy: Arc<dyn PasteStrategy>,
    settle_delay: Duration,
    auto_paste: bool,
    pending: Option<AbortHandle>,
}

impl PasteInjector {
    pub fn new(
        clipboard: ClipboardHandle,
        strategy: Arc<dyn PasteStrategy>,
        settle_delay: Duration,
        auto_paste: bool,
    ) -> Self {
        Self {
            clipboard,
            strategy,
            settle_delay,
            auto_paste,
            pending: None,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Write `payload` to the clipboard, hide the surface and, for text,
    /// schedule the paste keystroke after the settle delay.
    ///
    /// Returns once the clipboard write is done; the keystroke runs in the
    /// background and its outcome is only logged. An error means the
    /// clipboard write failed and nothing else happened.
    pub async fn inject(
        &mut self,
        payload: &ClipPayload,
        last_seen: &mut LastSeen,
        surface: &Surface,
    ) -> Result<(), ClipboardError> {
        match payload {
            ClipPayload::Text(text) => {
                self.clipboard.write_text(text).await?;
                last_seen.text = Some(text.trim().to_string());
                surface.hide();
                if self.auto_paste {
                    self.schedule_keystroke();
                }
            }
            ClipPayload::Image(blob) => {
                // Image targets disagree on accepted formats, so images are
                // left on the clipboard for a manual paste.
                let image = RgbaImage::decode_png(blob.as_bytes())?;
                let signature = image.signature();
                self.clipboard.write_image(image).await?;
                last_seen.image_signature = Some(signature);
                surface.hide();
                info!("Image copied to clipboard");
            }
        }
        Ok(())
    }

    /// Abort a keystroke that is still waiting for its settle delay.
    pub fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    fn schedule_keystroke(&mut self) {
        self.cancel_pending();

        let strategy = Arc::clone(&self.strategy);
        let delay = self.settle_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            send_keystroke(strategy.as_ref()).await;
        });
        self.pending = Some(task.abort_handle());
    }
}

impl Drop for PasteInjector {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

async fn send_keystroke(strategy: &dyn PasteStrategy) {
    let KeystrokeCommand { program, args } = strategy.command();

    let output = Command::new(&program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            info!("Paste keystroke sent via {}", strategy.name());
        }
        Ok(output) => {
            warn!(
                "{} paste failed ({}): {}",
                strategy.name(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Err(e) => {
            warn!(
                "Failed to run {} for {} paste: {}. Paste manually.",
                program,
                strategy.name(),
                e
            );
        }
    }
}
