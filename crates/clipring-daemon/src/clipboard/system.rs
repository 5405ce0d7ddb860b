//! OS clipboard backed by arboard.

use super::{ClipboardError, ClipboardPort, RgbaImage};
use arboard::{Clipboard, ImageData};
use std::borrow::Cow;

/// The system clipboard.
///
/// Must stay alive while content written by the daemon should remain
/// pasteable; on X11 and Wayland arboard serves the selection itself.
pub struct SystemClipboard {
    inner: Clipboard,
}

impl SystemClipboard {
    pub fn open() -> Result<Self, ClipboardError> {
        Ok(Self {
            inner: Clipboard::new()?,
        })
    }
}

impl ClipboardPort for SystemClipboard {
    fn read_text(&mut self) -> Result<Option<String>, ClipboardError> {
        match self.inner.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_image(&mut self) -> Result<Option<RgbaImage>, ClipboardError> {
        match self.inner.get_image() {
            Ok(image) => {
                let image = RgbaImage::new(image.width, image.height, image.bytes.into_owned())?;
                Ok(Some(image))
            }
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner.set_text(text)?;
        Ok(())
    }

    fn write_image(&mut self, image: &RgbaImage) -> Result<(), ClipboardError> {
        self.inner.set_image(ImageData {
            width: image.width,
            height: image.height,
            bytes: Cow::Borrowed(&image.bytes),
        })?;
        Ok(())
    }
}
