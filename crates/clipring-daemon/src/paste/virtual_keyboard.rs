//! Linux and other Unix desktops: synthetic key events.

use super::{KeystrokeCommand, PasteStrategy};

/// Tool used to emit the key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualKeyboard {
    /// XTEST through xdotool.
    Xdotool,
    /// Wayland virtual-keyboard protocol through wtype.
    Wtype,
}

pub struct VirtualKeyboardPaste {
    backend: VirtualKeyboard,
}

impl VirtualKeyboardPaste {
    pub fn new(backend: VirtualKeyboard) -> Self {
        Self { backend }
    }
}

impl PasteStrategy for VirtualKeyboardPaste {
    fn name(&self) -> &'static str {
        match self.backend {
            VirtualKeyboard::Xdotool => "xdotool",
            VirtualKeyboard::Wtype => "wtype",
        }
    }

    fn command(&self) -> KeystrokeCommand {
        match self.backend {
            VirtualKeyboard::Xdotool => {
                KeystrokeCommand::new("xdotool", &["key", "--clearmodifiers", "ctrl+v"])
            }
            VirtualKeyboard::Wtype => {
                KeystrokeCommand::new("wtype", &["-M", "ctrl", "v", "-m", "ctrl"])
            }
        }
    }
}
