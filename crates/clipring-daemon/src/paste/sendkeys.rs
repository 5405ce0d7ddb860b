//! Windows: UI automation through System.Windows.Forms.SendKeys.

use super::{KeystrokeCommand, PasteStrategy};

const SEND_CTRL_V: &str =
    "Add-Type -AssemblyName System.Windows.Forms; [System.Windows.Forms.SendKeys]::SendWait('^v')";

pub struct SendKeysPaste;

impl PasteStrategy for SendKeysPaste {
    fn name(&self) -> &'static str {
        "sendkeys"
    }

    fn command(&self) -> KeystrokeCommand {
        KeystrokeCommand::new(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", SEND_CTRL_V],
        )
    }
}
