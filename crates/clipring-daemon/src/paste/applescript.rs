//! macOS: System Events keystroke through osascript.
//!
//! Needs the Accessibility permission for the daemon's parent terminal or
//! launcher; without it osascript exits non-zero and the paste is logged
//! as failed.

use super::{KeystrokeCommand, PasteStrategy};

pub struct AppleScriptPaste;

impl PasteStrategy for AppleScriptPaste {
    fn name(&self) -> &'static str {
        "applescript"
    }

    fn command(&self) -> KeystrokeCommand {
        KeystrokeCommand::new(
            "osascript",
            &[
                "-e",
                r#"tell application "System Events""#,
                "-e",
                "delay 0.1",
                "-e",
                r#"keystroke "v" using command down"#,
                "-e",
                "end tell",
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sends_command_v() {
        let command = AppleScriptPaste.command();
        assert_eq!(command.program, "osascript");
        assert!(command
            .args
            .iter()
            .any(|line| line == r#"keystroke "v" using command down"#));
    }
}
