//! Visibility of the presentation surface.
//!
//! The daemon has no window of its own. It owns the visibility state and
//! pushes every change to subscribed presentation clients, which show or
//! hide themselves accordingly.

use tokio::sync::watch;
use tracing::debug;

/// A request to change visibility, from a hotkey or a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceIntent {
    /// Show if hidden, hide if shown.
    Toggle,
    /// Hide if shown.
    Hide,
}

pub struct Surface {
    visible: watch::Sender<bool>,
}

impl Surface {
    /// Create a hidden surface.
    pub fn new() -> Self {
        let (visible, _) = watch::channel(false);
        Self { visible }
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    #[cfg(test)]
    pub fn show(&self) {
        self.set_visible(true);
    }

    pub fn hide(&self) {
        self.set_visible(false);
    }

    pub fn apply(&self, intent: SurfaceIntent) {
        match intent {
            SurfaceIntent::Toggle => self.set_visible(!self.is_visible()),
            SurfaceIntent::Hide => self.hide(),
        }
    }

    /// Watch visibility changes.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }

    fn set_visible(&self, visible: bool) {
        let changed = self.visible.send_if_modified(|current| {
            if *current == visible {
                return false;
            }
            *current = visible;
            true
        });
        if changed {
            debug!("Surface {}", if visible { "shown" } else { "hidden" });
        }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}
