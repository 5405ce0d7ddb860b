//! Global shortcuts for showing and hiding the history surface.
//!
//! The hotkey manager lives on its own thread for the process lifetime.
//! Registration failures are logged and leave the surface reachable only
//! through IPC.

use global_hotkey::hotkey::HotKey;
use global_hotkey::{Error as HotkeyError, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::surface::SurfaceIntent;

const EVENT_POLL: Duration = Duration::from_millis(250);

/// Running hotkey listener. Unregisters its shortcuts on [`shutdown`].
///
/// [`shutdown`]: HotkeyListener::shutdown
pub struct HotkeyListener {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl HotkeyListener {
    /// Register `toggle` and `hide` and forward presses as intents.
    pub fn spawn(
        toggle: HotKey,
        hide: HotKey,
        intents: mpsc::Sender<SurfaceIntent>,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread = std::thread::Builder::new().name("hotkeys".to_string()).spawn({
            let stop = stop.clone();
            move || listen(toggle, hide, intents, stop)
        })?;
        Ok(Self { stop, thread })
    }

    pub fn shutdown(self) {
        self.stop.store(true, Ordering::SeqCst);
        if self.thread.join().is_err() {
            warn!("Hotkey thread panicked");
        }
    }
}

fn listen(
    toggle: HotKey,
    hide: HotKey,
    intents: mpsc::Sender<SurfaceIntent>,
    stop: Arc<AtomicBool>,
) {
    let manager = match GlobalHotKeyManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            error!("Global shortcuts unavailable: {}", e);
            return;
        }
    };

    let mut registered = Vec::new();
    for (hotkey, intent) in [(toggle, SurfaceIntent::Toggle), (hide, SurfaceIntent::Hide)] {
        match manager.register(hotkey) {
            Ok(()) => {
                info!("Registered {:?} shortcut {:?}", intent, hotkey);
                registered.push((hotkey, intent));
            }
            Err(e) => error!("{}", describe_error(&hotkey, e)),
        }
    }

    if registered.is_empty() {
        return;
    }

    let events = GlobalHotKeyEvent::receiver();
    while !stop.load(Ordering::SeqCst) {
        let Ok(event) = events.recv_timeout(EVENT_POLL) else {
            continue;
        };
        if !matches!(event.state, HotKeyState::Pressed) {
            continue;
        }
        let Some((_, intent)) = registered.iter().find(|(hotkey, _)| hotkey.id() == event.id) else {
            continue;
        };

        debug!("Shortcut pressed: {:?}", intent);
        if intents.blocking_send(*intent).is_err() {
            break;
        }
    }

    for (hotkey, _) in registered {
        if let Err(e) = manager.unregister(hotkey) {
            warn!("Failed to unregister shortcut {:?}: {}", hotkey, e);
        }
    }
    debug!("Hotkey listener stopped");
}

fn describe_error(hotkey: &HotKey, e: HotkeyError) -> String {
    match e {
        HotkeyError::AlreadyRegistered(_) => {
            format!("Shortcut {:?} is already taken by another application", hotkey)
        }
        HotkeyError::FailedToRegister(msg) => {
            format!("System rejected shortcut {:?}: {}", hotkey, msg)
        }
        other => format!("Failed to register shortcut {:?}: {}", hotkey, other),
    }
}
