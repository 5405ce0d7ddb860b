//! Clipring daemon - clipboard history manager with paste injection.

mod clipboard;
mod config;
mod detector;
mod engine;
mod history;
mod hotkey;
mod ipc;
mod notify;
mod paste;
mod surface;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::clipboard::{ClipboardHandle, SystemClipboard};
use crate::engine::Engine;
use crate::hotkey::HotkeyListener;

/// Daemon version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("clipring=info".parse()?))
        .init();

    info!("Starting clipring daemon v{}", VERSION);

    // Load configuration
    let config = config::Config::load()?;
    info!("Loaded configuration: {:?}", config);

    // Start clipboard worker in dedicated thread
    let clipboard = ClipboardHandle::spawn(SystemClipboard::open)?;
    let mut engine = Engine::new(&config, clipboard, paste::platform_strategy());
    info!("Paste strategy: {}", engine.paste_strategy());

    // Create event channels
    let (ipc_tx, mut ipc_rx) = mpsc::channel::<ipc::IpcEvent>(100);
    let (intent_tx, mut intent_rx) = mpsc::channel::<surface::SurfaceIntent>(16);

    // Register global shortcuts
    let hotkeys = if config.hotkeys.enabled {
        match config.hotkeys.parse() {
            Ok((toggle, hide)) => match HotkeyListener::spawn(toggle, hide, intent_tx) {
                Ok(listener) => Some(listener),
                Err(e) => {
                    error!("Failed to start hotkey listener: {}", e);
                    None
                }
            },
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    } else {
        info!("Global shortcuts disabled");
        None
    };

    // Start IPC server
    let socket_path = clipring_common::socket_path();
    let ipc_handle = tokio::spawn({
        let socket_path = socket_path.clone();
        async move {
            if let Err(e) = ipc::serve(socket_path, ipc_tx).await {
                error!("IPC server error: {}", e);
            }
        }
    });

    let mut ticker = tokio::time::interval(config.detector.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    info!("Daemon started, watching the clipboard...");

    // Main event loop
    loop {
        #[cfg(unix)]
        let terminated = terminate.recv();
        #[cfg(not(unix))]
        let terminated = std::future::pending::<Option<()>>();

        tokio::select! {
            _ = ticker.tick() => {
                engine.poll_clipboard().await;
            }
            Some(event) = ipc_rx.recv() => {
                engine.handle_ipc_event(event).await;
            }
            Some(intent) = intent_rx.recv() => {
                engine.apply(intent);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = terminated => {
                info!("Received terminate signal");
                break;
            }
        }
    }

    // Cleanup
    engine.shutdown();
    if let Some(listener) = hotkeys {
        listener.shutdown();
    }
    ipc_handle.abort();
    #[cfg(unix)]
    if socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&socket_path) {
            error!("Failed to remove socket {:?}: {}", socket_path, e);
        }
    }

    info!("Daemon stopped");
    Ok(())
}
