//! Connection to the clipring daemon.

mod client;

pub use client::{DaemonStatus, IpcClient, Update, Updates};
