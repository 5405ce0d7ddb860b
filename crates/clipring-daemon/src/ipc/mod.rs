//! IPC with presentation clients.

mod server;

pub use server::serve;

use clipring_common::{Request, Response};
use tokio::sync::{oneshot, watch};

use crate::notify::{Subscription, SubscriptionId};

/// Event from an IPC client, handled by the main loop.
pub enum IpcEvent {
    /// A request expecting exactly one response.
    Request {
        request: Request,
        response_tx: oneshot::Sender<Response>,
    },
    /// Open a subscription for a streaming connection.
    Subscribe {
        reply: oneshot::Sender<SubscriptionStreams>,
    },
    /// A streaming connection closed.
    Unsubscribe { id: SubscriptionId },
}

/// What a subscribed connection forwards to its client.
pub struct SubscriptionStreams {
    pub history: Subscription,
    pub visibility: watch::Receiver<bool>,
}
