use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::entities::UrlRef;

/// Receiving end shared by every worker of the consuming stage.
pub(crate) type Inbox = Arc<Mutex<mpsc::Receiver<UrlRef>>>;

/// Why a send did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendStop {
    Cancelled,
    /// Every receiver is gone. Only happens once consumers have quit.
    Disconnected,
}

pub(crate) fn bounded(capacity: usize) -> (mpsc::Sender<UrlRef>, Inbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, Arc::new(Mutex::new(rx)))
}

/// Next URL, or `None` once the queue is closed and drained or the run is
/// cancelled.
pub(crate) async fn recv(cancel: &CancellationToken, inbox: &Inbox) -> Option<UrlRef> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        url = async { inbox.lock().await.recv().await } => url,
    }
}

pub(crate) async fn send(
    cancel: &CancellationToken,
    tx: &mpsc::Sender<UrlRef>,
    url: UrlRef,
) -> Result<(), SendStop> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SendStop::Cancelled),
        sent = tx.send(url) => sent.map_err(|_| SendStop::Disconnected),
    }
}
