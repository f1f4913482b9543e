// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connected subscribers and the process-wide client list.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Capacity of each client's outbound frame queue.
pub const OUTBOUND_CAPACITY: usize = 64;

/// A connected subscriber.
///
/// Holds the client's prefix subscription set and the sending side of
/// its bounded outbound queue; the matching receiver is drained by the
/// client's send worker. Lifetime matches the underlying connection.
pub struct Client {
    id: String,
    subscriptions: Mutex<Vec<String>>,
    outbound: mpsc::Sender<Arc<[u8]>>,
}

impl Client {
    /// Create a client with a fresh correlation id, returning the
    /// receiving end of its outbound queue for the send worker.
    pub fn new() -> (Arc<Self>, mpsc::Receiver<Arc<[u8]>>) {
        let id: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(5)
            .collect();
        let (outbound, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        (
            Arc::new(Self {
                id,
                subscriptions: Mutex::new(Vec::new()),
                outbound,
            }),
            rx,
        )
    }

    /// Short correlation id used in logs.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a topic prefix to the subscription set. Idempotent.
    pub fn subscribe(&self, prefix: &str) {
        let mut subs = self.subscriptions.lock();
        if !subs.iter().any(|p| p == prefix) {
            subs.push(prefix.to_string());
            debug!(client = %self.id, prefix, "subscribed");
        }
    }

    /// Remove a topic prefix from the subscription set. Idempotent.
    pub fn unsubscribe(&self, prefix: &str) {
        let mut subs = self.subscriptions.lock();
        if let Some(index) = subs.iter().position(|p| p == prefix) {
            subs.remove(index);
            debug!(client = %self.id, prefix, "unsubscribed");
        }
    }

    /// True when any subscribed prefix is a prefix of `topic`.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions
            .lock()
            .iter()
            .any(|prefix| topic.starts_with(prefix.as_str()))
    }

    /// Enqueue a frame, waiting for queue space.
    ///
    /// This is the backpressure path for lifecycle updates and request
    /// responses. Fails only when the send worker is gone.
    pub async fn send(&self, frame: Arc<[u8]>) -> Result<(), SendError> {
        self.outbound.send(frame).await.map_err(|_| SendError)
    }

    /// Enqueue a frame if space is available.
    ///
    /// Returns false when the frame was dropped (queue full or send
    /// worker gone). This is the droppable path for log lines.
    pub fn try_send(&self, frame: Arc<[u8]>) -> bool {
        self.outbound.try_send(frame).is_ok()
    }
}

/// The client's outbound queue is closed (send worker terminated).
#[derive(Debug, thiserror::Error)]
#[error("client outbound queue closed")]
pub struct SendError;

/// Process-wide list of attached clients.
#[derive(Default)]
pub struct ClientList {
    clients: Mutex<Vec<Arc<Client>>>,
}

impl ClientList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. Idempotent by client id.
    pub fn attach(&self, client: Arc<Client>) {
        let mut clients = self.clients.lock();
        if !clients.iter().any(|c| c.id == client.id) {
            debug!(client = %client.id, "client attached");
            clients.push(client);
        }
    }

    /// Deregister a client. Idempotent.
    pub fn detach(&self, id: &str) {
        let mut clients = self.clients.lock();
        if let Some(index) = clients.iter().position(|c| c.id == id) {
            clients.remove(index);
            debug!(client = %id, "client detached");
        }
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    /// Snapshot the clients subscribed to `topic`.
    ///
    /// The list lock is held only for this iteration; sends happen
    /// against the snapshot.
    pub fn subscribed_to(&self, topic: &str) -> Vec<Arc<Client>> {
        self.clients
            .lock()
            .iter()
            .filter(|c| c.is_subscribed(topic))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
