// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast submission and the dispatcher worker.
//!
//! `publish` is non-blocking: events land on an unbounded inbound
//! channel drained by a single [`Dispatcher`]. The dispatcher writes
//! lifecycle updates through the identity store, serializes each event
//! once, and enqueues the frame onto every matching client's outbound
//! queue. Updates use the blocking path (backpressure, never dropped);
//! log lines are dropped for clients whose queue is full.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use wake_core::Event;
use wake_storage::Store;

use crate::client::ClientList;

/// Handle for publishing events onto the bus. Cheap to clone.
#[derive(Clone)]
pub struct Broadcaster {
    tx: mpsc::UnboundedSender<Event>,
}

/// Single worker draining the bus inbound channel.
pub struct Dispatcher {
    rx: mpsc::UnboundedReceiver<Event>,
    clients: Arc<ClientList>,
    store: Arc<Store>,
}

impl Broadcaster {
    /// Create a bus over the given store and client list.
    ///
    /// Returns the publishing handle and the dispatcher to spawn.
    pub fn new(store: Arc<Store>, clients: Arc<ClientList>) -> (Self, Dispatcher) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self { tx },
            Dispatcher {
                rx,
                clients,
                store,
            },
        )
    }

    /// Submit an event for dispatch. Never blocks.
    ///
    /// A closed dispatcher (shutdown) is logged and the event dropped;
    /// history persistence for updates happens in the dispatcher, so a
    /// lost event here means the process is already going down.
    pub fn publish(&self, event: Event) {
        if self.tx.send(event).is_err() {
            warn!("bus dispatcher is gone, dropping event");
        }
    }
}

impl Dispatcher {
    /// Run until every publisher handle is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            self.dispatch(event).await;
        }
        debug!("bus inbound closed, dispatcher stopping");
    }

    async fn dispatch(&self, event: Event) {
        // Lifecycle updates are the history records; the store is the
        // source of truth, so write it before fan-out. Failures are
        // logged and do not stop delivery.
        if let Event::Update(update) = &event {
            if let Err(e) = self.store.put_history(update) {
                warn!(build = update.id, error = %e, "history write failed");
            }
        }

        let frame: Arc<[u8]> = match event.to_frame() {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                error!(error = %e, "failed to serialize event, dropping");
                return;
            }
        };

        let topic = event.topic();
        for client in self.clients.subscribed_to(&topic) {
            if event.is_update() {
                if client.send(Arc::clone(&frame)).await.is_err() {
                    debug!(client = client.id(), "outbound queue closed, skipping");
                }
            } else if !client.try_send(Arc::clone(&frame)) {
                debug!(client = client.id(), topic = %topic, "slow client, dropped log line");
            }
        }
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
