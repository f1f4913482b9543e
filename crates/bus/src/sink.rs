// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport seam for per-client send workers.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

/// Write half of a client connection.
///
/// Implementations frame and transmit one serialized message per call.
#[async_trait]
pub trait ClientSink: Send {
    async fn send(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Per-client send worker: drain `rx` and write frames to `sink` in
/// receive order.
///
/// Terminates on the first write error or when the outbound queue
/// closes; connection-level cleanup detaches the client afterwards.
pub async fn run_sender(
    client_id: &str,
    mut rx: mpsc::Receiver<Arc<[u8]>>,
    mut sink: impl ClientSink,
) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = sink.send(&frame).await {
            debug!(client = %client_id, error = %e, "client write failed, stopping sender");
            return;
        }
    }
    debug!(client = %client_id, "outbound queue closed, sender done");
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
