// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for client connections.
//!
//! Accepts TCP connections and handles each in its own spawned task.
//! A connection is a bus client: its write half is driven by the
//! per-client send worker (broadcast events and request responses share
//! one outbound queue, so the client observes a single total order),
//! while this task reads request frames until the connection closes.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use wake_bus::{run_sender, Client, ClientList, ClientSink};
use wake_core::Job;
use wake_engine::{AbortOutcome, Engine, EngineError, DEFAULT_FEED_LIMIT};

use crate::protocol::{Request, Response};
use crate::wire::{self, ProtocolError};

/// Shared daemon context for all connections.
pub struct ListenCtx {
    pub engine: Engine,
    pub clients: Arc<ClientList>,
    pub jobs_dir: PathBuf,
}

/// Listener task accepting client connections.
pub struct Listener {
    socket: TcpListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(socket: TcpListener, ctx: Arc<ListenCtx>) -> Self {
        Self { socket, ctx }
    }

    /// Run the accept loop, spawning a task per connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                ProtocolError::ConnectionClosed => debug!("client disconnected"),
                                _ => error!("connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }
}

/// Write half of a connection, framing outbound messages.
struct FrameSink {
    writer: OwnedWriteHalf,
}

#[async_trait]
impl ClientSink for FrameSink {
    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        wire::write_message(&mut self.writer, frame)
            .await
            .map_err(|e| match e {
                ProtocolError::Io(io_err) => io_err,
                other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
            })
    }
}

/// Handle one client for the lifetime of its connection.
async fn handle_connection(stream: TcpStream, ctx: &ListenCtx) -> Result<(), ProtocolError> {
    let peer = stream.peer_addr().ok();
    let (mut reader, writer) = stream.into_split();

    let (client, outbound) = Client::new();
    info!(client = client.id(), peer = ?peer, "client connected");
    ctx.clients.attach(Arc::clone(&client));

    let sender_id = client.id().to_string();
    let send_worker = tokio::spawn(async move {
        run_sender(&sender_id, outbound, FrameSink { writer }).await;
    });

    let result = read_loop(&mut reader, &client, ctx).await;

    ctx.clients.detach(client.id());
    info!(client = client.id(), "client disconnected");
    drop(client);
    // With every queue handle gone the send worker drains and exits.
    let _ = send_worker.await;

    result
}

async fn read_loop(
    reader: &mut tokio::net::tcp::OwnedReadHalf,
    client: &Arc<Client>,
    ctx: &ListenCtx,
) -> Result<(), ProtocolError> {
    loop {
        let frame = match wire::read_message(reader).await {
            Ok(frame) => frame,
            Err(ProtocolError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };

        let request: Request = match wire::decode(&frame) {
            Ok(request) => request,
            Err(e) => {
                warn!(client = client.id(), error = %e, "unparseable frame");
                respond(
                    client,
                    &Response::Error {
                        message: format!("unparseable request: {e}"),
                    },
                )
                .await;
                continue;
            }
        };

        debug!(client = client.id(), request = ?request, "received request");

        match request {
            // Subscription changes are acknowledged implicitly: the
            // next matching event is the acknowledgement.
            Request::Subscribe { to } => {
                for prefix in &to {
                    client.subscribe(prefix);
                }
            }
            Request::Unsubscribe { to } => {
                for prefix in &to {
                    client.unsubscribe(prefix);
                }
            }
            other => {
                let response = handle_request(other, ctx).await;
                respond(client, &response).await;
            }
        }
    }
}

/// Handle one request and build its response.
async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Submit { name, params } => match load_job(ctx, &name).await {
            Ok((job, source_path)) => {
                match ctx.engine.submit(job, &source_path, &params).await {
                    Ok(id) => Response::Submitted { id },
                    Err(e) => {
                        error!(job = %name, error = %e, "submission failed");
                        Response::Error {
                            message: e.to_string(),
                        }
                    }
                }
            }
            Err(message) => Response::Error { message },
        },

        Request::Abort { id } => match ctx.engine.abort(id) {
            AbortOutcome::Signalled | AbortOutcome::Dequeued => Response::Ok,
            AbortOutcome::NotFound => Response::Error {
                message: format!("build {id} not found"),
            },
        },

        Request::Get { id } => match ctx.engine.get(id).await {
            Ok((job, update)) => Response::Build { job, update },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Request::Feed { limit } => Response::Feed {
            builds: ctx.engine.feed(limit.unwrap_or(DEFAULT_FEED_LIMIT)),
        },

        Request::Replay { id, task_id } => match ctx.engine.replay(id, task_id).await {
            Ok(()) => Response::Ok,
            Err(EngineError::NotFound(_)) => Response::Error {
                message: format!("no log for build {id} task {task_id}"),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        // Handled in the read loop.
        Request::Subscribe { .. } | Request::Unsubscribe { .. } => Response::Ok,
    }
}

/// Load a job definition from the jobs directory.
///
/// Returns the parsed job and the definition path, which doubles as the
/// `source_path` saved into the build's wakespace.
async fn load_job(ctx: &ListenCtx, name: &str) -> Result<(Job, PathBuf), String> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(format!("invalid job name: {name}"));
    }

    let path = ctx.jobs_dir.join(format!("{name}.json"));
    let raw = tokio::fs::read(&path)
        .await
        .map_err(|_| format!("no job named {name}"))?;
    let job: Job =
        serde_json::from_slice(&raw).map_err(|e| format!("invalid job definition: {e}"))?;
    Ok((job, path))
}

async fn respond(client: &Arc<Client>, response: &Response) {
    let frame = match serde_json::to_vec(response) {
        Ok(frame) => frame,
        Err(e) => {
            error!(error = %e, "failed to serialize response");
            return;
        }
    };
    if client.send(frame.into()).await.is_err() {
        debug!(client = client.id(), "send worker gone, dropping response");
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
