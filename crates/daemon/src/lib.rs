// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wake Daemon library
//!
//! Exposes the connection protocol types and wire framing for use by
//! external clients; the daemon itself lives in the `waked` binary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod protocol;
pub mod wire;

pub use protocol::{Request, Response};
pub use wire::{read_message, write_message, ProtocolError, MAX_MESSAGE_SIZE};
