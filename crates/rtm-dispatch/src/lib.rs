// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! RTM bridge: dispatch core.
//!
//! Turns generic method-channel calls into native SDK calls:
//!
//! - [`router`]: closed tables of caller kinds and method names
//! - [`args`] / [`request`]: envelope parsing and typed per-method requests
//! - [`registry`]: live client, channel, and invitation handles
//! - [`marshal`]: native results and events to JSON payloads
//! - [`reply`]: terminal replies and the one-shot [`PendingReply`]
//! - [`dispatcher`]: the single task that owns all of the above
//!
//! Every request gets exactly one [`Reply`]: success, an error with a code,
//! or not-implemented.

pub mod args;
mod bridge;
pub mod dispatcher;
pub mod events;
mod handlers;
pub mod marshal;
pub mod registry;
pub mod reply;
pub mod request;
pub mod router;

pub use dispatcher::{BridgeHandle, Dispatcher, ReplyTicket};
pub use events::BridgeEvent;
pub use registry::{ClientSnapshot, RegistrySnapshot};
pub use reply::{PendingReply, Reply};
pub use router::Route;
