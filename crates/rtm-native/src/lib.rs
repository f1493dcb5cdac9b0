// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! RTM bridge: native SDK seam.
//!
//! The real-time messaging SDK is consumed through the traits in [`traits`].
//! Every asynchronous SDK call takes a [`traits::Completion`] that the SDK may
//! invoke on any thread; listener callbacks arrive through an [`EventSink`]
//! with the same threading caveat. Callers are responsible for marshaling both
//! back onto whichever thread owns their state.

pub mod event;
pub mod loopback;
pub mod traits;

use std::sync::Arc;

pub use event::{EventSink, LocalInvitationEvent, NativeEvent, RemoteInvitationEvent};
pub use loopback::LoopbackSdk;
pub use traits::{Completion, NativeCallManager, NativeChannel, NativeClient, RtmSdk};

/// Retrieves the SDK implementation for the target platform.
///
/// Vendor SDK bindings are linked by the host application on mobile targets
/// and handed to the dispatcher directly; everywhere else the in-process
/// loopback SDK is used so the bridge can run on desktop and in CI.
pub fn platform_sdk() -> Arc<dyn RtmSdk> {
    Arc::new(LoopbackSdk::new())
}
