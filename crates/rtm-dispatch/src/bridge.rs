// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// State owned by the dispatcher task, and the inbox through which SDK
// threads hand completions and listener events back to it.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, instrument};

use rtm_core::{BridgeConfig, ClientIndex, NativeError};
use rtm_native::{Completion, EventSink, RtmSdk};

use crate::args::Envelope;
use crate::events::BridgeEvent;
use crate::registry::HandleRegistry;
use crate::reply::{PendingReply, Reply};
use crate::router::Route;

/// Work marshaled onto the dispatcher task.
pub(crate) type Job = Box<dyn FnOnce(&mut Bridge) + Send + 'static>;

/// Sending half of the dispatcher's job queue. Safe to use from any thread;
/// never blocks.
#[derive(Clone)]
pub(crate) struct Inbox(pub(crate) mpsc::UnboundedSender<Job>);

impl Inbox {
    pub(crate) fn post(&self, job: Job) -> bool {
        self.0.send(job).is_ok()
    }

    /// Wrap a reply into a native completion. When the SDK fires it, `settle`
    /// runs on the dispatcher task and its result resolves the reply. If the
    /// dispatcher is gone the job is dropped and the reply resolves as
    /// abandoned.
    pub(crate) fn completion<T, F>(&self, reply: PendingReply, settle: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Bridge, Result<T, NativeError>) -> Reply + Send + 'static,
    {
        let inbox = self.clone();
        Box::new(move |result| {
            let job: Job = Box::new(move |bridge: &mut Bridge| reply.resolve(settle(bridge, result)));
            if !inbox.post(job) {
                debug!("dispatcher stopped; completion dropped");
            }
        })
    }

    /// Completion for calls with no result payload.
    pub(crate) fn unit(&self, reply: PendingReply) -> Completion<()> {
        self.completion(reply, |_, result| Reply::from_unit(result))
    }

    /// Completion whose success value is encoded by `encode`.
    pub(crate) fn encoded<T, F>(&self, reply: PendingReply, encode: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce(T) -> Value + Send + 'static,
    {
        self.completion(reply, move |_, result| match result {
            Ok(value) => Reply::success(encode(value)),
            Err(e) => e.into(),
        })
    }

    /// Listener for a client session's events.
    pub(crate) fn client_sink(&self, index: ClientIndex, generation: u64) -> EventSink {
        let inbox = self.clone();
        EventSink::new(move |event| {
            inbox.post(Box::new(move |bridge: &mut Bridge| {
                bridge.on_client_event(index, generation, event)
            }));
        })
    }

    /// Listener for one channel object's events.
    pub(crate) fn channel_sink(
        &self,
        index: ClientIndex,
        client_generation: u64,
        channel_id: String,
        channel_generation: u64,
    ) -> EventSink {
        let inbox = self.clone();
        EventSink::new(move |event| {
            let channel_id = channel_id.clone();
            inbox.post(Box::new(move |bridge: &mut Bridge| {
                bridge.on_channel_event(index, client_generation, &channel_id, channel_generation, event)
            }));
        })
    }
}

/// Everything a request handler may touch.
pub(crate) struct Bridge {
    pub(crate) registry: HandleRegistry,
    pub(crate) sdk: Arc<dyn RtmSdk>,
    pub(crate) config: BridgeConfig,
    pub(crate) inbox: Inbox,
    pub(crate) events: broadcast::Sender<BridgeEvent>,
}

impl Bridge {
    /// Route one request. Every path resolves `reply` exactly once, either
    /// here or later from a completion job.
    #[instrument(skip(self, arguments, reply))]
    pub(crate) fn dispatch(&mut self, method: &str, arguments: &Value, reply: PendingReply) {
        let envelope = Envelope::from_call(arguments);
        let route = match Route::parse(envelope.caller.as_deref(), method) {
            Ok(route) => route,
            Err(e) => {
                debug!(caller = ?envelope.caller, "{e}");
                return reply.fail(e);
            }
        };
        match route {
            Route::Static(m) => self.handle_static(m, &envelope, reply),
            Route::Client(m) => self.handle_client(m, &envelope, reply),
            Route::Channel(m) => self.handle_channel(m, &envelope, reply),
            Route::Call(m) => self.handle_call(m, &envelope, reply),
        }
    }
}
