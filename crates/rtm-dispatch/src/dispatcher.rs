// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The dispatcher task and its cloneable front end.
//
// One tokio task owns the handle registry. Requests arrive over a bounded
// channel; native completions and listener events arrive over an unbounded
// inbox that SDK threads can feed without blocking. Inbox jobs are drained
// before the next request is taken, so a completion never waits behind a
// burst of new calls.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use rtm_core::{BridgeConfig, BridgeError};
use rtm_native::RtmSdk;

use crate::bridge::{Bridge, Inbox, Job};
use crate::events::BridgeEvent;
use crate::registry::{HandleRegistry, RegistrySnapshot};
use crate::reply::{PendingReply, Reply};

enum Call {
    Invoke {
        method: String,
        arguments: Value,
        reply: PendingReply,
    },
    Snapshot(oneshot::Sender<RegistrySnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Single owner of the bridge state.
pub struct Dispatcher {
    bridge: Bridge,
    calls: mpsc::Receiver<Call>,
    jobs: mpsc::UnboundedReceiver<Job>,
}

impl Dispatcher {
    pub fn new(sdk: Arc<dyn RtmSdk>, config: BridgeConfig) -> (Self, BridgeHandle) {
        let (call_tx, calls) = mpsc::channel(config.request_queue_depth.max(1));
        let (job_tx, jobs) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_queue_depth.max(1));
        let bridge = Bridge {
            registry: HandleRegistry::new(config.max_clients),
            sdk,
            config,
            inbox: Inbox(job_tx),
            events: events.clone(),
        };
        let handle = BridgeHandle {
            calls: call_tx,
            events,
        };
        (
            Self {
                bridge,
                calls,
                jobs,
            },
            handle,
        )
    }

    /// Create a dispatcher and run it on the current tokio runtime.
    pub fn spawn(sdk: Arc<dyn RtmSdk>, config: BridgeConfig) -> (BridgeHandle, JoinHandle<()>) {
        let (dispatcher, handle) = Self::new(sdk, config);
        (handle, tokio::spawn(dispatcher.run()))
    }

    /// Serve requests until `shutdown` is called or every handle is dropped,
    /// then release every registered client.
    #[instrument(skip(self), name = "dispatcher")]
    pub async fn run(mut self) {
        info!(channel = %self.bridge.config.channel_name, "dispatcher started");
        let mut ack = None;
        loop {
            tokio::select! {
                biased;
                Some(job) = self.jobs.recv() => job(&mut self.bridge),
                call = self.calls.recv() => match call {
                    Some(Call::Invoke { method, arguments, reply }) => {
                        self.bridge.dispatch(&method, &arguments, reply);
                    }
                    Some(Call::Snapshot(tx)) => {
                        let _ = tx.send(self.bridge.registry.snapshot());
                    }
                    Some(Call::Shutdown(tx)) => {
                        ack = Some(tx);
                        break;
                    }
                    None => {
                        debug!("all bridge handles dropped");
                        break;
                    }
                },
            }
        }

        // Let completions that already arrived resolve their replies.
        while let Ok(job) = self.jobs.try_recv() {
            job(&mut self.bridge);
        }
        self.bridge.registry.release_all();
        info!("dispatcher stopped");
        if let Some(tx) = ack {
            let _ = tx.send(());
        }
    }
}

/// Claim on the reply to a submitted request.
#[derive(Debug)]
pub struct ReplyTicket(oneshot::Receiver<Reply>);

impl ReplyTicket {
    pub async fn reply(self) -> Reply {
        self.0
            .await
            .unwrap_or_else(|_| BridgeError::Abandoned.into())
    }
}

/// Cloneable front end to a running dispatcher.
#[derive(Clone)]
pub struct BridgeHandle {
    calls: mpsc::Sender<Call>,
    events: broadcast::Sender<BridgeEvent>,
}

impl BridgeHandle {
    /// Submit one request and wait for its terminal reply.
    pub async fn invoke(&self, method: impl Into<String>, arguments: Value) -> Reply {
        self.submit(method, arguments).await.reply().await
    }

    /// Queue one request without waiting for its reply. Requests are
    /// dispatched in the order their `submit` calls return.
    pub async fn submit(&self, method: impl Into<String>, arguments: Value) -> ReplyTicket {
        let (reply, rx) = PendingReply::new();
        let call = Call::Invoke {
            method: method.into(),
            arguments,
            reply,
        };
        // On failure the call, and with it the reply, is dropped: `rx`
        // then yields the abandoned error.
        let _ = self.calls.send(call).await;
        ReplyTicket(rx)
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// Registry contents, or `None` if the dispatcher has stopped.
    pub async fn snapshot(&self) -> Option<RegistrySnapshot> {
        let (tx, rx) = oneshot::channel();
        self.calls.send(Call::Snapshot(tx)).await.ok()?;
        rx.await.ok()
    }

    /// Stop the dispatcher, releasing every client. Returns once done.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.calls.send(Call::Shutdown(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtm_core::error::codes;
    use rtm_native::LoopbackSdk;
    use serde_json::json;

    fn start() -> (BridgeHandle, JoinHandle<()>) {
        Dispatcher::spawn(Arc::new(LoopbackSdk::new()), BridgeConfig::default())
    }

    #[tokio::test]
    async fn create_instance_returns_index() {
        let (bridge, _task) = start();
        let reply = bridge
            .invoke(
                "createInstance",
                json!({ "caller": "AgoraRtmClient#static", "arguments": { "appId": "app" } }),
            )
            .await;
        assert_eq!(reply, Reply::success(0));
    }

    #[tokio::test]
    async fn shutdown_releases_clients_and_stops() {
        let sdk = LoopbackSdk::new();
        let (bridge, task) = Dispatcher::spawn(Arc::new(sdk.clone()), BridgeConfig::default());
        bridge
            .invoke(
                "createInstance",
                json!({ "caller": "AgoraRtmClient#static", "arguments": { "appId": "app" } }),
            )
            .await;
        assert_eq!(sdk.live_sessions(), 1);

        bridge.shutdown().await;
        task.await.expect("dispatcher task");
        assert_eq!(sdk.live_sessions(), 0);

        let reply = bridge
            .invoke("getSdkVersion", json!({ "caller": "AgoraRtmClient#static" }))
            .await;
        assert_eq!(reply.error_code(), Some(codes::ABANDONED));
        assert!(bridge.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn dropping_every_handle_stops_the_dispatcher() {
        let sdk = LoopbackSdk::new();
        let (bridge, task) = Dispatcher::spawn(Arc::new(sdk.clone()), BridgeConfig::default());
        bridge
            .invoke(
                "createInstance",
                json!({ "caller": "AgoraRtmClient#static", "arguments": { "appId": "app" } }),
            )
            .await;
        drop(bridge);
        task.await.expect("dispatcher task");
        assert_eq!(sdk.live_sessions(), 0);
    }

    #[tokio::test]
    async fn submitted_requests_dispatch_in_order() {
        let (bridge, _task) = start();
        let created = bridge
            .submit(
                "createInstance",
                json!({ "caller": "AgoraRtmClient#static", "arguments": { "appId": "app" } }),
            )
            .await;
        let login = bridge
            .submit(
                "login",
                json!({ "caller": "AgoraRtmClient", "arguments": { "clientIndex": 0, "args": { "userId": "ann" } } }),
            )
            .await;
        assert_eq!(login.reply().await, Reply::done());
        assert_eq!(created.reply().await, Reply::success(0));
    }

    #[tokio::test]
    async fn zero_queue_depth_is_clamped() {
        let config = BridgeConfig {
            request_queue_depth: 0,
            event_queue_depth: 0,
            ..BridgeConfig::default()
        };
        let (bridge, _task) = Dispatcher::spawn(Arc::new(LoopbackSdk::new()), config);
        let reply = bridge
            .invoke("getSdkVersion", json!({ "caller": "AgoraRtmClient#static" }))
            .await;
        assert!(reply.is_success());
    }
}
