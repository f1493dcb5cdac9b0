// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared harness: a dispatcher running against an in-process loopback SDK.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use rtm_core::BridgeConfig;
use rtm_dispatch::{BridgeEvent, BridgeHandle, Dispatcher, Reply};
use rtm_native::LoopbackSdk;

pub const STATIC: &str = "AgoraRtmClient#static";
pub const CLIENT: &str = "AgoraRtmClient";
pub const CHANNEL: &str = "AgoraRtmChannel";
pub const CALL_MANAGER: &str = "AgoraRtmCallManager";

pub struct Harness {
    pub bridge: BridgeHandle,
    pub sdk: LoopbackSdk,
    pub task: JoinHandle<()>,
}

pub fn start() -> Harness {
    start_with(BridgeConfig::default())
}

pub fn start_with(config: BridgeConfig) -> Harness {
    let sdk = LoopbackSdk::new();
    let (bridge, task) = Dispatcher::spawn(Arc::new(sdk.clone()), config);
    Harness { bridge, sdk, task }
}

impl Harness {
    pub async fn call(&self, caller: &str, method: &str, arguments: Value) -> Reply {
        self.bridge
            .invoke(method, json!({ "caller": caller, "arguments": arguments }))
            .await
    }

    pub async fn create_client(&self) -> u64 {
        let reply = self.call(STATIC, "createInstance", json!({ "appId": "test-app" })).await;
        reply
            .value()
            .and_then(Value::as_u64)
            .unwrap_or_else(|| panic!("createInstance failed: {reply:?}"))
    }

    pub async fn logged_in(&self, user_id: &str) -> u64 {
        let index = self.create_client().await;
        let reply = self.client(index, "login", json!({ "userId": user_id })).await;
        assert!(reply.is_success(), "login failed: {reply:?}");
        index
    }

    pub async fn client(&self, index: u64, method: &str, args: Value) -> Reply {
        self.call(CLIENT, method, json!({ "clientIndex": index, "args": args }))
            .await
    }

    pub async fn channel(&self, index: u64, channel_id: &str, method: &str, args: Value) -> Reply {
        self.call(
            CHANNEL,
            method,
            json!({ "clientIndex": index, "channelId": channel_id, "args": args }),
        )
        .await
    }

    pub async fn call_manager(&self, index: u64, method: &str, args: Value) -> Reply {
        self.call(CALL_MANAGER, method, json!({ "clientIndex": index, "args": args }))
            .await
    }

    /// Create and join a channel.
    pub async fn joined(&self, index: u64, channel_id: &str) {
        let reply = self.client(index, "createChannel", json!({ "channelId": channel_id })).await;
        assert!(reply.is_success(), "createChannel failed: {reply:?}");
        let reply = self.channel(index, channel_id, "join", json!({})).await;
        assert!(reply.is_success(), "join failed: {reply:?}");
    }
}

/// Wait for the next event with the given name on the given event channel.
pub async fn next_event(
    events: &mut broadcast::Receiver<BridgeEvent>,
    channel: &str,
    name: &str,
) -> BridgeEvent {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if event.channel == channel && event.event == name => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("event stream closed: {e}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {name} on {channel}"))
}
