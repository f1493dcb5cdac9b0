// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the dispatch path: routing and envelope parsing
// on their own, then a full request round trip through a running dispatcher
// backed by the loopback SDK.

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;
use tokio::runtime::Runtime;

use rtm_core::BridgeConfig;
use rtm_dispatch::args::Envelope;
use rtm_dispatch::{Dispatcher, Route};
use rtm_native::LoopbackSdk;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_route_parse(c: &mut Criterion) {
    c.bench_function("route_parse (last client method)", |b| {
        b.iter(|| Route::parse(black_box(Some("AgoraRtmClient")), black_box("setLogFileSize")));
    });
}

fn bench_envelope(c: &mut Criterion) {
    let call = json!({
        "caller": "AgoraRtmClient",
        "arguments": {
            "clientIndex": 3,
            "args": {
                "peerId": "bob",
                "message": { "text": "hello" },
                "options": { "enableOfflineMessaging": true }
            }
        }
    });
    c.bench_function("envelope_from_call (sendMessageToPeer)", |b| {
        b.iter(|| Envelope::from_call(black_box(&call)));
    });
}

/// One `queryPeersOnlineStatus` request: dispatcher hop, loopback query on
/// a completion thread, and the reply back through the inbox.
fn bench_invoke_round_trip(c: &mut Criterion) {
    let runtime = Runtime::new().expect("tokio runtime");
    let bridge = runtime.block_on(async {
        let (bridge, _task) = Dispatcher::spawn(Arc::new(LoopbackSdk::new()), BridgeConfig::default());
        bridge
            .invoke(
                "createInstance",
                json!({ "caller": "AgoraRtmClient#static", "arguments": { "appId": "bench" } }),
            )
            .await;
        bridge
            .invoke(
                "login",
                json!({ "caller": "AgoraRtmClient", "arguments": { "clientIndex": 0, "args": { "userId": "ann" } } }),
            )
            .await;
        bridge
    });
    let request = json!({
        "caller": "AgoraRtmClient",
        "arguments": { "clientIndex": 0, "args": { "peerIds": ["ann", "bob"] } }
    });

    c.bench_function("invoke_round_trip (queryPeersOnlineStatus)", |b| {
        b.iter(|| {
            let reply = runtime.block_on(bridge.invoke("queryPeersOnlineStatus", request.clone()));
            black_box(reply);
        });
    });
}

criterion_group!(benches, bench_route_parse, bench_envelope, bench_invoke_round_trip);
criterion_main!(benches);
