// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Peer, presence, attribute, and channel traffic between loopback clients.

mod common;

use serde_json::json;

use common::{next_event, start};
use rtm_dispatch::Reply;
use rtm_native::loopback::{connection, status};

#[tokio::test]
async fn online_status_is_encoded_as_words() {
    let h = start();
    let ann = h.logged_in("ann").await;

    let reply = h
        .client(ann, "queryPeersOnlineStatus", json!({ "peerIds": ["ann", "bob"] }))
        .await;
    assert_eq!(reply, Reply::success(json!({ "ann": "online", "bob": "offline" })));
}

#[tokio::test]
async fn login_is_announced_on_the_client_event_channel() {
    let h = start();
    let mut events = h.bridge.subscribe();
    let ann = h.logged_in("ann").await;

    let event = next_event(
        &mut events,
        &format!("io.agora.rtm.client{ann}"),
        "onConnectionStateChanged",
    )
    .await;
    assert_eq!(
        event.payload,
        json!({ "state": connection::CONNECTED, "reason": connection::REASON_LOGIN_SUCCESS })
    );
}

#[tokio::test]
async fn peer_message_reaches_the_other_client() {
    let h = start();
    let ann = h.logged_in("ann").await;
    let bob = h.logged_in("bob").await;
    let mut events = h.bridge.subscribe();

    let reply = h
        .client(
            ann,
            "sendMessageToPeer",
            json!({ "peerId": "bob", "message": { "text": "hello" } }),
        )
        .await;
    assert_eq!(reply, Reply::done());

    let event = next_event(&mut events, &format!("io.agora.rtm.client{bob}"), "onMessageReceived").await;
    assert_eq!(event.payload["peerId"], "ann");
    assert_eq!(event.payload["message"]["text"], "hello");
    assert_eq!(event.payload["message"]["offline"], false);
    assert!(event.payload["message"]["serverReceivedTs"].as_i64().unwrap_or(0) > 0);
}

#[tokio::test]
async fn unreachable_peer_depends_on_offline_messaging() {
    let h = start();
    let ann = h.logged_in("ann").await;
    let message = json!({ "text": "later" });

    let reply = h
        .client(ann, "sendMessageToPeer", json!({ "peerId": "carol", "message": message }))
        .await;
    assert_eq!(reply.error_code(), Some(status::PEER_UNREACHABLE));

    let reply = h
        .client(
            ann,
            "sendMessageToPeer",
            json!({
                "peerId": "carol",
                "message": message,
                "options": { "enableOfflineMessaging": true }
            }),
        )
        .await;
    assert_eq!(reply, Reply::done());
}

#[tokio::test]
async fn subscriptions_report_presence_changes() {
    let h = start();
    let ann = h.logged_in("ann").await;
    let mut events = h.bridge.subscribe();

    let reply = h
        .client(ann, "subscribePeersOnlineStatus", json!({ "peerIds": ["bob"] }))
        .await;
    assert_eq!(reply, Reply::done());
    let reply = h
        .client(ann, "queryPeersBySubscriptionOption", json!({ "option": 0 }))
        .await;
    assert_eq!(reply, Reply::success(json!(["bob"])));

    h.logged_in("bob").await;
    let event = next_event(
        &mut events,
        &format!("io.agora.rtm.client{ann}"),
        "onPeersOnlineStatusChanged",
    )
    .await;
    assert_eq!(event.payload, json!({ "bob": "online" }));

    let reply = h
        .client(ann, "unsubscribePeersOnlineStatus", json!({ "peerIds": ["bob"] }))
        .await;
    assert_eq!(reply, Reply::done());
    let reply = h
        .client(ann, "queryPeersBySubscriptionOption", json!({ "option": 0 }))
        .await;
    assert_eq!(reply, Reply::success(json!([])));
}

#[tokio::test]
async fn local_user_attributes_round_through_the_sdk() {
    let h = start();
    let ann = h.logged_in("ann").await;
    let bob = h.logged_in("bob").await;

    let reply = h
        .client(
            ann,
            "setLocalUserAttributes",
            json!({ "attributes": [{ "key": "mood", "value": "calm" }, { "key": "role", "value": "host" }] }),
        )
        .await;
    assert_eq!(reply, Reply::done());
    h.client(
        ann,
        "addOrUpdateLocalUserAttributes",
        json!({ "attributes": [{ "key": "mood", "value": "busy" }] }),
    )
    .await;

    let reply = h.client(bob, "getUserAttributes", json!({ "userId": "ann" })).await;
    assert_eq!(
        reply,
        Reply::success(json!([
            { "key": "mood", "value": "busy" },
            { "key": "role", "value": "host" }
        ]))
    );

    h.client(ann, "deleteLocalUserAttributesByKeys", json!({ "attributeKeys": ["mood"] }))
        .await;
    let reply = h
        .client(bob, "getUserAttributesByKeys", json!({ "userId": "ann", "attributeKeys": ["mood", "role"] }))
        .await;
    assert_eq!(reply, Reply::success(json!([{ "key": "role", "value": "host" }])));

    h.client(ann, "clearLocalUserAttributes", json!({})).await;
    let reply = h.client(bob, "getUserAttributes", json!({ "userId": "ann" })).await;
    assert_eq!(reply, Reply::success(json!([])));
}

#[tokio::test]
async fn channel_traffic_and_member_events() {
    let h = start();
    let ann = h.logged_in("ann").await;
    let bob = h.logged_in("bob").await;
    h.joined(ann, "lobby").await;

    let mut events = h.bridge.subscribe();
    h.joined(bob, "lobby").await;
    let ann_lobby = format!("io.agora.rtm.client{ann}.channellobby");
    let bob_lobby = format!("io.agora.rtm.client{bob}.channellobby");

    let joined = next_event(&mut events, &ann_lobby, "onMemberJoined").await;
    assert_eq!(joined.payload, json!({ "userId": "bob", "channelId": "lobby" }));
    let count = next_event(&mut events, &ann_lobby, "onMemberCountUpdated").await;
    assert_eq!(count.payload, json!({ "memberCount": 2 }));

    let reply = h
        .channel(bob, "lobby", "sendMessage", json!({ "message": { "text": "hi all" } }))
        .await;
    assert_eq!(reply, Reply::done());
    let message = next_event(&mut events, &ann_lobby, "onMessageReceived").await;
    assert_eq!(message.payload["userId"], "bob");
    assert_eq!(message.payload["message"]["text"], "hi all");

    let reply = h.channel(ann, "lobby", "getMembers", json!({})).await;
    assert_eq!(
        reply,
        Reply::success(json!([
            { "userId": "ann", "channelId": "lobby" },
            { "userId": "bob", "channelId": "lobby" }
        ]))
    );

    let reply = h
        .client(ann, "getChannelMemberCount", json!({ "channelIds": ["lobby", "empty"] }))
        .await;
    assert_eq!(
        reply,
        Reply::success(json!([
            { "channelId": "lobby", "count": 2 },
            { "channelId": "empty", "count": 0 }
        ]))
    );

    assert_eq!(h.channel(ann, "lobby", "leave", json!({})).await, Reply::done());
    let left = next_event(&mut events, &bob_lobby, "onMemberLeft").await;
    assert_eq!(left.payload, json!({ "userId": "ann", "channelId": "lobby" }));

    let reply = h.channel(ann, "lobby", "leave", json!({})).await;
    assert_eq!(reply.error_code(), Some(status::NOT_JOINED));
}

#[tokio::test]
async fn channel_attributes_notify_members_on_request() {
    let h = start();
    let ann = h.logged_in("ann").await;
    h.joined(ann, "lobby").await;
    let mut events = h.bridge.subscribe();

    let reply = h
        .client(
            ann,
            "setChannelAttributes",
            json!({
                "channelId": "lobby",
                "attributes": [{ "key": "topic", "value": "rust" }],
                "option": { "enableNotificationToChannelMembers": true }
            }),
        )
        .await;
    assert_eq!(reply, Reply::done());
    let event = next_event(
        &mut events,
        &format!("io.agora.rtm.client{ann}.channellobby"),
        "onAttributesUpdated",
    )
    .await;
    assert_eq!(event.payload["attributes"][0]["key"], "topic");
    assert_eq!(event.payload["attributes"][0]["lastUpdateUserId"], "ann");

    let reply = h
        .client(ann, "getChannelAttributesByKeys", json!({ "channelId": "lobby", "attributeKeys": ["topic"] }))
        .await;
    let value = reply.value().cloned().unwrap_or_default();
    assert_eq!(value[0]["value"], "rust");
    assert!(value[0]["lastUpdateTs"].as_i64().unwrap_or(0) > 0);

    h.client(ann, "clearChannelAttributes", json!({ "channelId": "lobby" })).await;
    let reply = h.client(ann, "getChannelAttributes", json!({ "channelId": "lobby" })).await;
    assert_eq!(reply, Reply::success(json!([])));
}

#[tokio::test]
async fn channel_attributes_merge_and_delete_by_key() {
    let h = start();
    let ann = h.logged_in("ann").await;

    for (key, value) in [("topic", "rust"), ("mode", "open"), ("topic", "tokio")] {
        let reply = h
            .client(
                ann,
                "addOrUpdateChannelAttributes",
                json!({ "channelId": "lobby", "attributes": [{ "key": key, "value": value }] }),
            )
            .await;
        assert_eq!(reply, Reply::done());
    }
    let reply = h.client(ann, "getChannelAttributes", json!({ "channelId": "lobby" })).await;
    let value = reply.value().cloned().unwrap_or_default();
    assert_eq!(value.as_array().map(Vec::len), Some(2));
    assert_eq!(value[0]["key"], "mode");
    assert_eq!(value[1]["value"], "tokio");

    let reply = h
        .client(
            ann,
            "deleteChannelAttributesByKeys",
            json!({ "channelId": "lobby", "attributeKeys": ["mode", "absent"] }),
        )
        .await;
    assert_eq!(reply, Reply::done());
    let reply = h.client(ann, "getChannelAttributes", json!({ "channelId": "lobby" })).await;
    let value = reply.value().cloned().unwrap_or_default();
    assert_eq!(value.as_array().map(Vec::len), Some(1));
    assert_eq!(value[0]["key"], "topic");
}

#[tokio::test]
async fn renew_token_requires_a_token() {
    let h = start();
    let ann = h.logged_in("ann").await;
    let reply = h.client(ann, "renewToken", json!({ "token": "fresh" })).await;
    assert_eq!(reply, Reply::done());
    let reply = h.client(ann, "renewToken", json!({})).await;
    assert_eq!(reply.error_code(), Some(rtm_core::error::codes::DECODE));
}
