// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Encode native results and events as plain JSON payloads.
//
// Lists encode as ordered sequences of flat records. Online-status maps
// encode peer -> "online" | "offline", never raw booleans.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use rtm_core::{
    ChannelAttribute, ChannelMember, ChannelMemberCount, InvitationHash, LocalInvitation,
    PeerOnlineState, RemoteInvitation, RtmAttribute, RtmMessage,
};

fn online_word(online: bool) -> &'static str {
    match PeerOnlineState::from(online) {
        PeerOnlineState::Online => "online",
        PeerOnlineState::Offline => "offline",
    }
}

pub fn online_status(status: &BTreeMap<String, bool>) -> Value {
    let encoded: Map<String, Value> = status
        .iter()
        .map(|(peer, online)| (peer.clone(), Value::from(online_word(*online))))
        .collect();
    Value::Object(encoded)
}

pub fn peer_ids(peers: &BTreeSet<String>) -> Value {
    peers.iter().cloned().collect()
}

pub fn message(message: &RtmMessage) -> Value {
    json!({
        "text": message.text,
        "offline": message.offline,
        "serverReceivedTs": message.server_received_ts,
    })
}

pub fn attributes(attributes: &[RtmAttribute]) -> Value {
    attributes
        .iter()
        .map(|a| json!({ "key": a.key, "value": a.value }))
        .collect()
}

pub fn channel_attributes(attributes: &[ChannelAttribute]) -> Value {
    attributes
        .iter()
        .map(|a| {
            json!({
                "key": a.key,
                "value": a.value,
                "lastUpdateUserId": a.last_update_user_id,
                "lastUpdateTs": a.last_update_ts,
            })
        })
        .collect()
}

pub fn members(members: &[ChannelMember]) -> Value {
    members
        .iter()
        .map(|m| json!({ "userId": m.user_id, "channelId": m.channel_id }))
        .collect()
}

pub fn member_counts(counts: &[ChannelMemberCount]) -> Value {
    counts
        .iter()
        .map(|c| json!({ "channelId": c.channel_id, "count": c.member_count }))
        .collect()
}

pub fn local_invitation(
    hash: &InvitationHash,
    invitation: &LocalInvitation,
    created_at: DateTime<Utc>,
) -> Value {
    json!({
        "hash": hash,
        "calleeId": invitation.callee_id,
        "content": invitation.content,
        "channelId": invitation.channel_id,
        "response": invitation.response,
        "state": invitation.state,
        "createdAt": created_at.to_rfc3339(),
    })
}

pub fn remote_invitation(
    hash: &InvitationHash,
    invitation: &RemoteInvitation,
    created_at: DateTime<Utc>,
) -> Value {
    json!({
        "hash": hash,
        "callerId": invitation.caller_id,
        "content": invitation.content,
        "channelId": invitation.channel_id,
        "response": invitation.response,
        "state": invitation.state,
        "createdAt": created_at.to_rfc3339(),
    })
}
