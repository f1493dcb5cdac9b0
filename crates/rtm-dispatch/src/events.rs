// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native listener events, republished to the application layer.
//
// Events reach this module as jobs on the dispatcher task, tagged with the
// generation of the client (and channel) whose listener fired. Anything for a
// handle that has since been released, or replaced under the same index, is
// dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, trace};

use rtm_core::{ClientIndex, InvitationHash, InvitationKind};
use rtm_native::{LocalInvitationEvent, NativeEvent, RemoteInvitationEvent};

use crate::bridge::Bridge;
use crate::marshal;
use crate::registry::{ClientHandle, Tracked};

/// One event on a named event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEvent {
    /// `<channel_name>.client<index>` or `<channel_name>.client<index>.channel<id>`.
    pub channel: String,
    pub event: String,
    pub payload: Value,
}

impl Bridge {
    pub(crate) fn on_client_event(&mut self, index: ClientIndex, generation: u64, event: NativeEvent) {
        let Some(handle) = self.registry.live(index, generation) else {
            debug!(client_index = %index, "event for released client dropped");
            return;
        };
        let (name, payload) = match event {
            NativeEvent::ConnectionStateChanged { state, reason } => (
                "onConnectionStateChanged",
                json!({ "state": state, "reason": reason }),
            ),
            NativeEvent::MessageReceived { message, peer_id } => (
                "onMessageReceived",
                json!({ "message": marshal::message(&message), "peerId": peer_id }),
            ),
            NativeEvent::TokenExpired => ("onTokenExpired", Value::Null),
            NativeEvent::PeersOnlineStatusChanged(status) => {
                ("onPeersOnlineStatusChanged", marshal::online_status(&status))
            }
            NativeEvent::LocalInvitation { event, invitation } => {
                local_invitation_event(handle, event, invitation)
            }
            NativeEvent::RemoteInvitation { event, invitation } => {
                remote_invitation_event(handle, event, invitation)
            }
            other => {
                debug!(client_index = %index, ?other, "channel event on client listener dropped");
                return;
            }
        };
        let channel = self.config.client_event_channel(index);
        self.publish(channel, name, payload);
    }

    pub(crate) fn on_channel_event(
        &mut self,
        index: ClientIndex,
        client_generation: u64,
        channel_id: &str,
        channel_generation: u64,
        event: NativeEvent,
    ) {
        let live = self
            .registry
            .live(index, client_generation)
            .and_then(|handle| handle.channels.get(channel_id))
            .is_some_and(|channel| channel.generation == channel_generation);
        if !live {
            debug!(client_index = %index, channel_id, "event for released channel dropped");
            return;
        }
        if event.channel_id() != Some(channel_id) {
            debug!(client_index = %index, channel_id, event_channel = ?event.channel_id(), "event outside listener channel dropped");
            return;
        }
        let (name, payload) = match event {
            NativeEvent::ChannelMessageReceived {
                message, user_id, ..
            } => (
                "onMessageReceived",
                json!({ "message": marshal::message(&message), "userId": user_id }),
            ),
            NativeEvent::MemberJoined {
                channel_id,
                user_id,
            } => (
                "onMemberJoined",
                json!({ "userId": user_id, "channelId": channel_id }),
            ),
            NativeEvent::MemberLeft {
                channel_id,
                user_id,
            } => (
                "onMemberLeft",
                json!({ "userId": user_id, "channelId": channel_id }),
            ),
            NativeEvent::AttributesUpdated { attributes, .. } => (
                "onAttributesUpdated",
                json!({ "attributes": marshal::channel_attributes(&attributes) }),
            ),
            NativeEvent::MemberCountUpdated { member_count, .. } => (
                "onMemberCountUpdated",
                json!({ "memberCount": member_count }),
            ),
            // Only channel-scoped events get past the check above.
            _ => return,
        };
        let channel = self.config.channel_event_channel(index, channel_id);
        self.publish(channel, name, payload);
    }

    fn publish(&self, channel: String, event: &str, payload: Value) {
        let event = BridgeEvent {
            channel,
            event: event.to_string(),
            payload,
        };
        if self.events.send(event).is_err() {
            trace!("no event subscribers");
        }
    }
}

fn local_invitation_event(
    handle: &mut ClientHandle,
    event: LocalInvitationEvent,
    invitation: rtm_core::LocalInvitation,
) -> (&'static str, Value) {
    let hash = InvitationHash::derive(InvitationKind::Local, handle.index, invitation.native_id);
    let created_at = match handle.call.outgoing.get_mut(&hash) {
        Some(tracked) => {
            tracked.invitation.state = invitation.state;
            tracked.invitation.response = invitation.response.clone();
            tracked.created_at
        }
        None => chrono::Utc::now(),
    };
    let mut payload = json!({
        "localInvitation": marshal::local_invitation(&hash, &invitation, created_at),
    });
    let name = match event {
        LocalInvitationEvent::ReceivedByPeer => "onLocalInvitationReceivedByPeer",
        LocalInvitationEvent::Accepted => "onLocalInvitationAccepted",
        LocalInvitationEvent::Refused => "onLocalInvitationRefused",
        LocalInvitationEvent::Canceled => "onLocalInvitationCanceled",
        LocalInvitationEvent::Failure(code) => {
            payload["errorCode"] = json!(code);
            "onLocalInvitationFailure"
        }
    };
    (name, payload)
}

fn remote_invitation_event(
    handle: &mut ClientHandle,
    event: RemoteInvitationEvent,
    invitation: rtm_core::RemoteInvitation,
) -> (&'static str, Value) {
    let hash = InvitationHash::derive(InvitationKind::Remote, handle.index, invitation.native_id);
    let created_at = match handle.call.incoming.get_mut(&hash) {
        Some(tracked) => {
            tracked.invitation.state = invitation.state;
            tracked.invitation.response = invitation.response.clone();
            tracked.created_at
        }
        None if event == RemoteInvitationEvent::Received => {
            let tracked = Tracked::new(invitation.clone());
            let created_at = tracked.created_at;
            handle.call.incoming.insert(hash.clone(), tracked);
            debug!(client_index = %handle.index, hash = %hash, "remote invitation registered");
            created_at
        }
        None => chrono::Utc::now(),
    };
    let mut payload = json!({
        "remoteInvitation": marshal::remote_invitation(&hash, &invitation, created_at),
    });
    let name = match event {
        RemoteInvitationEvent::Received => "onRemoteInvitationReceived",
        RemoteInvitationEvent::Accepted => "onRemoteInvitationAccepted",
        RemoteInvitationEvent::Refused => "onRemoteInvitationRefused",
        RemoteInvitationEvent::Canceled => "onRemoteInvitationCanceled",
        RemoteInvitationEvent::Failure(code) => {
            payload["errorCode"] = json!(code);
            "onRemoteInvitationFailure"
        }
    };
    (name, payload)
}
