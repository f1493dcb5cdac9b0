// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Listener events raised by the native SDK.

use std::collections::BTreeMap;
use std::sync::Arc;

use rtm_core::{ChannelAttribute, LocalInvitation, RemoteInvitation, RtmMessage};

/// Lifecycle notifications for an outgoing invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalInvitationEvent {
    ReceivedByPeer,
    Accepted,
    Refused,
    Canceled,
    Failure(i32),
}

/// Lifecycle notifications for an incoming invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteInvitationEvent {
    Received,
    Accepted,
    Refused,
    Canceled,
    Failure(i32),
}

/// Everything a client, its channels, or its call manager can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeEvent {
    // -- Client --
    ConnectionStateChanged { state: i32, reason: i32 },
    MessageReceived { message: RtmMessage, peer_id: String },
    TokenExpired,
    PeersOnlineStatusChanged(BTreeMap<String, bool>),

    // -- Channel --
    ChannelMessageReceived {
        channel_id: String,
        message: RtmMessage,
        user_id: String,
    },
    MemberJoined { channel_id: String, user_id: String },
    MemberLeft { channel_id: String, user_id: String },
    AttributesUpdated {
        channel_id: String,
        attributes: Vec<ChannelAttribute>,
    },
    MemberCountUpdated { channel_id: String, member_count: u32 },

    // -- Call manager --
    LocalInvitation {
        event: LocalInvitationEvent,
        invitation: LocalInvitation,
    },
    RemoteInvitation {
        event: RemoteInvitationEvent,
        invitation: RemoteInvitation,
    },
}

impl NativeEvent {
    /// The channel an event belongs to, if it is channel-scoped.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::ChannelMessageReceived { channel_id, .. }
            | Self::MemberJoined { channel_id, .. }
            | Self::MemberLeft { channel_id, .. }
            | Self::AttributesUpdated { channel_id, .. }
            | Self::MemberCountUpdated { channel_id, .. } => Some(channel_id),
            _ => None,
        }
    }
}

/// Thread-safe listener handed to the SDK. Cheap to clone.
#[derive(Clone)]
pub struct EventSink(Arc<dyn Fn(NativeEvent) + Send + Sync>);

impl EventSink {
    pub fn new(listener: impl Fn(NativeEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(listener))
    }

    /// A sink that drops everything.
    pub fn discard() -> Self {
        Self::new(|_| {})
    }

    pub fn emit(&self, event: NativeEvent) {
        (self.0)(event);
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventSink")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn sink_forwards_to_listener() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            EventSink::new(move |event| seen.lock().expect("lock").push(event))
        };
        sink.clone().emit(NativeEvent::TokenExpired);
        assert_eq!(*seen.lock().expect("lock"), vec![NativeEvent::TokenExpired]);
    }

    #[test]
    fn channel_scope() {
        let joined = NativeEvent::MemberJoined {
            channel_id: "lobby".into(),
            user_id: "ann".into(),
        };
        assert_eq!(joined.channel_id(), Some("lobby"));
        assert_eq!(NativeEvent::TokenExpired.channel_id(), None);
    }
}
