// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Domain types exchanged between the dispatcher and the native SDK seam.
//
// Wire names are camelCase to match the cross-platform application layer.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Registry index of a live client handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIndex(pub u32);

impl std::fmt::Display for ClientIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a call invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvitationKind {
    /// Outgoing, created by this client.
    Local,
    /// Incoming, received from a peer.
    Remote,
}

impl InvitationKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Identity hash under which an invitation is tracked in a client's call state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationHash(pub String);

impl InvitationHash {
    /// Derive the hash from the invitation's direction, owning client, and the
    /// native object identity. Stable for the lifetime of the native object.
    pub fn derive(kind: InvitationKind, client: ClientIndex, native_id: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.tag().as_bytes());
        hasher.update(client.0.to_be_bytes());
        hasher.update(native_id.to_be_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(digest[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvitationHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A peer-to-peer or channel message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtmMessage {
    pub text: String,
    /// Set by the SDK on delivery when the message was stored offline.
    #[serde(default)]
    pub offline: bool,
    /// Server receive timestamp in milliseconds, 0 for outgoing messages.
    #[serde(default)]
    pub server_received_ts: i64,
}

impl RtmMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Delivery options for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendMessageOptions {
    pub enable_offline_messaging: bool,
    pub enable_historical_messaging: bool,
}

/// A user attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtmAttribute {
    pub key: String,
    pub value: String,
}

impl RtmAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A channel attribute. The update metadata is filled in by the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAttribute {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub last_update_user_id: String,
    #[serde(default)]
    pub last_update_ts: i64,
}

impl ChannelAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            last_update_user_id: String::new(),
            last_update_ts: 0,
        }
    }
}

/// Options accompanying every channel-attribute mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelAttributeOptions {
    pub enable_notification_to_channel_members: bool,
}

/// A member of a joined channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMember {
    pub user_id: String,
    pub channel_id: String,
}

/// Result row of a member-count query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMemberCount {
    pub channel_id: String,
    #[serde(rename = "count")]
    pub member_count: u32,
}

/// Encoded online state of a peer. The native layer reports booleans; the
/// application layer always sees one of these two words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerOnlineState {
    Online,
    Offline,
}

impl From<bool> for PeerOnlineState {
    fn from(online: bool) -> Self {
        if online { Self::Online } else { Self::Offline }
    }
}

/// Subscription type used by `queryPeersBySubscriptionOption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerSubscriptionOption {
    OnlineStatus,
}

impl TryFrom<i64> for PeerSubscriptionOption {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, String> {
        match value {
            0 => Ok(Self::OnlineStatus),
            other => Err(format!("unknown subscription option {other}")),
        }
    }
}

/// SDK log verbosity. Discriminants are the SDK's bit masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFilter {
    Off,
    Info,
    Warn,
    Error,
    Critical,
}

impl LogFilter {
    pub fn mask(self) -> i32 {
        match self {
            Self::Off => 0x0000,
            Self::Info => 0x000f,
            Self::Warn => 0x000e,
            Self::Error => 0x000c,
            Self::Critical => 0x0008,
        }
    }
}

impl TryFrom<i64> for LogFilter {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, String> {
        match value {
            0x0000 => Ok(Self::Off),
            0x000f => Ok(Self::Info),
            0x000e => Ok(Self::Warn),
            0x000c => Ok(Self::Error),
            0x0008 => Ok(Self::Critical),
            other => Err(format!("unknown log filter {other:#06x}")),
        }
    }
}

/// Area code mask meaning "all regions".
pub const AREA_CODE_GLOBAL: u32 = 0xFFFF_FFFF;

/// Process-wide service context applied before any client is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceContext {
    pub area_code: u32,
    pub proxy_type: u32,
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self {
            area_code: AREA_CODE_GLOBAL,
            proxy_type: 0,
        }
    }
}

/// Outgoing call invitation as held by the native call manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInvitation {
    /// Identity of the native object; never leaves the bridge.
    pub native_id: u64,
    pub callee_id: String,
    pub content: String,
    pub channel_id: String,
    pub response: String,
    pub state: i32,
}

/// Incoming call invitation as delivered by the native call manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInvitation {
    pub native_id: u64,
    pub caller_id: String,
    pub content: String,
    pub channel_id: String,
    pub response: String,
    pub state: i32,
}
