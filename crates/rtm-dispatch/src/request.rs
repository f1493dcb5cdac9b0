// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-method typed requests, decoded once at the dispatch boundary.

use std::collections::BTreeSet;

use serde::Deserialize;

use rtm_core::error::Result;
use rtm_core::{
    ChannelAttribute, ChannelAttributeOptions, InvitationHash, LogFilter, PeerSubscriptionOption,
    RtmAttribute, RtmMessage, SendMessageOptions, ServiceContext,
};

use crate::args::Args;
use crate::router::{CallMethod, ChannelMethod, ClientMethod, StaticMethod};

#[derive(Debug, Clone, PartialEq)]
pub enum StaticRequest {
    CreateInstance { app_id: String },
    GetSdkVersion,
    SetRtmServiceContext { context: ServiceContext },
}

impl StaticRequest {
    pub fn decode(method: StaticMethod, args: &Args<'_>) -> Result<Self> {
        Ok(match method {
            StaticMethod::CreateInstance => Self::CreateInstance {
                app_id: args.str("appId")?,
            },
            StaticMethod::GetSdkVersion => Self::GetSdkVersion,
            StaticMethod::SetRtmServiceContext => Self::SetRtmServiceContext {
                context: args.opt_value("context")?.unwrap_or_default(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    Release,
    Login {
        token: Option<String>,
        user_id: String,
    },
    Logout,
    SendMessageToPeer {
        peer_id: String,
        message: RtmMessage,
        options: SendMessageOptions,
    },
    CreateChannel {
        channel_id: String,
    },
    QueryPeersOnlineStatus {
        peer_ids: BTreeSet<String>,
    },
    SubscribePeersOnlineStatus {
        peer_ids: BTreeSet<String>,
    },
    UnsubscribePeersOnlineStatus {
        peer_ids: BTreeSet<String>,
    },
    QueryPeersBySubscriptionOption {
        option: PeerSubscriptionOption,
    },
    RenewToken {
        token: String,
    },
    SetLocalUserAttributes {
        attributes: Vec<RtmAttribute>,
    },
    AddOrUpdateLocalUserAttributes {
        attributes: Vec<RtmAttribute>,
    },
    DeleteLocalUserAttributesByKeys {
        keys: Vec<String>,
    },
    ClearLocalUserAttributes,
    GetUserAttributes {
        user_id: String,
    },
    GetUserAttributesByKeys {
        user_id: String,
        keys: Vec<String>,
    },
    SetChannelAttributes {
        channel_id: String,
        attributes: Vec<ChannelAttribute>,
        options: ChannelAttributeOptions,
    },
    AddOrUpdateChannelAttributes {
        channel_id: String,
        attributes: Vec<ChannelAttribute>,
        options: ChannelAttributeOptions,
    },
    DeleteChannelAttributesByKeys {
        channel_id: String,
        keys: Vec<String>,
        options: ChannelAttributeOptions,
    },
    ClearChannelAttributes {
        channel_id: String,
        options: ChannelAttributeOptions,
    },
    GetChannelAttributes {
        channel_id: String,
    },
    GetChannelAttributesByKeys {
        channel_id: String,
        keys: Vec<String>,
    },
    GetChannelMemberCount {
        channel_ids: Vec<String>,
    },
    SetParameters {
        parameters: String,
    },
    SetLogFile {
        file_path: String,
    },
    SetLogFilter {
        filter: LogFilter,
    },
    SetLogFileSize {
        file_size_kb: u32,
    },
}

impl ClientRequest {
    pub fn decode(method: ClientMethod, args: &Args<'_>) -> Result<Self> {
        let peer_set = |field: &str| -> Result<BTreeSet<String>> {
            Ok(args.str_list(field)?.into_iter().collect())
        };
        let attr_options = || -> Result<ChannelAttributeOptions> {
            Ok(args.opt_value("option")?.unwrap_or_default())
        };

        Ok(match method {
            ClientMethod::Release => Self::Release,
            ClientMethod::Login => Self::Login {
                token: args.opt_str("token")?,
                user_id: args.str("userId")?,
            },
            ClientMethod::Logout => Self::Logout,
            ClientMethod::SendMessageToPeer => Self::SendMessageToPeer {
                peer_id: args.str("peerId")?,
                message: args.value("message")?,
                options: args.opt_value("options")?.unwrap_or_default(),
            },
            ClientMethod::CreateChannel => Self::CreateChannel {
                channel_id: args.str("channelId")?,
            },
            ClientMethod::QueryPeersOnlineStatus => Self::QueryPeersOnlineStatus {
                peer_ids: peer_set("peerIds")?,
            },
            ClientMethod::SubscribePeersOnlineStatus => Self::SubscribePeersOnlineStatus {
                peer_ids: peer_set("peerIds")?,
            },
            ClientMethod::UnsubscribePeersOnlineStatus => Self::UnsubscribePeersOnlineStatus {
                peer_ids: peer_set("peerIds")?,
            },
            ClientMethod::QueryPeersBySubscriptionOption => Self::QueryPeersBySubscriptionOption {
                option: args.int_as("option")?,
            },
            ClientMethod::RenewToken => Self::RenewToken {
                token: args.str("token")?,
            },
            ClientMethod::SetLocalUserAttributes => Self::SetLocalUserAttributes {
                attributes: args.value("attributes")?,
            },
            ClientMethod::AddOrUpdateLocalUserAttributes => Self::AddOrUpdateLocalUserAttributes {
                attributes: args.value("attributes")?,
            },
            ClientMethod::DeleteLocalUserAttributesByKeys => {
                Self::DeleteLocalUserAttributesByKeys {
                    keys: args.str_list("attributeKeys")?,
                }
            }
            ClientMethod::ClearLocalUserAttributes => Self::ClearLocalUserAttributes,
            ClientMethod::GetUserAttributes => Self::GetUserAttributes {
                user_id: args.str("userId")?,
            },
            ClientMethod::GetUserAttributesByKeys => Self::GetUserAttributesByKeys {
                user_id: args.str("userId")?,
                keys: args.str_list("attributeKeys")?,
            },
            ClientMethod::SetChannelAttributes => Self::SetChannelAttributes {
                channel_id: args.str("channelId")?,
                attributes: args.value("attributes")?,
                options: attr_options()?,
            },
            ClientMethod::AddOrUpdateChannelAttributes => Self::AddOrUpdateChannelAttributes {
                channel_id: args.str("channelId")?,
                attributes: args.value("attributes")?,
                options: attr_options()?,
            },
            ClientMethod::DeleteChannelAttributesByKeys => Self::DeleteChannelAttributesByKeys {
                channel_id: args.str("channelId")?,
                keys: args.str_list("attributeKeys")?,
                options: attr_options()?,
            },
            ClientMethod::ClearChannelAttributes => Self::ClearChannelAttributes {
                channel_id: args.str("channelId")?,
                options: attr_options()?,
            },
            ClientMethod::GetChannelAttributes => Self::GetChannelAttributes {
                channel_id: args.str("channelId")?,
            },
            ClientMethod::GetChannelAttributesByKeys => Self::GetChannelAttributesByKeys {
                channel_id: args.str("channelId")?,
                keys: args.str_list("attributeKeys")?,
            },
            ClientMethod::GetChannelMemberCount => Self::GetChannelMemberCount {
                channel_ids: args.str_list("channelIds")?,
            },
            ClientMethod::SetParameters => Self::SetParameters {
                parameters: args.str("parameters")?,
            },
            ClientMethod::SetLogFile => Self::SetLogFile {
                file_path: args.str("filePath")?,
            },
            ClientMethod::SetLogFilter => Self::SetLogFilter {
                filter: args.int_as("filter")?,
            },
            ClientMethod::SetLogFileSize => Self::SetLogFileSize {
                file_size_kb: args.int_as("fileSizeInKBytes")?,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelRequest {
    Join,
    Leave,
    SendMessage {
        message: RtmMessage,
        options: SendMessageOptions,
    },
    GetMembers,
    Release,
}

impl ChannelRequest {
    pub fn decode(method: ChannelMethod, args: &Args<'_>) -> Result<Self> {
        Ok(match method {
            ChannelMethod::Join => Self::Join,
            ChannelMethod::Leave => Self::Leave,
            ChannelMethod::SendMessage => Self::SendMessage {
                message: args.value("message")?,
                options: args.opt_value("options")?.unwrap_or_default(),
            },
            ChannelMethod::GetMembers => Self::GetMembers,
            ChannelMethod::Release => Self::Release,
        })
    }
}

/// Reference to a tracked invitation plus optional field overrides applied
/// before the native call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationRef {
    pub hash: InvitationHash,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallRequest {
    CreateLocalInvitation { callee_id: String },
    SendLocalInvitation(InvitationRef),
    AcceptRemoteInvitation(InvitationRef),
    RefuseRemoteInvitation(InvitationRef),
    CancelLocalInvitation(InvitationRef),
}

impl CallRequest {
    pub fn decode(method: CallMethod, args: &Args<'_>) -> Result<Self> {
        Ok(match method {
            CallMethod::CreateLocalInvitation => Self::CreateLocalInvitation {
                callee_id: args.str("calleeId")?,
            },
            CallMethod::SendLocalInvitation => {
                Self::SendLocalInvitation(args.value("localInvitation")?)
            }
            CallMethod::AcceptRemoteInvitation => {
                Self::AcceptRemoteInvitation(args.value("remoteInvitation")?)
            }
            CallMethod::RefuseRemoteInvitation => {
                Self::RefuseRemoteInvitation(args.value("remoteInvitation")?)
            }
            CallMethod::CancelLocalInvitation => {
                Self::CancelLocalInvitation(args.value("localInvitation")?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtm_core::error::codes;
    use serde_json::{Map, Value, json};

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn login_token_is_optional() {
        let m = map(json!({ "userId": "ann" }));
        let request = ClientRequest::decode(ClientMethod::Login, &Args::new("login", &m))
            .expect("decode");
        assert_eq!(
            request,
            ClientRequest::Login {
                token: None,
                user_id: "ann".into()
            }
        );
    }

    #[test]
    fn send_message_requires_a_message_object() {
        let m = map(json!({ "peerId": "bob", "message": "hi" }));
        let err = ClientRequest::decode(
            ClientMethod::SendMessageToPeer,
            &Args::new("sendMessageToPeer", &m),
        )
        .expect_err("message must be an object");
        assert_eq!(err.code(), codes::DECODE);
        assert!(err.to_string().contains("`message`"));
    }

    #[test]
    fn channel_attribute_options_default_when_absent() {
        let m = map(json!({
            "channelId": "lobby",
            "attributes": [{ "key": "topic", "value": "rust" }]
        }));
        let request = ClientRequest::decode(
            ClientMethod::SetChannelAttributes,
            &Args::new("setChannelAttributes", &m),
        )
        .expect("decode");
        let ClientRequest::SetChannelAttributes { options, attributes, .. } = request else {
            panic!("wrong variant");
        };
        assert!(!options.enable_notification_to_channel_members);
        assert_eq!(attributes, vec![ChannelAttribute::new("topic", "rust")]);
    }

    #[test]
    fn log_filter_decodes_from_mask() {
        let m = map(json!({ "filter": 0x0e }));
        let request = ClientRequest::decode(ClientMethod::SetLogFilter, &Args::new("setLogFilter", &m))
            .expect("decode");
        assert_eq!(request, ClientRequest::SetLogFilter { filter: LogFilter::Warn });
    }

    #[test]
    fn negative_log_file_size_is_a_decode_error() {
        let m = map(json!({ "fileSizeInKBytes": -1 }));
        let err = ClientRequest::decode(
            ClientMethod::SetLogFileSize,
            &Args::new("setLogFileSize", &m),
        )
        .expect_err("negative");
        assert!(err.to_string().contains("`fileSizeInKBytes`"));
    }

    #[test]
    fn invitation_ref_requires_hash() {
        let m = map(json!({ "remoteInvitation": { "response": "busy" } }));
        let err = CallRequest::decode(
            CallMethod::RefuseRemoteInvitation,
            &Args::new("refuseRemoteInvitation", &m),
        )
        .expect_err("no hash");
        assert!(err.to_string().contains("`remoteInvitation`"));
    }

    #[test]
    fn invitation_ref_carries_overrides() {
        let m = map(json!({ "localInvitation": { "hash": "abc", "content": "hello" } }));
        let request = CallRequest::decode(
            CallMethod::SendLocalInvitation,
            &Args::new("sendLocalInvitation", &m),
        )
        .expect("decode");
        let CallRequest::SendLocalInvitation(reference) = request else {
            panic!("wrong variant");
        };
        assert_eq!(reference.hash.as_str(), "abc");
        assert_eq!(reference.content.as_deref(), Some("hello"));
        assert_eq!(reference.channel_id, None);
    }

    #[test]
    fn service_context_defaults_when_absent() {
        let m = Map::new();
        let request = StaticRequest::decode(
            StaticMethod::SetRtmServiceContext,
            &Args::new("setRtmServiceContext", &m),
        )
        .expect("decode");
        assert_eq!(
            request,
            StaticRequest::SetRtmServiceContext {
                context: ServiceContext::default()
            }
        );
    }
}
