// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the native RTM SDK.
//
// Asynchronous operations never block: they take a `Completion` and return
// immediately. The SDK invokes the completion exactly once, from whatever
// thread it likes. Synchronous configuration calls return the SDK status code
// (0 on success).

use std::collections::{BTreeMap, BTreeSet};

use rtm_core::{
    ChannelAttribute, ChannelAttributeOptions, ChannelMember, ChannelMemberCount, LocalInvitation,
    LogFilter, NativeError, PeerSubscriptionOption, RemoteInvitation, RtmAttribute, RtmMessage,
    SendMessageOptions, ServiceContext,
};

use crate::event::EventSink;

/// One-shot continuation for an asynchronous SDK call.
pub type Completion<T> = Box<dyn FnOnce(Result<T, NativeError>) + Send + 'static>;

/// Process-wide SDK entry points.
pub trait RtmSdk: Send + Sync {
    /// SDK version string.
    fn sdk_version(&self) -> String;

    /// Apply the service context. Returns the SDK status code.
    fn set_service_context(&self, context: &ServiceContext) -> i32;

    /// Create a client session for `app_id`. Client and call events are
    /// delivered to `events`.
    fn create_client(
        &self,
        app_id: &str,
        events: EventSink,
    ) -> Result<Box<dyn NativeClient>, NativeError>;
}

/// A native client session.
pub trait NativeClient: Send {
    fn login(&self, token: Option<String>, user_id: String, done: Completion<()>);

    fn logout(&self, done: Completion<()>);

    fn send_message_to_peer(
        &self,
        peer_id: String,
        message: RtmMessage,
        options: SendMessageOptions,
        done: Completion<()>,
    );

    /// Create a channel object. Channel events are delivered to `events`.
    fn create_channel(
        &self,
        channel_id: &str,
        events: EventSink,
    ) -> Result<Box<dyn NativeChannel>, NativeError>;

    fn query_peers_online_status(
        &self,
        peer_ids: BTreeSet<String>,
        done: Completion<BTreeMap<String, bool>>,
    );

    fn subscribe_peers_online_status(&self, peer_ids: BTreeSet<String>, done: Completion<()>);

    fn unsubscribe_peers_online_status(&self, peer_ids: BTreeSet<String>, done: Completion<()>);

    fn query_peers_by_subscription_option(
        &self,
        option: PeerSubscriptionOption,
        done: Completion<BTreeSet<String>>,
    );

    fn renew_token(&self, token: String, done: Completion<()>);

    // -- Local user attributes ----------------------------------------------

    fn set_local_user_attributes(&self, attributes: Vec<RtmAttribute>, done: Completion<()>);

    fn add_or_update_local_user_attributes(
        &self,
        attributes: Vec<RtmAttribute>,
        done: Completion<()>,
    );

    fn delete_local_user_attributes_by_keys(&self, keys: Vec<String>, done: Completion<()>);

    fn clear_local_user_attributes(&self, done: Completion<()>);

    fn get_user_attributes(&self, user_id: String, done: Completion<Vec<RtmAttribute>>);

    fn get_user_attributes_by_keys(
        &self,
        user_id: String,
        keys: Vec<String>,
        done: Completion<Vec<RtmAttribute>>,
    );

    // -- Channel attributes -------------------------------------------------

    fn set_channel_attributes(
        &self,
        channel_id: String,
        attributes: Vec<ChannelAttribute>,
        options: ChannelAttributeOptions,
        done: Completion<()>,
    );

    fn add_or_update_channel_attributes(
        &self,
        channel_id: String,
        attributes: Vec<ChannelAttribute>,
        options: ChannelAttributeOptions,
        done: Completion<()>,
    );

    fn delete_channel_attributes_by_keys(
        &self,
        channel_id: String,
        keys: Vec<String>,
        options: ChannelAttributeOptions,
        done: Completion<()>,
    );

    fn clear_channel_attributes(
        &self,
        channel_id: String,
        options: ChannelAttributeOptions,
        done: Completion<()>,
    );

    fn get_channel_attributes(&self, channel_id: String, done: Completion<Vec<ChannelAttribute>>);

    fn get_channel_attributes_by_keys(
        &self,
        channel_id: String,
        keys: Vec<String>,
        done: Completion<Vec<ChannelAttribute>>,
    );

    fn get_channel_member_count(
        &self,
        channel_ids: Vec<String>,
        done: Completion<Vec<ChannelMemberCount>>,
    );

    // -- Runtime configuration (synchronous, returns status) ----------------

    fn set_parameters(&self, parameters: &str) -> i32;

    fn set_log_file(&self, file_path: &str) -> i32;

    fn set_log_filter(&self, filter: LogFilter) -> i32;

    fn set_log_file_size(&self, file_size_kb: u32) -> i32;

    /// The call manager bound to this session.
    fn call_manager(&self) -> Box<dyn NativeCallManager>;

    /// Tear down the session and every channel object it created.
    fn release(&self);
}

/// A native channel object.
pub trait NativeChannel: Send {
    fn join(&self, done: Completion<()>);

    fn leave(&self, done: Completion<()>);

    fn send_message(&self, message: RtmMessage, options: SendMessageOptions, done: Completion<()>);

    fn get_members(&self, done: Completion<Vec<ChannelMember>>);

    fn release(&self);
}

/// Call invitation signaling.
pub trait NativeCallManager: Send {
    /// Create an outgoing invitation object. No network traffic happens
    /// until it is sent.
    fn create_local_invitation(&self, callee_id: &str) -> LocalInvitation;

    fn send_local_invitation(&self, invitation: LocalInvitation, done: Completion<()>);

    fn accept_remote_invitation(&self, invitation: RemoteInvitation, done: Completion<()>);

    fn refuse_remote_invitation(&self, invitation: RemoteInvitation, done: Completion<()>);

    fn cancel_local_invitation(&self, invitation: LocalInvitation, done: Completion<()>);
}
