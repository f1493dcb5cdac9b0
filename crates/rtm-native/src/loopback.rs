// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process loopback SDK for desktop/CI builds and tests.
//
// All clients created from one `LoopbackSdk` share a small in-memory world:
// login state, user and channel attributes, channel membership, and pending
// call invitations. Peer and channel messages are delivered between those
// clients through their event sinks. Every completion is invoked from a
// freshly spawned thread, never the caller's, so consumers exercise the same
// cross-thread handoff they need for the vendor SDK.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rtm_core::{
    ChannelAttribute, ChannelAttributeOptions, ChannelMember, ChannelMemberCount, LocalInvitation,
    LogFilter, NativeError, PeerSubscriptionOption, RemoteInvitation, RtmAttribute, RtmMessage,
    SendMessageOptions, ServiceContext,
};
use tracing::{debug, warn};

use crate::event::{EventSink, LocalInvitationEvent, NativeEvent, RemoteInvitationEvent};
use crate::traits::{Completion, NativeCallManager, NativeChannel, NativeClient, RtmSdk};

/// Status codes reported by the loopback SDK.
pub mod status {
    pub const OK: i32 = 0;
    pub const NOT_LOGGED_IN: i32 = 1;
    pub const ALREADY_LOGGED_IN: i32 = 2;
    pub const INVALID_ARGUMENT: i32 = 3;
    pub const NOT_JOINED: i32 = 4;
    pub const ALREADY_JOINED: i32 = 5;
    pub const PEER_UNREACHABLE: i32 = 6;
    pub const CHANNEL_EXISTS: i32 = 7;
    pub const INVITATION_UNKNOWN: i32 = 8;
}

/// Connection states and change reasons reported in `ConnectionStateChanged`.
pub mod connection {
    pub const DISCONNECTED: i32 = 1;
    pub const CONNECTED: i32 = 3;
    pub const REASON_LOGIN_SUCCESS: i32 = 2;
    pub const REASON_LOGOUT: i32 = 5;
}

/// Invitation states stamped on loopback invitations.
pub mod invitation_state {
    pub const IDLE: i32 = 0;
    pub const RECEIVED_BY_REMOTE: i32 = 2;
    pub const ACCEPTED_BY_REMOTE: i32 = 3;
    pub const REFUSED_BY_REMOTE: i32 = 4;
    pub const CANCELED: i32 = 5;
}

/// Accepted range for `set_log_file_size`, in KiB.
pub const LOG_FILE_SIZE_KB: std::ops::RangeInclusive<u32> = 512..=10240;

const SDK_VERSION: &str = "loopback-1.5.0";

// ---------------------------------------------------------------------------
// Shared world
// ---------------------------------------------------------------------------

struct Session {
    user_id: Option<String>,
    sink: EventSink,
    subscribed: BTreeSet<String>,
    channel_objects: BTreeSet<String>,
    parameters: Vec<String>,
    log_file: Option<String>,
    log_filter: Option<LogFilter>,
    log_file_size_kb: Option<u32>,
}

#[derive(Default)]
struct ChannelState {
    /// user id -> (session id, channel sink)
    members: BTreeMap<String, (u64, EventSink)>,
    attributes: BTreeMap<String, ChannelAttribute>,
}

struct PendingCall {
    caller: u64,
    callee: u64,
    local: LocalInvitation,
    remote: RemoteInvitation,
}

#[derive(Default)]
struct World {
    next_id: u64,
    context_status: i32,
    context: Option<ServiceContext>,
    fail_next: Option<NativeError>,
    sessions: HashMap<u64, Session>,
    user_attributes: HashMap<String, BTreeMap<String, String>>,
    channels: HashMap<String, ChannelState>,
    pending_calls: Vec<PendingCall>,
}

fn err(code: i32, description: &str) -> NativeError {
    NativeError::new(code, description)
}

impl World {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn session(&mut self, id: u64) -> Result<&mut Session, NativeError> {
        self.sessions
            .get_mut(&id)
            .ok_or_else(|| err(status::NOT_LOGGED_IN, "client released"))
    }

    /// The user id of a logged-in session.
    fn user_of(&mut self, id: u64) -> Result<String, NativeError> {
        self.session(id)?
            .user_id
            .clone()
            .ok_or_else(|| err(status::NOT_LOGGED_IN, "not logged in"))
    }

    fn session_of_user(&self, user_id: &str) -> Option<u64> {
        self.sessions
            .iter()
            .find(|(_, s)| s.user_id.as_deref() == Some(user_id))
            .map(|(id, _)| *id)
    }

    fn sink_of(&self, id: u64) -> Option<EventSink> {
        self.sessions.get(&id).map(|s| s.sink.clone())
    }

    /// Tell every session subscribed to `user_id` about its new state.
    fn notify_subscribers(&self, user_id: &str, online: bool) {
        for session in self.sessions.values() {
            if session.subscribed.contains(user_id) {
                let mut change = BTreeMap::new();
                change.insert(user_id.to_string(), online);
                session.sink.emit(NativeEvent::PeersOnlineStatusChanged(change));
            }
        }
    }

    /// Remove `user_id` from a channel and notify the remaining members.
    fn leave_channel(&mut self, channel_id: &str, user_id: &str) -> bool {
        let Some(channel) = self.channels.get_mut(channel_id) else {
            return false;
        };
        if channel.members.remove(user_id).is_none() {
            return false;
        }
        let member_count = channel.members.len() as u32;
        for (_, sink) in channel.members.values() {
            sink.emit(NativeEvent::MemberLeft {
                channel_id: channel_id.to_string(),
                user_id: user_id.to_string(),
            });
            sink.emit(NativeEvent::MemberCountUpdated {
                channel_id: channel_id.to_string(),
                member_count,
            });
        }
        true
    }

    /// Drop every channel membership held by `session`.
    fn leave_all_channels(&mut self, session: u64) {
        let memberships: Vec<(String, String)> = self
            .channels
            .iter()
            .flat_map(|(channel_id, state)| {
                state
                    .members
                    .iter()
                    .filter(|(_, (owner, _))| *owner == session)
                    .map(|(user, _)| (channel_id.clone(), user.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (channel_id, user_id) in memberships {
            self.leave_channel(&channel_id, &user_id);
        }
    }

    fn stamp(&mut self, session: u64, attributes: Vec<ChannelAttribute>) -> Result<Vec<ChannelAttribute>, NativeError> {
        let user = self.user_of(session)?;
        let now = chrono::Utc::now().timestamp_millis();
        Ok(attributes
            .into_iter()
            .map(|mut attr| {
                attr.last_update_user_id = user.clone();
                attr.last_update_ts = now;
                attr
            })
            .collect())
    }

    fn notify_attributes(&self, channel_id: &str, options: ChannelAttributeOptions) {
        if !options.enable_notification_to_channel_members {
            return;
        }
        if let Some(channel) = self.channels.get(channel_id) {
            let attributes: Vec<ChannelAttribute> = channel.attributes.values().cloned().collect();
            for (_, sink) in channel.members.values() {
                sink.emit(NativeEvent::AttributesUpdated {
                    channel_id: channel_id.to_string(),
                    attributes: attributes.clone(),
                });
            }
        }
    }
}

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<World>>);

impl Shared {
    fn lock(&self) -> MutexGuard<'_, World> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run an operation against the world, honouring a scripted failure.
    fn run<T>(&self, op: impl FnOnce(&mut World) -> Result<T, NativeError>) -> Result<T, NativeError> {
        let mut world = self.lock();
        if let Some(failure) = world.fail_next.take() {
            debug!(code = failure.code, "loopback: scripted failure");
            return Err(failure);
        }
        op(&mut world)
    }
}

/// Invoke `done` from a background thread.
fn finish<T: Send + 'static>(done: Completion<T>, result: Result<T, NativeError>) {
    let spawned = std::thread::Builder::new()
        .name("loopback-completion".into())
        .spawn(move || done(result));
    if let Err(e) = spawned {
        warn!(error = %e, "loopback: failed to spawn completion thread");
    }
}

// ---------------------------------------------------------------------------
// SDK
// ---------------------------------------------------------------------------

/// In-memory stand-in for the vendor SDK.
#[derive(Clone, Default)]
pub struct LoopbackSdk {
    world: Shared,
}

impl LoopbackSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next native call (asynchronous or `create_channel`) fail.
    pub fn fail_next(&self, code: i32, description: &str) {
        self.world.lock().fail_next = Some(err(code, description));
    }

    /// Status returned by subsequent `set_service_context` calls.
    pub fn set_context_status(&self, code: i32) {
        self.world.lock().context_status = code;
    }

    /// Last service context accepted.
    pub fn service_context(&self) -> Option<ServiceContext> {
        self.world.lock().context
    }

    /// Number of client sessions not yet released.
    pub fn live_sessions(&self) -> usize {
        self.world.lock().sessions.len()
    }

    /// Number of channel objects not yet released, across all sessions.
    pub fn live_channel_objects(&self) -> usize {
        self.world
            .lock()
            .sessions
            .values()
            .map(|s| s.channel_objects.len())
            .sum()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.world.lock().session_of_user(user_id).is_some()
    }

    /// Log settings of the session logged in as `user_id`, if any.
    pub fn log_settings(&self, user_id: &str) -> Option<(Option<String>, Option<LogFilter>, Option<u32>)> {
        let world = self.world.lock();
        let id = world.session_of_user(user_id)?;
        world
            .sessions
            .get(&id)
            .map(|s| (s.log_file.clone(), s.log_filter, s.log_file_size_kb))
    }
}

impl RtmSdk for LoopbackSdk {
    fn sdk_version(&self) -> String {
        SDK_VERSION.to_string()
    }

    fn set_service_context(&self, context: &ServiceContext) -> i32 {
        let mut world = self.world.lock();
        if world.context_status == status::OK {
            world.context = Some(*context);
        }
        world.context_status
    }

    fn create_client(
        &self,
        app_id: &str,
        events: EventSink,
    ) -> Result<Box<dyn NativeClient>, NativeError> {
        self.world.run(|world| {
            if app_id.is_empty() {
                return Err(err(status::INVALID_ARGUMENT, "empty app id"));
            }
            let session = world.next_id();
            world.sessions.insert(
                session,
                Session {
                    user_id: None,
                    sink: events,
                    subscribed: BTreeSet::new(),
                    channel_objects: BTreeSet::new(),
                    parameters: Vec::new(),
                    log_file: None,
                    log_filter: None,
                    log_file_size_kb: None,
                },
            );
            debug!(session, app_id, "loopback: client created");
            Ok(Box::new(LoopbackClient {
                world: self.world.clone(),
                session,
            }) as Box<dyn NativeClient>)
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

struct LoopbackClient {
    world: Shared,
    session: u64,
}

impl LoopbackClient {
    fn unit(&self, done: Completion<()>, op: impl FnOnce(&mut World, u64) -> Result<(), NativeError>) {
        let session = self.session;
        finish(done, self.world.run(|w| op(w, session)));
    }
}

impl NativeClient for LoopbackClient {
    fn login(&self, _token: Option<String>, user_id: String, done: Completion<()>) {
        self.unit(done, |w, id| {
            if user_id.is_empty() {
                return Err(err(status::INVALID_ARGUMENT, "empty user id"));
            }
            let session = w.session(id)?;
            if session.user_id.is_some() {
                return Err(err(status::ALREADY_LOGGED_IN, "already logged in"));
            }
            session.user_id = Some(user_id.clone());
            session.sink.emit(NativeEvent::ConnectionStateChanged {
                state: connection::CONNECTED,
                reason: connection::REASON_LOGIN_SUCCESS,
            });
            w.notify_subscribers(&user_id, true);
            Ok(())
        });
    }

    fn logout(&self, done: Completion<()>) {
        self.unit(done, |w, id| {
            let user = w.user_of(id)?;
            w.leave_all_channels(id);
            let session = w.session(id)?;
            session.user_id = None;
            session.sink.emit(NativeEvent::ConnectionStateChanged {
                state: connection::DISCONNECTED,
                reason: connection::REASON_LOGOUT,
            });
            w.notify_subscribers(&user, false);
            Ok(())
        });
    }

    fn send_message_to_peer(
        &self,
        peer_id: String,
        message: RtmMessage,
        options: SendMessageOptions,
        done: Completion<()>,
    ) {
        self.unit(done, |w, id| {
            let sender = w.user_of(id)?;
            match w.session_of_user(&peer_id).and_then(|peer| w.sink_of(peer)) {
                Some(sink) => {
                    let mut delivered = message;
                    delivered.server_received_ts = chrono::Utc::now().timestamp_millis();
                    sink.emit(NativeEvent::MessageReceived {
                        message: delivered,
                        peer_id: sender,
                    });
                    Ok(())
                }
                None if options.enable_offline_messaging => Ok(()),
                None => Err(err(status::PEER_UNREACHABLE, "peer unreachable")),
            }
        });
    }

    fn create_channel(
        &self,
        channel_id: &str,
        events: EventSink,
    ) -> Result<Box<dyn NativeChannel>, NativeError> {
        self.world.run(|w| {
            if channel_id.is_empty() {
                return Err(err(status::INVALID_ARGUMENT, "empty channel id"));
            }
            let session = w.session(self.session)?;
            if !session.channel_objects.insert(channel_id.to_string()) {
                return Err(err(status::CHANNEL_EXISTS, "channel already created"));
            }
            Ok(Box::new(LoopbackChannel {
                world: self.world.clone(),
                session: self.session,
                channel_id: channel_id.to_string(),
                sink: events,
            }) as Box<dyn NativeChannel>)
        })
    }

    fn query_peers_online_status(
        &self,
        peer_ids: BTreeSet<String>,
        done: Completion<BTreeMap<String, bool>>,
    ) {
        let result = self.world.run(|w| {
            w.user_of(self.session)?;
            Ok(peer_ids
                .into_iter()
                .map(|peer| {
                    let online = w.session_of_user(&peer).is_some();
                    (peer, online)
                })
                .collect())
        });
        finish(done, result);
    }

    fn subscribe_peers_online_status(&self, peer_ids: BTreeSet<String>, done: Completion<()>) {
        self.unit(done, |w, id| {
            w.user_of(id)?;
            w.session(id)?.subscribed.extend(peer_ids);
            Ok(())
        });
    }

    fn unsubscribe_peers_online_status(&self, peer_ids: BTreeSet<String>, done: Completion<()>) {
        self.unit(done, |w, id| {
            w.user_of(id)?;
            let session = w.session(id)?;
            for peer in &peer_ids {
                session.subscribed.remove(peer);
            }
            Ok(())
        });
    }

    fn query_peers_by_subscription_option(
        &self,
        option: PeerSubscriptionOption,
        done: Completion<BTreeSet<String>>,
    ) {
        let result = self.world.run(|w| {
            w.user_of(self.session)?;
            match option {
                PeerSubscriptionOption::OnlineStatus => Ok(w.session(self.session)?.subscribed.clone()),
            }
        });
        finish(done, result);
    }

    fn renew_token(&self, token: String, done: Completion<()>) {
        self.unit(done, |w, id| {
            w.user_of(id)?;
            if token.is_empty() {
                return Err(err(status::INVALID_ARGUMENT, "empty token"));
            }
            Ok(())
        });
    }

    fn set_local_user_attributes(&self, attributes: Vec<RtmAttribute>, done: Completion<()>) {
        self.unit(done, |w, id| {
            let user = w.user_of(id)?;
            let map = attributes.into_iter().map(|a| (a.key, a.value)).collect();
            w.user_attributes.insert(user, map);
            Ok(())
        });
    }

    fn add_or_update_local_user_attributes(
        &self,
        attributes: Vec<RtmAttribute>,
        done: Completion<()>,
    ) {
        self.unit(done, |w, id| {
            let user = w.user_of(id)?;
            let map = w.user_attributes.entry(user).or_default();
            for attr in attributes {
                map.insert(attr.key, attr.value);
            }
            Ok(())
        });
    }

    fn delete_local_user_attributes_by_keys(&self, keys: Vec<String>, done: Completion<()>) {
        self.unit(done, |w, id| {
            let user = w.user_of(id)?;
            if let Some(map) = w.user_attributes.get_mut(&user) {
                for key in &keys {
                    map.remove(key);
                }
            }
            Ok(())
        });
    }

    fn clear_local_user_attributes(&self, done: Completion<()>) {
        self.unit(done, |w, id| {
            let user = w.user_of(id)?;
            w.user_attributes.remove(&user);
            Ok(())
        });
    }

    fn get_user_attributes(&self, user_id: String, done: Completion<Vec<RtmAttribute>>) {
        self.get_user_attributes_by_keys(user_id, Vec::new(), done);
    }

    fn get_user_attributes_by_keys(
        &self,
        user_id: String,
        keys: Vec<String>,
        done: Completion<Vec<RtmAttribute>>,
    ) {
        let result = self.world.run(|w| {
            w.user_of(self.session)?;
            if w.session_of_user(&user_id).is_none() {
                return Err(err(status::PEER_UNREACHABLE, "user offline"));
            }
            let attributes = w
                .user_attributes
                .get(&user_id)
                .map(|map| {
                    map.iter()
                        .filter(|(k, _)| keys.is_empty() || keys.contains(k))
                        .map(|(k, v)| RtmAttribute::new(k.clone(), v.clone()))
                        .collect()
                })
                .unwrap_or_default();
            Ok(attributes)
        });
        finish(done, result);
    }

    fn set_channel_attributes(
        &self,
        channel_id: String,
        attributes: Vec<ChannelAttribute>,
        options: ChannelAttributeOptions,
        done: Completion<()>,
    ) {
        self.unit(done, |w, id| {
            let stamped = w.stamp(id, attributes)?;
            let channel = w.channels.entry(channel_id.clone()).or_default();
            channel.attributes = stamped.into_iter().map(|a| (a.key.clone(), a)).collect();
            w.notify_attributes(&channel_id, options);
            Ok(())
        });
    }

    fn add_or_update_channel_attributes(
        &self,
        channel_id: String,
        attributes: Vec<ChannelAttribute>,
        options: ChannelAttributeOptions,
        done: Completion<()>,
    ) {
        self.unit(done, |w, id| {
            let stamped = w.stamp(id, attributes)?;
            let channel = w.channels.entry(channel_id.clone()).or_default();
            for attr in stamped {
                channel.attributes.insert(attr.key.clone(), attr);
            }
            w.notify_attributes(&channel_id, options);
            Ok(())
        });
    }

    fn delete_channel_attributes_by_keys(
        &self,
        channel_id: String,
        keys: Vec<String>,
        options: ChannelAttributeOptions,
        done: Completion<()>,
    ) {
        self.unit(done, |w, id| {
            w.user_of(id)?;
            if let Some(channel) = w.channels.get_mut(&channel_id) {
                for key in &keys {
                    channel.attributes.remove(key);
                }
            }
            w.notify_attributes(&channel_id, options);
            Ok(())
        });
    }

    fn clear_channel_attributes(
        &self,
        channel_id: String,
        options: ChannelAttributeOptions,
        done: Completion<()>,
    ) {
        self.unit(done, |w, id| {
            w.user_of(id)?;
            if let Some(channel) = w.channels.get_mut(&channel_id) {
                channel.attributes.clear();
            }
            w.notify_attributes(&channel_id, options);
            Ok(())
        });
    }

    fn get_channel_attributes(&self, channel_id: String, done: Completion<Vec<ChannelAttribute>>) {
        self.get_channel_attributes_by_keys(channel_id, Vec::new(), done);
    }

    fn get_channel_attributes_by_keys(
        &self,
        channel_id: String,
        keys: Vec<String>,
        done: Completion<Vec<ChannelAttribute>>,
    ) {
        let result = self.world.run(|w| {
            w.user_of(self.session)?;
            Ok(w.channels
                .get(&channel_id)
                .map(|channel| {
                    channel
                        .attributes
                        .values()
                        .filter(|a| keys.is_empty() || keys.contains(&a.key))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        });
        finish(done, result);
    }

    fn get_channel_member_count(
        &self,
        channel_ids: Vec<String>,
        done: Completion<Vec<ChannelMemberCount>>,
    ) {
        let result = self.world.run(|w| {
            w.user_of(self.session)?;
            Ok(channel_ids
                .into_iter()
                .map(|channel_id| {
                    let member_count = w
                        .channels
                        .get(&channel_id)
                        .map_or(0, |c| c.members.len() as u32);
                    ChannelMemberCount {
                        channel_id,
                        member_count,
                    }
                })
                .collect())
        });
        finish(done, result);
    }

    fn set_parameters(&self, parameters: &str) -> i32 {
        if parameters.trim().is_empty() {
            return status::INVALID_ARGUMENT;
        }
        let mut world = self.world.lock();
        match world.sessions.get_mut(&self.session) {
            Some(session) => {
                session.parameters.push(parameters.to_string());
                status::OK
            }
            None => status::NOT_LOGGED_IN,
        }
    }

    fn set_log_file(&self, file_path: &str) -> i32 {
        if file_path.is_empty() {
            return status::INVALID_ARGUMENT;
        }
        let mut world = self.world.lock();
        match world.sessions.get_mut(&self.session) {
            Some(session) => {
                session.log_file = Some(file_path.to_string());
                status::OK
            }
            None => status::NOT_LOGGED_IN,
        }
    }

    fn set_log_filter(&self, filter: LogFilter) -> i32 {
        let mut world = self.world.lock();
        match world.sessions.get_mut(&self.session) {
            Some(session) => {
                session.log_filter = Some(filter);
                status::OK
            }
            None => status::NOT_LOGGED_IN,
        }
    }

    fn set_log_file_size(&self, file_size_kb: u32) -> i32 {
        if !LOG_FILE_SIZE_KB.contains(&file_size_kb) {
            return status::INVALID_ARGUMENT;
        }
        let mut world = self.world.lock();
        match world.sessions.get_mut(&self.session) {
            Some(session) => {
                session.log_file_size_kb = Some(file_size_kb);
                status::OK
            }
            None => status::NOT_LOGGED_IN,
        }
    }

    fn call_manager(&self) -> Box<dyn NativeCallManager> {
        Box::new(LoopbackCallManager {
            world: self.world.clone(),
            session: self.session,
        })
    }

    fn release(&self) {
        let mut world = self.world.lock();
        world.leave_all_channels(self.session);
        world
            .pending_calls
            .retain(|call| call.caller != self.session && call.callee != self.session);
        if let Some(session) = world.sessions.remove(&self.session) {
            if let Some(user) = session.user_id {
                world.notify_subscribers(&user, false);
            }
        }
        debug!(session = self.session, "loopback: client released");
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

struct LoopbackChannel {
    world: Shared,
    session: u64,
    channel_id: String,
    sink: EventSink,
}

impl LoopbackChannel {
    fn member_of(&self, w: &World, user: &str) -> bool {
        w.channels
            .get(&self.channel_id)
            .is_some_and(|c| c.members.contains_key(user))
    }
}

impl NativeChannel for LoopbackChannel {
    fn join(&self, done: Completion<()>) {
        let result = self.world.run(|w| {
            let user = w.user_of(self.session)?;
            if self.member_of(w, &user) {
                return Err(err(status::ALREADY_JOINED, "already joined"));
            }
            let channel = w.channels.entry(self.channel_id.clone()).or_default();
            for (_, sink) in channel.members.values() {
                sink.emit(NativeEvent::MemberJoined {
                    channel_id: self.channel_id.clone(),
                    user_id: user.clone(),
                });
            }
            channel
                .members
                .insert(user, (self.session, self.sink.clone()));
            let member_count = channel.members.len() as u32;
            for (_, sink) in channel.members.values() {
                sink.emit(NativeEvent::MemberCountUpdated {
                    channel_id: self.channel_id.clone(),
                    member_count,
                });
            }
            Ok(())
        });
        finish(done, result);
    }

    fn leave(&self, done: Completion<()>) {
        let result = self.world.run(|w| {
            let user = w.user_of(self.session)?;
            if w.leave_channel(&self.channel_id, &user) {
                Ok(())
            } else {
                Err(err(status::NOT_JOINED, "not joined"))
            }
        });
        finish(done, result);
    }

    fn send_message(&self, message: RtmMessage, _options: SendMessageOptions, done: Completion<()>) {
        let result = self.world.run(|w| {
            let user = w.user_of(self.session)?;
            if !self.member_of(w, &user) {
                return Err(err(status::NOT_JOINED, "not joined"));
            }
            if let Some(channel) = w.channels.get(&self.channel_id) {
                for (member, (_, sink)) in &channel.members {
                    if *member != user {
                        sink.emit(NativeEvent::ChannelMessageReceived {
                            channel_id: self.channel_id.clone(),
                            message: message.clone(),
                            user_id: user.clone(),
                        });
                    }
                }
            }
            Ok(())
        });
        finish(done, result);
    }

    fn get_members(&self, done: Completion<Vec<ChannelMember>>) {
        let result = self.world.run(|w| {
            let user = w.user_of(self.session)?;
            if !self.member_of(w, &user) {
                return Err(err(status::NOT_JOINED, "not joined"));
            }
            Ok(w.channels
                .get(&self.channel_id)
                .map(|c| {
                    c.members
                        .keys()
                        .map(|user_id| ChannelMember {
                            user_id: user_id.clone(),
                            channel_id: self.channel_id.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default())
        });
        finish(done, result);
    }

    fn release(&self) {
        let mut world = self.world.lock();
        if let Some(user) = world.sessions.get(&self.session).and_then(|s| s.user_id.clone()) {
            world.leave_channel(&self.channel_id, &user);
        }
        if let Some(session) = world.sessions.get_mut(&self.session) {
            session.channel_objects.remove(&self.channel_id);
        }
    }
}

// ---------------------------------------------------------------------------
// Call manager
// ---------------------------------------------------------------------------

struct LoopbackCallManager {
    world: Shared,
    session: u64,
}

impl LoopbackCallManager {
    /// Remove the pending call whose remote side matches `remote`, and tell
    /// both ends how it ended.
    fn answer(
        &self,
        remote: RemoteInvitation,
        done: Completion<()>,
        local_event: LocalInvitationEvent,
        remote_event: RemoteInvitationEvent,
        state: i32,
    ) {
        let result = self.world.run(|w| {
            w.user_of(self.session)?;
            let position = w
                .pending_calls
                .iter()
                .position(|c| c.callee == self.session && c.remote.native_id == remote.native_id)
                .ok_or_else(|| err(status::INVITATION_UNKNOWN, "unknown remote invitation"))?;
            let call = w.pending_calls.remove(position);
            let mut local = call.local;
            local.response = remote.response.clone();
            local.state = state;
            if let Some(sink) = w.sink_of(call.caller) {
                sink.emit(NativeEvent::LocalInvitation {
                    event: local_event,
                    invitation: local,
                });
            }
            if let Some(sink) = w.sink_of(self.session) {
                let mut answered = remote;
                answered.state = state;
                sink.emit(NativeEvent::RemoteInvitation {
                    event: remote_event,
                    invitation: answered,
                });
            }
            Ok(())
        });
        finish(done, result);
    }
}

impl NativeCallManager for LoopbackCallManager {
    fn create_local_invitation(&self, callee_id: &str) -> LocalInvitation {
        let native_id = self.world.lock().next_id();
        LocalInvitation {
            native_id,
            callee_id: callee_id.to_string(),
            content: String::new(),
            channel_id: String::new(),
            response: String::new(),
            state: invitation_state::IDLE,
        }
    }

    fn send_local_invitation(&self, invitation: LocalInvitation, done: Completion<()>) {
        let result = self.world.run(|w| {
            let caller_id = w.user_of(self.session)?;
            let callee = w
                .session_of_user(&invitation.callee_id)
                .ok_or_else(|| err(status::PEER_UNREACHABLE, "callee offline"))?;
            let remote = RemoteInvitation {
                native_id: w.next_id(),
                caller_id,
                content: invitation.content.clone(),
                channel_id: invitation.channel_id.clone(),
                response: String::new(),
                state: invitation_state::IDLE,
            };
            let mut local = invitation;
            local.state = invitation_state::RECEIVED_BY_REMOTE;
            if let Some(sink) = w.sink_of(self.session) {
                sink.emit(NativeEvent::LocalInvitation {
                    event: LocalInvitationEvent::ReceivedByPeer,
                    invitation: local.clone(),
                });
            }
            if let Some(sink) = w.sink_of(callee) {
                sink.emit(NativeEvent::RemoteInvitation {
                    event: RemoteInvitationEvent::Received,
                    invitation: remote.clone(),
                });
            }
            w.pending_calls.push(PendingCall {
                caller: self.session,
                callee,
                local,
                remote,
            });
            Ok(())
        });
        finish(done, result);
    }

    fn accept_remote_invitation(&self, invitation: RemoteInvitation, done: Completion<()>) {
        self.answer(
            invitation,
            done,
            LocalInvitationEvent::Accepted,
            RemoteInvitationEvent::Accepted,
            invitation_state::ACCEPTED_BY_REMOTE,
        );
    }

    fn refuse_remote_invitation(&self, invitation: RemoteInvitation, done: Completion<()>) {
        self.answer(
            invitation,
            done,
            LocalInvitationEvent::Refused,
            RemoteInvitationEvent::Refused,
            invitation_state::REFUSED_BY_REMOTE,
        );
    }

    fn cancel_local_invitation(&self, invitation: LocalInvitation, done: Completion<()>) {
        let result = self.world.run(|w| {
            w.user_of(self.session)?;
            let position = w
                .pending_calls
                .iter()
                .position(|c| c.caller == self.session && c.local.native_id == invitation.native_id)
                .ok_or_else(|| err(status::INVITATION_UNKNOWN, "invitation was not sent"))?;
            let call = w.pending_calls.remove(position);
            if let Some(sink) = w.sink_of(call.callee) {
                let mut remote = call.remote;
                remote.state = invitation_state::CANCELED;
                sink.emit(NativeEvent::RemoteInvitation {
                    event: RemoteInvitationEvent::Canceled,
                    invitation: remote,
                });
            }
            if let Some(sink) = w.sink_of(self.session) {
                let mut local = call.local;
                local.state = invitation_state::CANCELED;
                sink.emit(NativeEvent::LocalInvitation {
                    event: LocalInvitationEvent::Canceled,
                    invitation: local,
                });
            }
            Ok(())
        });
        finish(done, result);
    }
}
