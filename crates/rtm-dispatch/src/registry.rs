// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Handle registry: owns every live native client, channel, and invitation.
//
// The registry is not synchronised. It lives inside the dispatcher task and
// is only ever touched from there, either while handling a request or while
// running a completion job marshaled back from an SDK thread.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use rtm_core::error::Result;
use rtm_core::{BridgeError, ClientIndex, InvitationHash, LocalInvitation, RemoteInvitation, Target};
use rtm_native::{NativeCallManager, NativeChannel, NativeClient};

/// A native channel object registered under its owning client.
pub struct ChannelHandle {
    pub generation: u64,
    pub native: Box<dyn NativeChannel>,
}

/// An invitation tracked by a client's call state.
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    pub invitation: T,
    pub created_at: DateTime<Utc>,
}

impl<T> Tracked<T> {
    pub fn new(invitation: T) -> Self {
        Self {
            invitation,
            created_at: Utc::now(),
        }
    }
}

/// Outgoing and incoming invitations of one client, keyed by identity hash.
#[derive(Debug, Default)]
pub struct CallState {
    pub outgoing: HashMap<InvitationHash, Tracked<LocalInvitation>>,
    pub incoming: HashMap<InvitationHash, Tracked<RemoteInvitation>>,
}

impl CallState {
    pub fn outgoing_mut(&mut self, hash: &InvitationHash) -> Result<&mut Tracked<LocalInvitation>> {
        self.outgoing.get_mut(hash).ok_or_else(|| unknown(hash))
    }

    pub fn incoming_mut(&mut self, hash: &InvitationHash) -> Result<&mut Tracked<RemoteInvitation>> {
        self.incoming.get_mut(hash).ok_or_else(|| unknown(hash))
    }
}

fn unknown(hash: &InvitationHash) -> BridgeError {
    BridgeError::NotInitialized(Target::Invitation(hash.to_string()))
}

/// A live client session and everything it owns.
pub struct ClientHandle {
    pub index: ClientIndex,
    /// Distinguishes this session from earlier ones that held the same index.
    pub generation: u64,
    pub native: Box<dyn NativeClient>,
    pub call_manager: Box<dyn NativeCallManager>,
    pub channels: BTreeMap<String, ChannelHandle>,
    pub call: CallState,
    channel_generation: u64,
}

impl ClientHandle {
    pub fn new(index: ClientIndex, generation: u64, native: Box<dyn NativeClient>) -> Self {
        let call_manager = native.call_manager();
        Self {
            index,
            generation,
            native,
            call_manager,
            channels: BTreeMap::new(),
            call: CallState::default(),
            channel_generation: 0,
        }
    }

    pub fn next_channel_generation(&mut self) -> u64 {
        self.channel_generation += 1;
        self.channel_generation
    }

    pub fn channel(&self, channel_id: Option<&str>) -> Result<&ChannelHandle> {
        channel_id
            .and_then(|id| self.channels.get(id))
            .ok_or_else(|| {
                BridgeError::NotInitialized(Target::Channel {
                    client: Some(self.index),
                    channel_id: channel_id.map(str::to_string),
                })
            })
    }

    /// Register a channel, releasing any native object it displaces.
    pub fn add_channel(&mut self, channel_id: String, handle: ChannelHandle) {
        if let Some(old) = self.channels.insert(channel_id, handle) {
            old.native.release();
        }
    }

    /// Release a channel's native object and forget it.
    pub fn remove_channel(&mut self, channel_id: &str) -> bool {
        match self.channels.remove(channel_id) {
            Some(handle) => {
                handle.native.release();
                true
            }
            None => false,
        }
    }

    /// Release every channel, then the client itself.
    fn release(mut self) {
        for (channel_id, handle) in std::mem::take(&mut self.channels) {
            debug!(client_index = %self.index, channel_id = %channel_id, "releasing channel");
            handle.native.release();
        }
        self.call.outgoing.clear();
        self.call.incoming.clear();
        self.native.release();
    }
}

/// Flat registry of live client handles.
pub struct HandleRegistry {
    clients: BTreeMap<ClientIndex, ClientHandle>,
    max_clients: u32,
    next_generation: u64,
}

impl HandleRegistry {
    pub fn new(max_clients: u32) -> Self {
        Self {
            clients: BTreeMap::new(),
            max_clients,
            next_generation: 0,
        }
    }

    /// The smallest index not held by a live client.
    pub fn allocate(&self) -> Result<ClientIndex> {
        let mut candidate = 0u32;
        for index in self.clients.keys() {
            if index.0 != candidate {
                break;
            }
            candidate = candidate.checked_add(1).ok_or(BridgeError::RegistryFull)?;
        }
        if candidate >= self.max_clients {
            return Err(BridgeError::RegistryFull);
        }
        Ok(ClientIndex(candidate))
    }

    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    #[instrument(skip(self, handle), fields(client_index = %handle.index))]
    pub fn insert(&mut self, handle: ClientHandle) {
        if let Some(old) = self.clients.insert(handle.index, handle) {
            old.release();
        }
        info!("client registered");
    }

    pub fn client(&self, index: Option<ClientIndex>) -> Result<&ClientHandle> {
        index
            .and_then(|i| self.clients.get(&i))
            .ok_or_else(|| BridgeError::NotInitialized(Target::Client(index)))
    }

    pub fn client_mut(&mut self, index: Option<ClientIndex>) -> Result<&mut ClientHandle> {
        index
            .and_then(|i| self.clients.get_mut(&i))
            .ok_or_else(|| BridgeError::NotInitialized(Target::Client(index)))
    }

    /// The client at `index`, but only if it is still the same session.
    pub fn live(&mut self, index: ClientIndex, generation: u64) -> Option<&mut ClientHandle> {
        self.clients
            .get_mut(&index)
            .filter(|handle| handle.generation == generation)
    }

    /// Release a client and everything it owns. Returns whether it existed.
    #[instrument(skip(self), fields(client_index = %index))]
    pub fn remove(&mut self, index: ClientIndex) -> bool {
        match self.clients.remove(&index) {
            Some(handle) => {
                handle.release();
                info!("client released");
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        let count = self.clients.len();
        for (_, handle) in std::mem::take(&mut self.clients) {
            handle.release();
        }
        if count > 0 {
            info!(count, "released all clients");
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            clients: self
                .clients
                .values()
                .map(|handle| ClientSnapshot {
                    index: handle.index,
                    channels: handle.channels.keys().cloned().collect(),
                    outgoing_invitations: handle.call.outgoing.len(),
                    incoming_invitations: handle.call.incoming.len(),
                })
                .collect(),
        }
    }
}

/// Read-only view of the registry for diagnostics and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    pub clients: Vec<ClientSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    pub index: ClientIndex,
    pub channels: Vec<String>,
    pub outgoing_invitations: usize,
    pub incoming_invitations: usize,
}

impl RegistrySnapshot {
    pub fn client(&self, index: ClientIndex) -> Option<&ClientSnapshot> {
        self.clients.iter().find(|c| c.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtm_core::error::codes;
    use rtm_native::{EventSink, LoopbackSdk, RtmSdk};

    fn register(registry: &mut HandleRegistry, sdk: &LoopbackSdk) -> ClientIndex {
        let index = registry.allocate().expect("allocate");
        let generation = registry.next_generation();
        let native = sdk.create_client("app", EventSink::discard()).expect("client");
        registry.insert(ClientHandle::new(index, generation, native));
        index
    }

    #[test]
    fn allocate_fills_the_lowest_gap() {
        let sdk = LoopbackSdk::new();
        let mut registry = HandleRegistry::new(u32::MAX);
        let a = register(&mut registry, &sdk);
        let b = register(&mut registry, &sdk);
        let c = register(&mut registry, &sdk);
        assert_eq!((a, b, c), (ClientIndex(0), ClientIndex(1), ClientIndex(2)));

        assert!(registry.remove(b));
        assert_eq!(registry.allocate().expect("allocate"), ClientIndex(1));
        assert_eq!(register(&mut registry, &sdk), ClientIndex(1));
        assert_eq!(registry.allocate().expect("allocate"), ClientIndex(3));
    }

    #[test]
    fn exhausted_registry_reports_full() {
        let sdk = LoopbackSdk::new();
        let mut registry = HandleRegistry::new(1);
        register(&mut registry, &sdk);
        let err = registry.allocate().expect_err("full");
        assert_eq!(err.code(), codes::REGISTRY_FULL);
    }

    #[test]
    fn reused_index_gets_a_new_generation() {
        let sdk = LoopbackSdk::new();
        let mut registry = HandleRegistry::new(u32::MAX);
        let index = register(&mut registry, &sdk);
        let first = registry.client(Some(index)).expect("live").generation;
        registry.remove(index);
        register(&mut registry, &sdk);
        assert!(registry.live(index, first).is_none());
    }

    #[test]
    fn missing_client_is_not_initialized() {
        let registry = HandleRegistry::new(u32::MAX);
        for index in [None, Some(ClientIndex(0))] {
            let err = registry.client(index).err().expect("missing");
            assert_eq!(err.code(), codes::NOT_INITIALIZED);
        }
    }

    #[test]
    fn remove_cascades_to_native_objects() {
        let sdk = LoopbackSdk::new();
        let mut registry = HandleRegistry::new(u32::MAX);
        let index = register(&mut registry, &sdk);
        {
            let handle = registry.client_mut(Some(index)).expect("live");
            for id in ["a", "b"] {
                let native = handle
                    .native
                    .create_channel(id, EventSink::discard())
                    .expect("channel");
                handle.add_channel(id.into(), ChannelHandle { generation: 0, native });
            }
        }
        assert_eq!(sdk.live_channel_objects(), 2);

        assert!(registry.remove(index));
        assert_eq!(sdk.live_channel_objects(), 0);
        assert_eq!(sdk.live_sessions(), 0);
        assert!(registry.is_empty());
        assert!(!registry.remove(index));
    }

    #[test]
    fn snapshot_lists_channels() {
        let sdk = LoopbackSdk::new();
        let mut registry = HandleRegistry::new(u32::MAX);
        let index = register(&mut registry, &sdk);
        let handle = registry.client_mut(Some(index)).expect("live");
        let native = handle
            .native
            .create_channel("lobby", EventSink::discard())
            .expect("channel");
        handle.add_channel("lobby".into(), ChannelHandle { generation: 0, native });

        let snapshot = registry.snapshot();
        assert_eq!(
            snapshot.client(index).map(|c| c.channels.clone()),
            Some(vec!["lobby".to_string()])
        );
    }
}
