// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use rtm_core::{ChannelAttribute, ChannelMemberCount, RtmAttribute};

use crate::args::{Args, Envelope};
use crate::bridge::Bridge;
use crate::marshal;
use crate::registry::ChannelHandle;
use crate::reply::{PendingReply, Reply};
use crate::request::ClientRequest;
use crate::router::ClientMethod;

impl Bridge {
    pub(crate) fn handle_client(&mut self, method: ClientMethod, env: &Envelope, reply: PendingReply) {
        let name = method.wire_name();
        let prepared = self.registry.client(env.client_index).and_then(|handle| {
            let request = ClientRequest::decode(method, &Args::new(name, &env.args))?;
            Ok((handle.index, request))
        });
        let (index, request) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!(method = name, "{e}");
                return reply.fail(e);
            }
        };
        debug!(client_index = %index, method = name, "client request");

        let Self {
            registry,
            inbox,
            config,
            ..
        } = self;
        let handle = match registry.client_mut(Some(index)) {
            Ok(handle) => handle,
            Err(e) => return reply.fail(e),
        };
        let native = &handle.native;

        match request {
            ClientRequest::Release => {
                registry.remove(index);
                reply.resolve(Reply::done());
            }
            ClientRequest::Login { token, user_id } => {
                native.login(token, user_id, inbox.unit(reply));
            }
            ClientRequest::Logout => native.logout(inbox.unit(reply)),
            ClientRequest::SendMessageToPeer {
                peer_id,
                message,
                options,
            } => native.send_message_to_peer(peer_id, message, options, inbox.unit(reply)),
            ClientRequest::CreateChannel { channel_id } => {
                let generation = handle.next_channel_generation();
                let events =
                    inbox.channel_sink(index, handle.generation, channel_id.clone(), generation);
                match handle.native.create_channel(&channel_id, events) {
                    Ok(native) => {
                        handle.add_channel(channel_id.clone(), ChannelHandle { generation, native });
                        info!(client_index = %index, channel_id = %channel_id, "channel created");
                        debug!(event_channel = %config.channel_event_channel(index, &channel_id), "channel events routed");
                        reply.resolve(Reply::done());
                    }
                    Err(e) => {
                        warn!(client_index = %index, channel_id = %channel_id, code = e.code, "createChannel failed");
                        reply.fail(e);
                    }
                }
            }
            ClientRequest::QueryPeersOnlineStatus { peer_ids } => native.query_peers_online_status(
                peer_ids,
                inbox.encoded(reply, |status: BTreeMap<String, bool>| marshal::online_status(&status)),
            ),
            ClientRequest::SubscribePeersOnlineStatus { peer_ids } => {
                native.subscribe_peers_online_status(peer_ids, inbox.unit(reply));
            }
            ClientRequest::UnsubscribePeersOnlineStatus { peer_ids } => {
                native.unsubscribe_peers_online_status(peer_ids, inbox.unit(reply));
            }
            ClientRequest::QueryPeersBySubscriptionOption { option } => native
                .query_peers_by_subscription_option(
                    option,
                    inbox.encoded(reply, |peers: BTreeSet<String>| marshal::peer_ids(&peers)),
                ),
            ClientRequest::RenewToken { token } => native.renew_token(token, inbox.unit(reply)),

            // -- Local user attributes --
            ClientRequest::SetLocalUserAttributes { attributes } => {
                native.set_local_user_attributes(attributes, inbox.unit(reply));
            }
            ClientRequest::AddOrUpdateLocalUserAttributes { attributes } => {
                native.add_or_update_local_user_attributes(attributes, inbox.unit(reply));
            }
            ClientRequest::DeleteLocalUserAttributesByKeys { keys } => {
                native.delete_local_user_attributes_by_keys(keys, inbox.unit(reply));
            }
            ClientRequest::ClearLocalUserAttributes => {
                native.clear_local_user_attributes(inbox.unit(reply));
            }
            ClientRequest::GetUserAttributes { user_id } => native.get_user_attributes(
                user_id,
                inbox.encoded(reply, |attrs: Vec<RtmAttribute>| marshal::attributes(&attrs)),
            ),
            ClientRequest::GetUserAttributesByKeys { user_id, keys } => native
                .get_user_attributes_by_keys(
                    user_id,
                    keys,
                    inbox.encoded(reply, |attrs: Vec<RtmAttribute>| marshal::attributes(&attrs)),
                ),

            // -- Channel attributes --
            ClientRequest::SetChannelAttributes {
                channel_id,
                attributes,
                options,
            } => native.set_channel_attributes(channel_id, attributes, options, inbox.unit(reply)),
            ClientRequest::AddOrUpdateChannelAttributes {
                channel_id,
                attributes,
                options,
            } => native.add_or_update_channel_attributes(
                channel_id,
                attributes,
                options,
                inbox.unit(reply),
            ),
            ClientRequest::DeleteChannelAttributesByKeys {
                channel_id,
                keys,
                options,
            } => native.delete_channel_attributes_by_keys(channel_id, keys, options, inbox.unit(reply)),
            ClientRequest::ClearChannelAttributes {
                channel_id,
                options,
            } => native.clear_channel_attributes(channel_id, options, inbox.unit(reply)),
            ClientRequest::GetChannelAttributes { channel_id } => native.get_channel_attributes(
                channel_id,
                inbox.encoded(reply, |attrs: Vec<ChannelAttribute>| marshal::channel_attributes(&attrs)),
            ),
            ClientRequest::GetChannelAttributesByKeys { channel_id, keys } => native
                .get_channel_attributes_by_keys(
                    channel_id,
                    keys,
                    inbox.encoded(reply, |attrs: Vec<ChannelAttribute>| marshal::channel_attributes(&attrs)),
                ),
            ClientRequest::GetChannelMemberCount { channel_ids } => native.get_channel_member_count(
                channel_ids,
                inbox.encoded(reply, |counts: Vec<ChannelMemberCount>| marshal::member_counts(&counts)),
            ),

            // -- Runtime configuration --
            ClientRequest::SetParameters { parameters } => {
                reply.resolve(Reply::from_status(name, native.set_parameters(&parameters)));
            }
            ClientRequest::SetLogFile { file_path } => {
                reply.resolve(Reply::from_status(name, native.set_log_file(&file_path)));
            }
            ClientRequest::SetLogFilter { filter } => {
                reply.resolve(Reply::from_status(name, native.set_log_filter(filter)));
            }
            ClientRequest::SetLogFileSize { file_size_kb } => {
                reply.resolve(Reply::from_status(name, native.set_log_file_size(file_size_kb)));
            }
        }
    }
}
