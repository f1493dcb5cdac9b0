// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use tracing::{debug, info};

use rtm_core::ChannelMember;

use crate::args::{Args, Envelope};
use crate::bridge::Bridge;
use crate::marshal;
use crate::reply::{PendingReply, Reply};
use crate::request::ChannelRequest;
use crate::router::ChannelMethod;

impl Bridge {
    pub(crate) fn handle_channel(&mut self, method: ChannelMethod, env: &Envelope, reply: PendingReply) {
        let name = method.wire_name();
        let prepared = self.registry.client(env.client_index).and_then(|handle| {
            handle.channel(env.channel_id.as_deref())?;
            let request = ChannelRequest::decode(method, &Args::new(name, &env.args))?;
            Ok((handle.index, request))
        });
        let (index, request) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!(method = name, "{e}");
                return reply.fail(e);
            }
        };
        let channel_id = env.channel_id.clone().unwrap_or_default();
        debug!(client_index = %index, channel_id = %channel_id, method = name, "channel request");

        let Self { registry, inbox, .. } = self;
        let handle = match registry.client_mut(Some(index)) {
            Ok(handle) => handle,
            Err(e) => return reply.fail(e),
        };
        let channel = match handle.channel(Some(&channel_id)) {
            Ok(channel) => channel,
            Err(e) => return reply.fail(e),
        };

        match request {
            ChannelRequest::Join => channel.native.join(inbox.unit(reply)),
            ChannelRequest::Leave => channel.native.leave(inbox.unit(reply)),
            ChannelRequest::SendMessage { message, options } => {
                channel.native.send_message(message, options, inbox.unit(reply));
            }
            ChannelRequest::GetMembers => channel.native.get_members(
                inbox.encoded(reply, |members: Vec<ChannelMember>| marshal::members(&members)),
            ),
            ChannelRequest::Release => {
                handle.remove_channel(&channel_id);
                info!(client_index = %index, channel_id = %channel_id, "channel released");
                reply.resolve(Reply::done());
            }
        }
    }
}
