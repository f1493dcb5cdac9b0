// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Invitation lifecycle. Outgoing invitations are registered when created;
// incoming ones when the SDK reports them (see `events`). Accept, refuse, and
// cancel drop the entry once the native call resolves, whether it succeeded
// or not.

use tracing::debug;

use rtm_core::{ClientIndex, InvitationHash, InvitationKind};

use crate::args::{Args, Envelope};
use crate::bridge::Bridge;
use crate::marshal;
use crate::registry::Tracked;
use crate::reply::{PendingReply, Reply};
use crate::request::{CallRequest, InvitationRef};
use crate::router::CallMethod;

#[derive(Clone, Copy)]
enum Direction {
    Outgoing,
    Incoming,
}

impl Bridge {
    pub(crate) fn handle_call(&mut self, method: CallMethod, env: &Envelope, reply: PendingReply) {
        let name = method.wire_name();
        let prepared = self.registry.client(env.client_index).and_then(|handle| {
            let request = CallRequest::decode(method, &Args::new(name, &env.args))?;
            Ok((handle.index, request))
        });
        let (index, request) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!(method = name, "{e}");
                return reply.fail(e);
            }
        };
        debug!(client_index = %index, method = name, "call manager request");

        let Self { registry, inbox, .. } = self;
        let handle = match registry.client_mut(Some(index)) {
            Ok(handle) => handle,
            Err(e) => return reply.fail(e),
        };
        let generation = handle.generation;

        match request {
            CallRequest::CreateLocalInvitation { callee_id } => {
                let invitation = handle.call_manager.create_local_invitation(&callee_id);
                let hash = InvitationHash::derive(InvitationKind::Local, index, invitation.native_id);
                let tracked = Tracked::new(invitation);
                let payload = marshal::local_invitation(&hash, &tracked.invitation, tracked.created_at);
                handle.call.outgoing.insert(hash, tracked);
                reply.resolve(Reply::success(payload));
            }
            CallRequest::SendLocalInvitation(reference) => {
                let tracked = match handle.call.outgoing_mut(&reference.hash) {
                    Ok(tracked) => tracked,
                    Err(e) => return reply.fail(e),
                };
                apply_local(&mut tracked.invitation, &reference);
                let invitation = tracked.invitation.clone();
                handle
                    .call_manager
                    .send_local_invitation(invitation, inbox.unit(reply));
            }
            CallRequest::CancelLocalInvitation(reference) => {
                let tracked = match handle.call.outgoing_mut(&reference.hash) {
                    Ok(tracked) => tracked,
                    Err(e) => return reply.fail(e),
                };
                apply_local(&mut tracked.invitation, &reference);
                let invitation = tracked.invitation.clone();
                let done = consume(inbox, reply, index, generation, reference.hash, Direction::Outgoing);
                handle.call_manager.cancel_local_invitation(invitation, done);
            }
            CallRequest::AcceptRemoteInvitation(reference) => {
                let tracked = match handle.call.incoming_mut(&reference.hash) {
                    Ok(tracked) => tracked,
                    Err(e) => return reply.fail(e),
                };
                apply_remote(&mut tracked.invitation, &reference);
                let invitation = tracked.invitation.clone();
                let done = consume(inbox, reply, index, generation, reference.hash, Direction::Incoming);
                handle.call_manager.accept_remote_invitation(invitation, done);
            }
            CallRequest::RefuseRemoteInvitation(reference) => {
                let tracked = match handle.call.incoming_mut(&reference.hash) {
                    Ok(tracked) => tracked,
                    Err(e) => return reply.fail(e),
                };
                apply_remote(&mut tracked.invitation, &reference);
                let invitation = tracked.invitation.clone();
                let done = consume(inbox, reply, index, generation, reference.hash, Direction::Incoming);
                handle.call_manager.refuse_remote_invitation(invitation, done);
            }
        }
    }
}

fn apply_local(invitation: &mut rtm_core::LocalInvitation, reference: &InvitationRef) {
    if let Some(content) = &reference.content {
        invitation.content = content.clone();
    }
    if let Some(channel_id) = &reference.channel_id {
        invitation.channel_id = channel_id.clone();
    }
}

fn apply_remote(invitation: &mut rtm_core::RemoteInvitation, reference: &InvitationRef) {
    if let Some(response) = &reference.response {
        invitation.response = response.clone();
    }
    if let Some(content) = &reference.content {
        invitation.content = content.clone();
    }
    if let Some(channel_id) = &reference.channel_id {
        invitation.channel_id = channel_id.clone();
    }
}

/// Completion that forgets the invitation before resolving the reply.
fn consume(
    inbox: &crate::bridge::Inbox,
    reply: PendingReply,
    index: ClientIndex,
    generation: u64,
    hash: InvitationHash,
    direction: Direction,
) -> rtm_native::Completion<()> {
    inbox.completion(reply, move |bridge, result| {
        if let Some(handle) = bridge.registry.live(index, generation) {
            let removed = match direction {
                Direction::Outgoing => handle.call.outgoing.remove(&hash).is_some(),
                Direction::Incoming => handle.call.incoming.remove(&hash).is_some(),
            };
            debug!(client_index = %index, hash = %hash, removed, ok = result.is_ok(), "invitation consumed");
        }
        Reply::from_unit(result)
    })
}
