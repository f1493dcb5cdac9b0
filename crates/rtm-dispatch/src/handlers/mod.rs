// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request handlers, one module per caller kind:
//   - `static_methods` : client factory, SDK version, service context
//   - `client`         : session, messaging, presence, attributes, log config
//   - `channel`        : join/leave, channel messages, members, release
//   - `call`           : invitation lifecycle
//
// Each handler resolves its target handle first, then decodes arguments,
// then forwards to the native SDK.

mod call;
mod channel;
mod client;
mod static_methods;
