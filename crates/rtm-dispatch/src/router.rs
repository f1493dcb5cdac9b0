// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Closed routing table: caller kinds and the method names each one accepts.
//
// Anything not listed here resolves as "not implemented" before any handle
// lookup or argument decoding happens.

use rtm_core::BridgeError;
use rtm_core::error::Result;

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Name used on the method channel.
            pub const fn wire_name(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            pub fn from_wire(name: &str) -> Option<Self> {
                match name {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

wire_enum! {
    /// Object kind a request is aimed at.
    Caller {
        Static => "AgoraRtmClient#static",
        Client => "AgoraRtmClient",
        Channel => "AgoraRtmChannel",
        CallManager => "AgoraRtmCallManager",
    }
}

wire_enum! {
    StaticMethod {
        CreateInstance => "createInstance",
        GetSdkVersion => "getSdkVersion",
        SetRtmServiceContext => "setRtmServiceContext",
    }
}

wire_enum! {
    ClientMethod {
        Release => "release",
        Login => "login",
        Logout => "logout",
        SendMessageToPeer => "sendMessageToPeer",
        CreateChannel => "createChannel",
        QueryPeersOnlineStatus => "queryPeersOnlineStatus",
        SubscribePeersOnlineStatus => "subscribePeersOnlineStatus",
        UnsubscribePeersOnlineStatus => "unsubscribePeersOnlineStatus",
        QueryPeersBySubscriptionOption => "queryPeersBySubscriptionOption",
        RenewToken => "renewToken",
        SetLocalUserAttributes => "setLocalUserAttributes",
        AddOrUpdateLocalUserAttributes => "addOrUpdateLocalUserAttributes",
        DeleteLocalUserAttributesByKeys => "deleteLocalUserAttributesByKeys",
        ClearLocalUserAttributes => "clearLocalUserAttributes",
        GetUserAttributes => "getUserAttributes",
        GetUserAttributesByKeys => "getUserAttributesByKeys",
        SetChannelAttributes => "setChannelAttributes",
        AddOrUpdateChannelAttributes => "addOrUpdateChannelAttributes",
        DeleteChannelAttributesByKeys => "deleteChannelAttributesByKeys",
        ClearChannelAttributes => "clearChannelAttributes",
        GetChannelAttributes => "getChannelAttributes",
        GetChannelAttributesByKeys => "getChannelAttributesByKeys",
        GetChannelMemberCount => "getChannelMemberCount",
        SetParameters => "setParameters",
        SetLogFile => "setLogFile",
        SetLogFilter => "setLogFilter",
        SetLogFileSize => "setLogFileSize",
    }
}

wire_enum! {
    ChannelMethod {
        Join => "join",
        Leave => "leave",
        SendMessage => "sendMessage",
        GetMembers => "getMembers",
        Release => "release",
    }
}

wire_enum! {
    CallMethod {
        CreateLocalInvitation => "createLocalInvitation",
        SendLocalInvitation => "sendLocalInvitation",
        AcceptRemoteInvitation => "acceptRemoteInvitation",
        RefuseRemoteInvitation => "refuseRemoteInvitation",
        CancelLocalInvitation => "cancelLocalInvitation",
    }
}

/// A fully resolved (caller, method) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Static(StaticMethod),
    Client(ClientMethod),
    Channel(ChannelMethod),
    Call(CallMethod),
}

impl Route {
    /// Resolve a caller tag and method name. Unknown callers and unknown
    /// methods of a known caller both yield `NotImplemented`.
    pub fn parse(caller: Option<&str>, method: &str) -> Result<Self> {
        let not_implemented = || BridgeError::NotImplemented {
            caller: caller.unwrap_or("<none>").to_string(),
            method: method.to_string(),
        };
        let kind = caller.and_then(Caller::from_wire).ok_or_else(not_implemented)?;
        let route = match kind {
            Caller::Static => StaticMethod::from_wire(method).map(Self::Static),
            Caller::Client => ClientMethod::from_wire(method).map(Self::Client),
            Caller::Channel => ChannelMethod::from_wire(method).map(Self::Channel),
            Caller::CallManager => CallMethod::from_wire(method).map(Self::Call),
        };
        route.ok_or_else(not_implemented)
    }

    pub fn caller(self) -> Caller {
        match self {
            Self::Static(_) => Caller::Static,
            Self::Client(_) => Caller::Client,
            Self::Channel(_) => Caller::Channel,
            Self::Call(_) => Caller::CallManager,
        }
    }

    pub fn method_name(self) -> &'static str {
        match self {
            Self::Static(m) => m.wire_name(),
            Self::Client(m) => m.wire_name(),
            Self::Channel(m) => m.wire_name(),
            Self::Call(m) => m.wire_name(),
        }
    }

    /// Every route the bridge understands.
    pub fn all() -> impl Iterator<Item = Self> {
        StaticMethod::ALL
            .iter()
            .copied()
            .map(Self::Static)
            .chain(ClientMethod::ALL.iter().copied().map(Self::Client))
            .chain(ChannelMethod::ALL.iter().copied().map(Self::Channel))
            .chain(CallMethod::ALL.iter().copied().map(Self::Call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtm_core::error::codes;

    #[test]
    fn every_route_parses_from_its_own_names() {
        for route in Route::all() {
            let parsed = Route::parse(Some(route.caller().wire_name()), route.method_name())
                .expect("known route");
            assert_eq!(parsed, route);
        }
    }

    #[test]
    fn unknown_caller_is_not_implemented() {
        let err = Route::parse(Some("AgoraRtmKitchenSink"), "login").expect_err("unknown caller");
        assert_eq!(err.code(), codes::NOT_IMPLEMENTED);
        let err = Route::parse(None, "login").expect_err("missing caller");
        assert_eq!(err.code(), codes::NOT_IMPLEMENTED);
    }

    #[test]
    fn method_of_another_caller_is_not_implemented() {
        // `join` belongs to channels, not clients.
        let err = Route::parse(Some("AgoraRtmClient"), "join").expect_err("wrong group");
        assert!(matches!(err, BridgeError::NotImplemented { .. }));
    }

    #[test]
    fn release_exists_in_two_groups() {
        assert_eq!(
            Route::parse(Some("AgoraRtmClient"), "release").expect("client release"),
            Route::Client(ClientMethod::Release)
        );
        assert_eq!(
            Route::parse(Some("AgoraRtmChannel"), "release").expect("channel release"),
            Route::Channel(ChannelMethod::Release)
        );
    }

    #[test]
    fn method_names_are_case_sensitive() {
        assert!(Route::parse(Some("AgoraRtmClient"), "Login").is_err());
    }
}
