// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the RTM bridge.
//
// Four error classes reach the caller: routing (not implemented), state (not
// initialized), decode (bad argument), and native (SDK status passed through).
// Locally detected conditions use negative reserved codes so they can never be
// confused with a native SDK status, which is always non-negative.

use std::fmt;

use thiserror::Error;

use crate::types::ClientIndex;

/// Reserved error codes for conditions detected by the bridge itself.
pub mod codes {
    /// The targeted client, channel, or invitation is not in the registry.
    pub const NOT_INITIALIZED: i32 = -1001;
    /// Unknown caller kind or method name.
    pub const NOT_IMPLEMENTED: i32 = -1002;
    /// A required argument is missing or has the wrong shape.
    pub const DECODE: i32 = -1003;
    /// The reply was dropped before the native call completed.
    pub const ABANDONED: i32 = -1004;
    /// No free client index is left in the registry.
    pub const REGISTRY_FULL: i32 = -1005;
    /// I/O or serialization failure inside the bridge.
    pub const INTERNAL: i32 = -1006;

    /// Whether `code` belongs to the bridge's reserved range.
    pub fn is_reserved(code: i32) -> bool {
        (-1999..=-1000).contains(&code)
    }
}

/// Failure reported by the native SDK, carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub code: i32,
    pub description: String,
}

impl NativeError {
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    /// Build an error from a bare status code, using the code's display form
    /// as the description.
    pub fn from_status(operation: &str, code: i32) -> Self {
        Self::new(code, format!("{operation} failed with status {code}"))
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl std::error::Error for NativeError {}

/// The object a failed handle lookup was aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Client(Option<ClientIndex>),
    Channel {
        client: Option<ClientIndex>,
        channel_id: Option<String>,
    },
    Invitation(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(Some(index)) => write!(f, "client {index}"),
            Self::Client(None) => f.write_str("client (no index)"),
            Self::Channel {
                client,
                channel_id,
            } => {
                let client = client.map_or_else(|| "?".to_string(), |c| c.to_string());
                let channel = channel_id.as_deref().unwrap_or("?");
                write!(f, "channel {channel} of client {client}")
            }
            Self::Invitation(hash) => write!(f, "invitation {hash}"),
        }
    }
}

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Routing --
    #[error("{caller}.{method} is not implemented")]
    NotImplemented { caller: String, method: String },

    // -- State --
    #[error("{0} is not initialized")]
    NotInitialized(Target),

    #[error("no free client index")]
    RegistryFull,

    // -- Decode --
    #[error("{method}: invalid argument `{field}`: {reason}")]
    Decode {
        method: String,
        field: String,
        reason: String,
    },

    // -- Native SDK --
    #[error("{0}")]
    Native(NativeError),

    // -- Bridge internals --
    #[error("reply abandoned before the native call completed")]
    Abandoned,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    pub fn decode(method: &str, field: &str, reason: impl ToString) -> Self {
        Self::Decode {
            method: method.to_string(),
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Integer code delivered to the caller alongside the description.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotImplemented { .. } => codes::NOT_IMPLEMENTED,
            Self::NotInitialized(_) => codes::NOT_INITIALIZED,
            Self::RegistryFull => codes::REGISTRY_FULL,
            Self::Decode { .. } => codes::DECODE,
            Self::Native(native) => native.code,
            Self::Abandoned => codes::ABANDONED,
            Self::Io(_) | Self::Serialization(_) => codes::INTERNAL,
        }
    }
}

impl From<NativeError> for BridgeError {
    fn from(err: NativeError) -> Self {
        Self::Native(err)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
