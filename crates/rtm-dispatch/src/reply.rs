// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Terminal replies and the one-shot continuation that delivers them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use rtm_core::{BridgeError, NativeError};

/// The single terminal outcome of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Reply {
    Success {
        value: Value,
    },
    /// `code` is the decimal form of the integer error code.
    Error {
        code: String,
        description: String,
    },
    NotImplemented,
}

impl Reply {
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success {
            value: value.into(),
        }
    }

    /// Success with a null value.
    pub fn done() -> Self {
        Self::Success { value: Value::Null }
    }

    /// Map a native completion result with no payload.
    pub fn from_unit(result: Result<(), NativeError>) -> Self {
        match result {
            Ok(()) => Self::done(),
            Err(e) => e.into(),
        }
    }

    /// Map a synchronous SDK status: 0 is success with null, anything else
    /// is a native failure carrying that code.
    pub fn from_status(operation: &str, status: i32) -> Self {
        if status == 0 {
            Self::done()
        } else {
            NativeError::from_status(operation, status).into()
        }
    }

    /// Integer error code, if this is an error reply.
    pub fn error_code(&self) -> Option<i32> {
        match self {
            Self::Error { code, .. } => code.parse().ok(),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success { value } => Some(value),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<BridgeError> for Reply {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::NotImplemented { .. } => Self::NotImplemented,
            other => Self::Error {
                code: other.code().to_string(),
                description: other.to_string(),
            },
        }
    }
}

impl From<NativeError> for Reply {
    fn from(err: NativeError) -> Self {
        BridgeError::from(err).into()
    }
}

/// One outstanding caller request. Resolving consumes it, so it cannot be
/// resolved twice; dropping it unresolved answers with the abandoned error.
#[derive(Debug)]
pub struct PendingReply {
    tx: Option<oneshot::Sender<Reply>>,
}

impl PendingReply {
    pub fn new() -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn resolve(mut self, reply: Reply) {
        if let Some(tx) = self.tx.take() {
            if tx.send(reply).is_err() {
                debug!("reply receiver gone");
            }
        }
    }

    pub fn fail(self, err: impl Into<Reply>) {
        self.resolve(err.into());
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            debug!("pending reply dropped unresolved");
            let _ = tx.send(BridgeError::Abandoned.into());
        }
    }
}
