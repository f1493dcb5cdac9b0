// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RTM bridge: core types, error definitions, and configuration shared by the
// native SDK seam, the dispatcher, and the host transport.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BridgeConfig, LogConfig};
pub use error::{BridgeError, NativeError, Target};
pub use types::*;
