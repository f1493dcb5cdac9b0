// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host services: configuration lookup and the stdio transport that stands in
// for the application's method channel.

pub mod config_dir;
pub mod stdio_host;
