// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RTM bridge host
//
// Entry point. Initialises logging, loads configuration, starts the dispatcher
// against the platform SDK, and serves line-delimited JSON on stdin/stdout
// until EOF.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use tokio::io::BufReader;

use rtm_dispatch::Dispatcher;

use services::{config_dir, stdio_host};

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries protocol frames; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rtm-bridge starting");

    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let config = config_dir::load_config(explicit);

    let (bridge, dispatcher) = Dispatcher::spawn(rtm_native::platform_sdk(), config);
    let input = BufReader::new(tokio::io::stdin());
    let served = stdio_host::serve(bridge, input, tokio::io::stdout()).await;

    if let Err(e) = dispatcher.await {
        tracing::error!(error = %e, "dispatcher task failed");
        return ExitCode::FAILURE;
    }
    match served {
        Ok(()) => {
            tracing::info!("rtm-bridge stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "stdio transport failed");
            ExitCode::FAILURE
        }
    }
}
