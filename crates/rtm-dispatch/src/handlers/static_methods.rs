// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use tracing::{info, instrument, warn};

use rtm_core::ClientIndex;
use rtm_core::error::Result;
use rtm_native::NativeClient;

use crate::args::{Args, Envelope};
use crate::bridge::Bridge;
use crate::registry::ClientHandle;
use crate::reply::{PendingReply, Reply};
use crate::request::StaticRequest;
use crate::router::StaticMethod;

impl Bridge {
    pub(crate) fn handle_static(&mut self, method: StaticMethod, env: &Envelope, reply: PendingReply) {
        let request = match StaticRequest::decode(method, &Args::new(method.wire_name(), &env.params)) {
            Ok(request) => request,
            Err(e) => return reply.fail(e),
        };
        match request {
            StaticRequest::CreateInstance { app_id } => match self.create_instance(&app_id) {
                Ok(index) => reply.resolve(Reply::success(index.0)),
                Err(e) => reply.fail(e),
            },
            StaticRequest::GetSdkVersion => reply.resolve(Reply::success(self.sdk.sdk_version())),
            StaticRequest::SetRtmServiceContext { context } => {
                let status = self.sdk.set_service_context(&context);
                reply.resolve(Reply::from_status(method.wire_name(), status));
            }
        }
    }

    #[instrument(skip(self, app_id))]
    fn create_instance(&mut self, app_id: &str) -> Result<ClientIndex> {
        let index = self.registry.allocate()?;
        let generation = self.registry.next_generation();
        let events = self.inbox.client_sink(index, generation);
        let native = self.sdk.create_client(app_id, events)?;
        self.apply_log_config(index, native.as_ref());
        self.registry.insert(ClientHandle::new(index, generation, native));
        info!(client_index = %index, "client instance created");
        Ok(index)
    }

    /// Push configured SDK log settings into a fresh client. Failures are
    /// logged, not fatal.
    fn apply_log_config(&self, index: ClientIndex, native: &dyn NativeClient) {
        let log = &self.config.log;
        let mut results = Vec::new();
        if let Some(file) = &log.file {
            results.push(("setLogFile", native.set_log_file(&file.to_string_lossy())));
        }
        if let Some(filter) = log.filter {
            results.push(("setLogFilter", native.set_log_filter(filter)));
        }
        if let Some(size) = log.file_size_kb {
            results.push(("setLogFileSize", native.set_log_file_size(size)));
        }
        for (operation, status) in results {
            if status != 0 {
                warn!(client_index = %index, operation, status, "log setting rejected by SDK");
            }
        }
    }
}
