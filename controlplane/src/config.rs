/*
Copyright 2024 The Kubernetes Authors.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::time::Duration;

use clap::Parser;

/// Command line configuration for the DebugContainer controller.
#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[clap(name = "controller", about = "Reconciles DebugContainer resources into Deployments")]
pub struct Config {
    /// Only watch DebugContainers in this namespace (all namespaces when unset).
    #[clap(long)]
    pub namespace: Option<String>,
    /// Seconds to wait before retrying a failed reconcile.
    #[clap(long, default_value_t = 5)]
    pub requeue_after_secs: u64,
    /// Seconds a single reconcile may spend talking to the API server.
    #[clap(long, default_value_t = 30)]
    pub reconcile_timeout_secs: u64,
    /// Log filter used when RUST_LOG is not set.
    #[clap(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn requeue_after(&self) -> Duration {
        Duration::from_secs(self.requeue_after_secs)
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["controller"])
    }
}
