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

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use kube::runtime::reflector::ObjectRef;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use config::Config;
pub use crd::{DebugContainer, DebugContainerSpec};
pub use debugcontainer_controller::controller as debugcontainer_controller;
#[cfg(any(test, feature = "test-util"))]
pub use memory_store::MemoryStore;
pub use store::{KubeStore, Lookup, ObjectStore};

pub mod config;
pub mod consts;
pub mod crd;
pub mod debugcontainer_controller;
pub mod deployment_utils;
#[cfg(any(test, feature = "test-util"))]
pub mod memory_store;
pub mod store;

// Context for our reconciler
#[derive(Clone)]
pub struct Context {
    /// Object store the reconciler reads from and creates into
    pub store: Arc<dyn ObjectStore>,
    pub config: Config,
    /// Cancelled when the process shuts down; every reconcile runs under a child token.
    pub shutdown: CancellationToken,
}

impl Context {
    pub fn new(store: Arc<dyn ObjectStore>, config: Config) -> Self {
        Context {
            store,
            config,
            shutdown: CancellationToken::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("kube error: {0}")]
    KubeError(#[source] kube::Error),
    #[error("invalid configuration: `{0}`")]
    InvalidConfigError(String),
    #[error("error querying DebugContainer CRD: `{0}`; is the CRD installed?")]
    CRDNotFoundError(#[source] kube::Error),
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: String },
    #[error("object store unavailable: `{0}`")]
    StoreUnavailable(String),
    #[error("reconcile of {0} cancelled")]
    Cancelled(String),
    #[error("reconcile of {key} exceeded its {timeout:?} deadline")]
    DeadlineExceeded { key: String, timeout: Duration },
}

impl Error {
    /// Reconciliation is level-triggered, so anything short of a malformed
    /// request is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::InvalidConfigError(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedName {
    pub name: String,
    pub namespace: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        NamespacedName {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl Display for NamespacedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.namespace.as_str())?;
        f.write_str("/")?;
        f.write_str(self.name.as_str())
    }
}

impl TryFrom<&ObjectRef<DebugContainer>> for NamespacedName {
    type Error = Error;

    fn try_from(obj: &ObjectRef<DebugContainer>) -> Result<Self> {
        let namespace = obj
            .namespace
            .clone()
            .ok_or(Error::InvalidConfigError("invalid namespace".to_string()))?;
        Ok(NamespacedName::new(namespace, obj.name.clone()))
    }
}
