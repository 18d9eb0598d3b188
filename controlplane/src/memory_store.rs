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

//! An in-memory [`ObjectStore`] that behaves like the API server for the calls the
//! reconciler makes. Used to exercise the control loop without a cluster.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;
use tokio::sync::Barrier;

use crate::*;

/// Store operations that can have a failure injected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    GetDebugContainer,
    GetDeployment,
    CreateDeployment,
}

#[derive(Default)]
struct State {
    debug_containers: BTreeMap<NamespacedName, DebugContainer>,
    deployments: BTreeMap<NamespacedName, Deployment>,
    faults: HashMap<Operation, String>,
    deployment_creates: usize,
    next_uid: u64,
}

impl State {
    fn assign_uid(&mut self, meta: &mut kube::core::ObjectMeta) {
        if meta.uid.is_none() {
            self.next_uid += 1;
            meta.uid = Some(format!("00000000-0000-0000-0000-{:012}", self.next_uid));
        }
    }

    fn take_fault(&mut self, op: Operation) -> Result<()> {
        match self.faults.remove(&op) {
            Some(message) => Err(Error::StoreUnavailable(message)),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    latency: Option<Duration>,
    read_barrier: Mutex<Option<Arc<Barrier>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Delays every operation by `latency` before it touches the store.
    pub fn with_latency(latency: Duration) -> Self {
        MemoryStore {
            latency: Some(latency),
            ..MemoryStore::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores a DebugContainer, assigning a uid when it has none.
    pub fn insert_debug_container(&self, mut dc: DebugContainer) -> DebugContainer {
        let key = NamespacedName::new(dc.namespace().unwrap_or_default(), dc.name_any());
        let mut state = self.state();
        state.assign_uid(&mut dc.metadata);
        state.debug_containers.insert(key, dc.clone());
        dc
    }

    pub fn delete_debug_container(&self, key: &NamespacedName) -> Option<DebugContainer> {
        self.state().debug_containers.remove(key)
    }

    /// Stores a Deployment directly, bypassing the create counter.
    pub fn insert_deployment(&self, mut deployment: Deployment) -> Deployment {
        let key = NamespacedName::new(
            deployment.namespace().unwrap_or_default(),
            deployment.name_any(),
        );
        let mut state = self.state();
        state.assign_uid(&mut deployment.metadata);
        state.deployments.insert(key, deployment.clone());
        deployment
    }

    pub fn delete_deployment(&self, key: &NamespacedName) -> Option<Deployment> {
        self.state().deployments.remove(key)
    }

    pub fn deployment(&self, key: &NamespacedName) -> Option<Deployment> {
        self.state().deployments.get(key).cloned()
    }

    pub fn deployment_count(&self) -> usize {
        self.state().deployments.len()
    }

    /// Number of successful Deployment creates.
    pub fn deployment_creates(&self) -> usize {
        self.state().deployment_creates
    }

    /// Makes the next call of `op` fail with [`Error::StoreUnavailable`].
    pub fn fail_next(&self, op: Operation, message: impl Into<String>) {
        self.state().faults.insert(op, message.into());
    }

    /// Holds every Deployment read until `readers` reads are waiting, then releases them
    /// together. Passing 0 removes the barrier.
    pub fn synchronize_deployment_reads(&self, readers: usize) {
        let barrier = (readers > 0).then(|| Arc::new(Barrier::new(readers)));
        *self
            .read_barrier
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = barrier;
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_debug_container(&self, key: &NamespacedName) -> Result<Lookup<DebugContainer>> {
        self.simulate_latency().await;
        let mut state = self.state();
        state.take_fault(Operation::GetDebugContainer)?;
        Ok(match state.debug_containers.get(key) {
            Some(dc) => Lookup::Found(dc.clone()),
            None => Lookup::NotFound,
        })
    }

    async fn get_deployment(&self, key: &NamespacedName) -> Result<Lookup<Deployment>> {
        self.simulate_latency().await;
        let found = {
            let mut state = self.state();
            state.take_fault(Operation::GetDeployment)?;
            state.deployments.get(key).cloned()
        };

        let barrier = self
            .read_barrier
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        Ok(match found {
            Some(deployment) => Lookup::Found(deployment),
            None => Lookup::NotFound,
        })
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        self.simulate_latency().await;
        let ns = deployment
            .namespace()
            .ok_or(Error::InvalidConfigError("invalid namespace".to_string()))?;
        let key = NamespacedName::new(ns, deployment.name_any());

        let mut state = self.state();
        state.take_fault(Operation::CreateDeployment)?;
        if state.deployments.contains_key(&key) {
            return Err(Error::AlreadyExists {
                kind: "Deployment",
                key: key.to_string(),
            });
        }

        let mut created = deployment.clone();
        state.assign_uid(&mut created.metadata);
        state.deployments.insert(key, created.clone());
        state.deployment_creates += 1;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ObjectMeta;

    fn deployment(ns: &str, name: &str) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(ns.to_string()),
                ..ObjectMeta::default()
            },
            ..Deployment::default()
        }
    }

    #[tokio::test]
    async fn second_create_of_same_key_conflicts() {
        let store = MemoryStore::new();
        let created = store.create_deployment(&deployment("default", "a")).await.unwrap();
        assert!(created.uid().is_some());

        let err = store
            .create_deployment(&deployment("default", "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert_eq!(store.deployment_creates(), 1);
        assert_eq!(store.deployment_count(), 1);
    }

    #[tokio::test]
    async fn injected_faults_fire_once() {
        let store = MemoryStore::new();
        let key = NamespacedName::new("default", "a");
        store.fail_next(Operation::GetDeployment, "connection reset");

        let err = store.get_deployment(&key).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(ref msg) if msg == "connection reset"));
        assert_eq!(store.get_deployment(&key).await.unwrap(), Lookup::NotFound);
    }

    #[tokio::test]
    async fn namespaces_are_part_of_the_key() {
        let store = MemoryStore::new();
        store.insert_deployment(deployment("team-a", "a"));

        let key = NamespacedName::new("team-b", "a");
        assert_eq!(store.get_deployment(&key).await.unwrap(), Lookup::NotFound);
        assert!(store.deployment(&NamespacedName::new("team-a", "a")).is_some());
    }
}
