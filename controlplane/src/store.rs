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

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{Api, PostParams},
    Client, ResourceExt,
};

use crate::{consts::DBG_OPERATOR_FIELD_MANAGER, *};

/// Result of reading a single object by key.
///
/// A missing object is an expected outcome of a read, so it is kept apart from
/// the errors carried in the surrounding `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

/// The reads and writes the DebugContainer reconciler performs against the cluster.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_debug_container(&self, key: &NamespacedName) -> Result<Lookup<DebugContainer>>;

    async fn get_deployment(&self, key: &NamespacedName) -> Result<Lookup<Deployment>>;

    /// Creates the Deployment. Fails with [`Error::AlreadyExists`] when another
    /// writer created it first.
    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment>;
}

/// [`ObjectStore`] backed by the Kubernetes API server.
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        KubeStore { client }
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_debug_container(&self, key: &NamespacedName) -> Result<Lookup<DebugContainer>> {
        let api: Api<DebugContainer> = Api::namespaced(self.client.clone(), &key.namespace);
        lookup(api.get(&key.name).await)
    }

    async fn get_deployment(&self, key: &NamespacedName) -> Result<Lookup<Deployment>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &key.namespace);
        lookup(api.get(&key.name).await)
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let ns = deployment
            .namespace()
            .ok_or(Error::InvalidConfigError("invalid namespace".to_string()))?;
        let key = NamespacedName::new(ns, deployment.name_any());

        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &key.namespace);
        let params = PostParams {
            field_manager: Some(DBG_OPERATOR_FIELD_MANAGER.to_string()),
            ..PostParams::default()
        };
        api.create(&params, deployment)
            .await
            .map_err(|err| create_error("Deployment", &key, err))
    }
}

// Returns true if the provided error is a not found error.
pub fn check_if_not_found_err(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}

// Returns true if the provided error means the object already exists.
pub fn check_if_conflict_err(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 409)
}

pub(crate) fn lookup<T>(res: std::result::Result<T, kube::Error>) -> Result<Lookup<T>> {
    match res {
        Ok(obj) => Ok(Lookup::Found(obj)),
        Err(err) if check_if_not_found_err(&err) => Ok(Lookup::NotFound),
        Err(err) => Err(Error::KubeError(err)),
    }
}

pub(crate) fn create_error(kind: &'static str, key: &NamespacedName, err: kube::Error) -> Error {
    if check_if_conflict_err(&err) {
        Error::AlreadyExists {
            kind,
            key: key.to_string(),
        }
    } else {
        Error::KubeError(err)
    }
}
