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

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_REPLICAS;

/// DebugContainer asks for a long-running Deployment of a debugging image.
///
/// The controller creates a Deployment with the same name and namespace, owned by the
/// DebugContainer so that deleting it garbage collects the Deployment.
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "sielert.com",
    version = "v1alpha1",
    kind = "DebugContainer",
    plural = "debugcontainers",
    shortname = "dbg",
    namespaced,
    printcolumn = r#"{"name":"Image", "type":"string", "jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DebugContainerSpec {
    /// Container image to run, e.g. `busybox:latest`.
    pub image: String,

    /// Number of pods in the managed Deployment.
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Overrides the image entrypoint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

fn default_replicas() -> i32 {
    DEFAULT_REPLICAS
}
