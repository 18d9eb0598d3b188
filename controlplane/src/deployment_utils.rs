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

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use kube::{core::ObjectMeta, Resource, ResourceExt};

use crate::{consts::*, *};

// Returns the key of the Deployment managed for the provided DebugContainer.
pub fn deployment_key(dc: &DebugContainer) -> NamespacedName {
    NamespacedName::new(dc.namespace().unwrap_or_default(), dc.name_any())
}

// Labels selecting the pods of the Deployment managed for the provided DebugContainer.
pub fn selector_labels(dc: &DebugContainer) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            APP_NAME_LABEL.to_string(),
            DEBUGCONTAINER_APP_LABEL.to_string(),
        ),
        (APP_INSTANCE_LABEL.to_string(), dc.name_any()),
    ])
}

// Builds a controller owner reference pointing at the provided DebugContainer.
//
// Objects read from the API server always carry a uid; a missing one yields an
// empty uid rather than an error.
pub fn owner_reference(dc: &DebugContainer) -> metav1::OwnerReference {
    metav1::OwnerReference {
        api_version: DebugContainer::api_version(&()).to_string(),
        kind: DebugContainer::kind(&()).to_string(),
        name: dc.name_any(),
        uid: dc.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

// Builds the Deployment the provided DebugContainer asks for.
pub fn desired_deployment(dc: &DebugContainer) -> Deployment {
    let key = deployment_key(dc);
    let selector = selector_labels(dc);

    let mut labels = selector.clone();
    labels.insert(
        APP_MANAGED_BY_LABEL.to_string(),
        DBG_OPERATOR_FIELD_MANAGER.to_string(),
    );

    let command = (!dc.spec.command.is_empty()).then(|| dc.spec.command.clone());

    Deployment {
        metadata: ObjectMeta {
            name: Some(key.name),
            namespace: Some(key.namespace),
            labels: Some(labels),
            owner_references: Some(vec![owner_reference(dc)]),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(dc.spec.replicas),
            selector: metav1::LabelSelector {
                match_labels: Some(selector.clone()),
                ..metav1::LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: DEBUG_CONTAINER_NAME.to_string(),
                        image: Some(dc.spec.image.clone()),
                        command,
                        ..Container::default()
                    }],
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}
