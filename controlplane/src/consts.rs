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

// Field manager used for objects created by the controller.
pub const DBG_OPERATOR_FIELD_MANAGER: &str = "dbg-operator";

// Name of the single container in a managed Deployment.
pub const DEBUG_CONTAINER_NAME: &str = "debug";

// Replica count used when a DebugContainer leaves it unset.
pub const DEFAULT_REPLICAS: i32 = 1;

// Recommended Kubernetes labels set on every managed Deployment.
pub const APP_NAME_LABEL: &str = "app.kubernetes.io/name";
pub const APP_INSTANCE_LABEL: &str = "app.kubernetes.io/instance";
pub const APP_MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

// Value of the app.kubernetes.io/name label.
pub const DEBUGCONTAINER_APP_LABEL: &str = "debugcontainer";
