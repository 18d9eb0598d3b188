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

use std::{
    future::Future,
    ops::Sub,
    sync::Arc,
    time::Instant,
};

use crate::{deployment_utils::*, *};

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{Api, ListParams},
    runtime::{controller::Action, reflector::ObjectRef, watcher::Config as WatcherConfig, Controller},
    Client,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of a successful [`ensure_deployment`].
#[derive(Debug, Clone, PartialEq)]
pub enum Ensured {
    /// The Deployment was missing and has been created from the desired definition.
    Created(Deployment),
    /// A Deployment already exists and was left untouched.
    AlreadyExists(Deployment),
}

// Runs a single store call of the reconcile for `key`, aborting it when `cancel`
// fires or the reconcile deadline passes.
async fn guarded<T>(
    key: &NamespacedName,
    ctx: &Context,
    cancel: &CancellationToken,
    deadline: tokio::time::Instant,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled(key.to_string())),
        res = tokio::time::timeout_at(deadline, call) => res.map_err(|_| Error::DeadlineExceeded {
            key: key.to_string(),
            timeout: ctx.config.reconcile_timeout(),
        })?,
    }
}

/// Creates the Deployment at `key` from `desired` unless one already exists.
///
/// An existing Deployment counts as converged: it is never compared with `desired`
/// or updated, so drift in image or replicas is not healed here. Any error means the
/// caller should requeue.
pub async fn ensure_deployment(
    ctx: &Context,
    key: &NamespacedName,
    desired: &Deployment,
    cancel: &CancellationToken,
    deadline: tokio::time::Instant,
) -> Result<Ensured> {
    let existing = guarded(key, ctx, cancel, deadline, ctx.store.get_deployment(key))
        .await
        .inspect_err(|err| error!(phase = "get_deployment", %key, %err, "failed to read Deployment"))?;

    match existing {
        Lookup::Found(deployment) => Ok(Ensured::AlreadyExists(deployment)),
        Lookup::NotFound => {
            info!(%key, "creating Deployment");
            let created = guarded(key, ctx, cancel, deadline, ctx.store.create_deployment(desired))
                .await
                .inspect_err(|err| {
                    error!(phase = "create_deployment", %key, %err, "failed to create Deployment")
                })?;
            Ok(Ensured::Created(created))
        }
    }
}

/// Drives the DebugContainer at `key` toward having its Deployment.
///
/// The DebugContainer is always re-read, so the outcome depends only on the current
/// cluster state and never on what triggered the call.
#[instrument(skip_all, fields(debugcontainer = %key))]
pub async fn reconcile_debug_container(
    key: &NamespacedName,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<Action> {
    let start = Instant::now();
    let deadline = tokio::time::Instant::now() + ctx.config.reconcile_timeout();

    let dc = match guarded(key, ctx, cancel, deadline, ctx.store.get_debug_container(key)).await {
        Ok(Lookup::Found(dc)) => dc,
        Ok(Lookup::NotFound) => {
            // Deleted after the request was queued; owned objects are garbage collected.
            debug!("DebugContainer not found, nothing to do");
            return Ok(Action::await_change());
        }
        Err(err) => {
            error!(phase = "get_debugcontainer", %err, "failed to read DebugContainer");
            return Err(err);
        }
    };

    let desired = desired_deployment(&dc);
    let managed_key = deployment_key(&dc);

    match ensure_deployment(ctx, &managed_key, &desired, cancel, deadline).await? {
        Ensured::Created(_) => {
            info!(deployment = %managed_key, "created Deployment");
        }
        Ensured::AlreadyExists(_) => {
            info!(deployment = %managed_key, "skip reconcile: Deployment already exists");
        }
    }

    let duration = Instant::now().sub(start);
    info!("finished reconciling in {:?} ms", duration.as_millis());
    Ok(Action::await_change())
}

pub async fn reconcile(dc: Arc<DebugContainer>, ctx: Arc<Context>) -> Result<Action> {
    let key = NamespacedName::try_from(&ObjectRef::from_obj(dc.as_ref()))?;
    let cancel = ctx.shutdown.child_token();
    reconcile_debug_container(&key, &ctx, &cancel).await
}

pub fn error_policy(dc: Arc<DebugContainer>, error: &Error, ctx: Arc<Context>) -> Action {
    if error.is_retryable() {
        warn!(debugcontainer = %ObjectRef::from_obj(dc.as_ref()), "reconcile failed: {:?}", error);
        Action::requeue(ctx.config.requeue_after())
    } else {
        error!(debugcontainer = %ObjectRef::from_obj(dc.as_ref()), "reconcile failed permanently: {:?}", error);
        Action::await_change()
    }
}

pub async fn controller(client: Client, ctx: Context) -> Result<()> {
    let (debug_containers, deployments) = match ctx.config.namespace.as_deref() {
        Some(ns) => (
            Api::<DebugContainer>::namespaced(client.clone(), ns),
            Api::<Deployment>::namespaced(client, ns),
        ),
        None => (
            Api::<DebugContainer>::all(client.clone()),
            Api::<Deployment>::all(client),
        ),
    };
    debug_containers
        .list(&ListParams::default().limit(1))
        .await
        .map_err(Error::CRDNotFoundError)?;

    info!(namespace = ?ctx.config.namespace, "starting DebugContainer controller");
    Controller::new(debug_containers, WatcherConfig::default().any_semantic())
        .owns(deployments, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, Arc::new(ctx))
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;

    info!("DebugContainer controller terminated");
    Ok(())
}
