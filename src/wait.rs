// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded convergence waits: fixed delay, pod readiness, and rollout of the
//! newest replica set. None of them can block forever.

use crate::error::{InstallerError, ObjectRef, Result};
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::Pod;
use kube::{api::ListParams, Api, Client, ResourceExt};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";

/// When to give up polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollLimit {
    Attempts(u32),
    Deadline(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub limit: PollLimit,
}

impl PollPolicy {
    pub fn attempts(interval: Duration, attempts: u32) -> Self {
        Self {
            interval,
            limit: PollLimit::Attempts(attempts),
        }
    }

    pub fn deadline(interval: Duration, deadline: Duration) -> Self {
        Self {
            interval,
            limit: PollLimit::Deadline(deadline),
        }
    }
}

/// Poll `probe` until it yields a value or the policy is exhausted.
///
/// `Ok(None)` means not ready yet. Transient probe errors are logged and
/// retried like a not-ready result; any other error ends the wait at once.
/// Exhaustion returns [`InstallerError::Timeout`].
pub async fn poll_until<T, F, Fut>(what: &str, policy: PollPolicy, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let start = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => debug!(attempt, "{} not ready yet", what),
            Err(e) if e.is_transient() => {
                warn!(attempt, error = %e, "Poll error while waiting for {}, retrying", what)
            }
            Err(e) => return Err(e),
        }

        let exhausted = match policy.limit {
            PollLimit::Attempts(max) => attempt >= max,
            PollLimit::Deadline(deadline) => start.elapsed() >= deadline,
        };
        if exhausted {
            return Err(InstallerError::Timeout {
                what: what.to_string(),
                waited: start.elapsed(),
            });
        }

        sleep(policy.interval).await;
    }
}

/// Give the API server time to flush newly created objects
pub async fn flush_delay(delay: Duration) {
    if !delay.is_zero() {
        debug!("Waiting {:?} for the API server", delay);
        sleep(delay).await;
    }
}

/// A pod is ready when it is running and its Ready condition is true
pub fn is_pod_ready(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    status.phase.as_deref() == Some("Running")
        && status
            .conditions
            .as_ref()
            .is_some_and(|c| c.iter().any(|c| c.type_ == "Ready" && c.status == "True"))
}

/// Wait until at least one pod matching `selector` is ready
#[instrument(skip(client, policy))]
pub async fn wait_for_pod_ready(
    client: &Client,
    namespace: &str,
    selector: &str,
    policy: PollPolicy,
) -> Result<String> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let params = ListParams::default().labels(selector);
    let what = format!("pod '{}' in namespace '{}'", selector, namespace);

    let (pods, params) = (&pods, &params);
    let name = poll_until(&what, policy, move || async move {
        let list = pods.list(params).await?;
        Ok(list.items.into_iter().find(is_pod_ready).map(|p| p.name_any()))
    })
    .await?;

    info!("Pod {} is ready", name);
    Ok(name)
}

fn revision(set: &ReplicaSet) -> u64 {
    set.annotations()
        .get(REVISION_ANNOTATION)
        .and_then(|r| r.parse().ok())
        .unwrap_or(0)
}

/// Replica set with the highest rollout revision
pub fn latest_replica_set(sets: &[ReplicaSet]) -> Option<&ReplicaSet> {
    sets.iter().max_by_key(|s| revision(s))
}

fn owned_by(set: &ReplicaSet, deployment: &Deployment) -> bool {
    match deployment.uid() {
        Some(uid) => set.owner_references().iter().any(|o| o.uid == uid),
        None => set.name_any().starts_with(&format!("{}-", deployment.name_any())),
    }
}

/// The rollout is complete when the deployment controller has seen the
/// latest spec, the newest replica set is fully available and no pods of
/// older replica sets remain.
pub fn is_rollout_complete(deployment: &Deployment, latest: &ReplicaSet) -> bool {
    let Some(status) = deployment.status.as_ref() else {
        return false;
    };
    let generation = deployment.metadata.generation.unwrap_or(0);
    if status.observed_generation.unwrap_or(0) < generation {
        return false;
    }

    let desired = latest.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let available = latest
        .status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .unwrap_or(0);

    available >= desired && status.replicas.unwrap_or(0) == status.updated_replicas.unwrap_or(0)
}

fn selector_string(deployment: &Deployment) -> Option<String> {
    let labels = deployment.spec.as_ref()?.selector.match_labels.as_ref()?;
    Some(
        labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Wait until the newest replica set of the named deployment is fully available
#[instrument(skip(client, policy))]
pub async fn wait_for_latest_replica_set(
    client: &Client,
    namespace: &str,
    name: &str,
    policy: PollPolicy,
) -> Result<()> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let replica_sets: Api<ReplicaSet> = Api::namespaced(client.clone(), namespace);
    let object = ObjectRef::namespaced("Deployment", name, namespace);
    let what = format!("latest replica set of {}", object);

    let (deployments, replica_sets, target) = (&deployments, &replica_sets, &object);
    poll_until(&what, policy, move || async move {
        let Some(deployment) = deployments.get_opt(name).await? else {
            return Err(InstallerError::Precondition {
                object: target.clone(),
            });
        };
        let mut params = ListParams::default();
        if let Some(selector) = selector_string(&deployment) {
            params = params.labels(&selector);
        }
        let sets: Vec<ReplicaSet> = replica_sets
            .list(&params)
            .await?
            .items
            .into_iter()
            .filter(|s| owned_by(s, &deployment))
            .collect();

        Ok(latest_replica_set(&sets)
            .filter(|latest| is_rollout_complete(&deployment, latest))
            .map(|_| ()))
    })
    .await?;

    info!("{} has converged", object);
    Ok(())
}
