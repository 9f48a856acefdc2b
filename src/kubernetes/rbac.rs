// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Service account and RBAC application

use crate::constants::paths;
use crate::error::Result;
use crate::kubernetes::apply::{apply_object, object_ref, Applied, ApplyMode};
use crate::kubernetes::naming::{prefix_cluster_role, prefix_cluster_role_binding};
use crate::manifest::{load_yaml, ResourceBuckets};
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::{Api, Client};
use std::path::Path;
use tracing::instrument;

/// Apply the operator service account from its fixed manifest
#[instrument(skip(client, resources_dir))]
pub async fn apply_service_account(
    client: &Client,
    namespace: &str,
    resources_dir: &Path,
    mode: ApplyMode,
) -> Result<Applied> {
    let mut account: ServiceAccount = load_yaml(&resources_dir.join(paths::SERVICE_ACCOUNT))?;
    account.metadata.namespace = Some(namespace.to_string());

    let api: Api<ServiceAccount> = Api::namespaced(client.clone(), namespace);
    apply_object(&api, object_ref("ServiceAccount", &account), account, mode).await
}

/// Apply every scanned RBAC object: roles, role bindings, cluster roles,
/// then cluster role bindings. Cluster-scoped names get the namespace prefix.
#[instrument(skip(client, buckets))]
pub async fn apply_rbac(
    client: &Client,
    namespace: &str,
    buckets: &ResourceBuckets,
    mode: ApplyMode,
) -> Result<Vec<Applied>> {
    let mut applied = Vec::new();

    let roles: Api<Role> = Api::namespaced(client.clone(), namespace);
    for role in &buckets.roles {
        let mut role = role.clone();
        role.metadata.namespace = Some(namespace.to_string());
        applied.push(apply_object(&roles, object_ref("Role", &role), role, mode).await?);
    }

    let role_bindings: Api<RoleBinding> = Api::namespaced(client.clone(), namespace);
    for binding in &buckets.role_bindings {
        let mut binding = binding.clone();
        binding.metadata.namespace = Some(namespace.to_string());
        applied.push(
            apply_object(
                &role_bindings,
                object_ref("RoleBinding", &binding),
                binding,
                mode,
            )
            .await?,
        );
    }

    let cluster_roles: Api<ClusterRole> = Api::all(client.clone());
    for role in &buckets.cluster_roles {
        let role = prefix_cluster_role(role.clone(), namespace);
        applied.push(
            apply_object(&cluster_roles, object_ref("ClusterRole", &role), role, mode).await?,
        );
    }

    let cluster_role_bindings: Api<ClusterRoleBinding> = Api::all(client.clone());
    for binding in &buckets.cluster_role_bindings {
        let binding = prefix_cluster_role_binding(binding.clone(), namespace);
        applied.push(
            apply_object(
                &cluster_role_bindings,
                object_ref("ClusterRoleBinding", &binding),
                binding,
                mode,
            )
            .await?,
        );
    }

    Ok(applied)
}
