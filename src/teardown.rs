// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Removal of everything an installation created, in reverse dependency order.
//!
//! Shared cluster-scoped state is guarded: the definition is kept while other
//! installations still have resources, and cluster RBAC is matched by the
//! namespace prefix so neighbouring installations are left alone.

use crate::constants::names;
use crate::error::{InstallerError, ObjectRef, Result};
use crate::kubernetes::apply::{delete_if_present, object_ref};
use crate::kubernetes::checluster::list_all_custom_resources;
use crate::kubernetes::crd::delete_crd;
use crate::kubernetes::naming::has_namespace_prefix;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::{
    api::{ApiResource, DeleteParams, DynamicObject, ListParams},
    core::GroupVersionKind,
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, info, instrument};

const OAUTH_GROUP: &str = "oauth.openshift.io";
const OAUTH_AUTHORIZATION_KIND: &str = "OAuthClientAuthorization";
const OAUTH_AUTHORIZATION_PLURAL: &str = "oauthclientauthorizations";

/// Cluster RBAC removed by prefix
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClusterRbacDeletion {
    pub deleted: Vec<ObjectRef>,
    /// Cluster role bindings among `deleted`
    pub bindings_deleted: usize,
}

/// List the objects behind `api`, keep those `keep` accepts and delete them.
/// The list is the existence probe, so a delete that hits a 404 is an error.
async fn delete_listed<K, F>(api: &Api<K>, kind: &str, keep: F) -> Result<Vec<ObjectRef>>
where
    K: Resource + Clone + DeserializeOwned + Debug,
    F: Fn(&K) -> bool,
{
    let mut deleted = Vec::new();
    for object in api.list(&ListParams::default()).await?.items {
        if !keep(&object) {
            continue;
        }
        let object = object_ref(kind, &object);
        api.delete(&object.name, &DeleteParams::default())
            .await
            .map_err(|e| InstallerError::api(object.clone(), e))?;
        info!("Deleted {}", object);
        deleted.push(object);
    }
    Ok(deleted)
}

/// Remove the authorizations granted to the installation's OAuth client
#[instrument(skip(client))]
pub async fn delete_oauth_authorizations(client: &Client, client_name: &str) -> Result<Vec<ObjectRef>> {
    let resource = ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(OAUTH_GROUP, "v1", OAUTH_AUTHORIZATION_KIND),
        OAUTH_AUTHORIZATION_PLURAL,
    );
    let api: Api<DynamicObject> = Api::all_with(client.clone(), &resource);

    let deleted = delete_listed(&api, OAUTH_AUTHORIZATION_KIND, |authorization| {
        authorization.data.get("clientName").and_then(|n| n.as_str()) == Some(client_name)
    })
    .await?;
    debug!("Removed {} authorizations for client '{}'", deleted.len(), client_name);
    Ok(deleted)
}

/// Delete the custom resource definition unless another installation still
/// has a custom resource somewhere in the cluster
#[instrument(skip(client))]
pub async fn delete_crd_if_unused(client: &Client, api_extensions_v1: bool) -> Result<bool> {
    let remaining = list_all_custom_resources(client).await?;
    if !remaining.is_empty() {
        let holders: Vec<String> = remaining
            .iter()
            .map(|r| format!("{}/{}", r.namespace().unwrap_or_default(), r.name_any()))
            .collect();
        info!(
            "Keeping CustomResourceDefinition '{}', still used by {}",
            names::CRD,
            holders.join(", ")
        );
        return Ok(false);
    }
    delete_crd(client, api_extensions_v1).await
}

/// Delete every role and role binding in the namespace
#[instrument(skip(client))]
pub async fn delete_namespaced_rbac(client: &Client, namespace: &str) -> Result<Vec<ObjectRef>> {
    let roles: Api<Role> = Api::namespaced(client.clone(), namespace);
    let role_bindings: Api<RoleBinding> = Api::namespaced(client.clone(), namespace);

    let mut deleted = delete_listed(&roles, "Role", |_| true).await?;
    deleted.extend(delete_listed(&role_bindings, "RoleBinding", |_| true).await?);
    Ok(deleted)
}

fn owned_by_installation(namespace: &str, name: &str) -> bool {
    has_namespace_prefix(namespace, name) || name.starts_with(names::ALTERNATE_COMPONENT_PREFIX)
}

/// Delete cluster roles and bindings carrying the namespace or the alternate
/// component prefix
#[instrument(skip(client))]
pub async fn delete_prefixed_cluster_rbac(
    client: &Client,
    namespace: &str,
) -> Result<ClusterRbacDeletion> {
    let roles: Api<ClusterRole> = Api::all(client.clone());
    let bindings: Api<ClusterRoleBinding> = Api::all(client.clone());

    let mut deleted = delete_listed(&roles, "ClusterRole", |r| {
        owned_by_installation(namespace, &r.name_any())
    })
    .await?;
    let deleted_bindings = delete_listed(&bindings, "ClusterRoleBinding", |b| {
        owned_by_installation(namespace, &b.name_any())
    })
    .await?;

    let bindings_deleted = deleted_bindings.len();
    deleted.extend(deleted_bindings);
    Ok(ClusterRbacDeletion {
        deleted,
        bindings_deleted,
    })
}

/// Delete the unprefixed cluster role and binding of installations that
/// predate namespace prefixing
#[instrument(skip(client))]
pub async fn delete_legacy_cluster_rbac(client: &Client) -> Result<Vec<ObjectRef>> {
    let mut deleted = Vec::new();

    let binding = ObjectRef::cluster("ClusterRoleBinding", names::LEGACY_CLUSTER_ROLE_BINDING);
    let bindings: Api<ClusterRoleBinding> = Api::all(client.clone());
    if delete_if_present(&bindings, &binding).await? {
        deleted.push(binding);
    }

    let role = ObjectRef::cluster("ClusterRole", names::LEGACY_CLUSTER_ROLE);
    let roles: Api<ClusterRole> = Api::all(client.clone());
    if delete_if_present(&roles, &role).await? {
        deleted.push(role);
    }

    Ok(deleted)
}

/// Delete the operator deployment, its service account and the database volume claim
#[instrument(skip(client))]
pub async fn delete_operator_resources(client: &Client, namespace: &str) -> Result<Vec<ObjectRef>> {
    let mut deleted = Vec::new();

    let deployment = ObjectRef::namespaced("Deployment", names::OPERATOR, namespace);
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    if delete_if_present(&deployments, &deployment).await? {
        deleted.push(deployment);
    }

    let account = ObjectRef::namespaced("ServiceAccount", names::SERVICE_ACCOUNT, namespace);
    let accounts: Api<ServiceAccount> = Api::namespaced(client.clone(), namespace);
    if delete_if_present(&accounts, &account).await? {
        deleted.push(account);
    }

    let claim = ObjectRef::namespaced("PersistentVolumeClaim", names::POSTGRES_PVC, namespace);
    let claims: Api<PersistentVolumeClaim> = Api::namespaced(client.clone(), namespace);
    if delete_if_present(&claims, &claim).await? {
        deleted.push(claim);
    }

    Ok(deleted)
}
