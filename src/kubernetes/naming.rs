// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-scoped object naming. Cluster roles and bindings are prefixed with
//! the target namespace so several installations can share one cluster.

use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};

/// On-cluster name of a cluster-scoped object from its manifest name
pub fn cluster_scoped_name(namespace: &str, manifest_name: &str) -> String {
    format!("{}-{}", namespace, manifest_name)
}

/// Whether a cluster-scoped object name belongs to the installation in `namespace`.
///
/// Only the name is checked. Objects of an installation in a namespace that
/// itself starts with `namespace-` (`che-dev` for `che`) match as well.
pub fn has_namespace_prefix(namespace: &str, name: &str) -> bool {
    name.strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|rest| !rest.is_empty())
}

pub fn prefix_cluster_role(mut role: ClusterRole, namespace: &str) -> ClusterRole {
    let name = role.metadata.name.take().unwrap_or_default();
    role.metadata.name = Some(cluster_scoped_name(namespace, &name));
    role
}

/// Prefix the binding, the role it references, and point every subject at `namespace`
pub fn prefix_cluster_role_binding(
    mut binding: ClusterRoleBinding,
    namespace: &str,
) -> ClusterRoleBinding {
    let name = binding.metadata.name.take().unwrap_or_default();
    binding.metadata.name = Some(cluster_scoped_name(namespace, &name));
    binding.role_ref.name = cluster_scoped_name(namespace, &binding.role_ref.name);
    for subject in binding.subjects.iter_mut().flatten() {
        subject.namespace = Some(namespace.to_string());
    }
    binding
}
