// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster capability probes based on API group discovery

use crate::error::Result;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIGroupList;
use kube::Client;
use tracing::{debug, instrument};

const API_EXTENSIONS_GROUP: &str = "apiextensions.k8s.io";
const OPENSHIFT_PROJECT_GROUP: &str = "project.openshift.io";
const OPENSHIFT_CONFIG_GROUP: &str = "config.openshift.io";
const OPENSHIFT_OAUTH_GROUP: &str = "oauth.openshift.io";

/// What the target cluster can do, probed once per run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterCapabilities {
    /// `apiextensions.k8s.io/v1` is served
    pub api_extensions_v1: bool,
    /// Old OpenShift 3 platform that needs the operator container list trimmed
    pub legacy_platform: bool,
    /// Auth-client authorizations can be listed
    pub oauth_authorizations: bool,
}

impl ClusterCapabilities {
    pub fn from_groups(groups: &APIGroupList) -> Self {
        let has_group = |name: &str| groups.groups.iter().any(|g| g.name == name);

        let api_extensions_v1 = groups
            .groups
            .iter()
            .filter(|g| g.name == API_EXTENSIONS_GROUP)
            .flat_map(|g| g.versions.iter())
            .any(|v| v.version == "v1");

        Self {
            api_extensions_v1,
            legacy_platform: has_group(OPENSHIFT_PROJECT_GROUP)
                && !has_group(OPENSHIFT_CONFIG_GROUP),
            oauth_authorizations: has_group(OPENSHIFT_OAUTH_GROUP),
        }
    }
}

/// Probe the cluster's API groups
#[instrument(skip(client))]
pub async fn probe_capabilities(client: &Client) -> Result<ClusterCapabilities> {
    let groups = client.list_api_groups().await?;
    let capabilities = ClusterCapabilities::from_groups(&groups);
    debug!("Cluster capabilities: {:?}", capabilities);
    Ok(capabilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIGroup, GroupVersionForDiscovery};

    fn group(name: &str, versions: &[&str]) -> APIGroup {
        APIGroup {
            name: name.to_string(),
            versions: versions
                .iter()
                .map(|v| GroupVersionForDiscovery {
                    group_version: format!("{}/{}", name, v),
                    version: v.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn groups(list: Vec<APIGroup>) -> APIGroupList {
        APIGroupList { groups: list }
    }

    #[test]
    fn test_modern_kubernetes() {
        let caps = ClusterCapabilities::from_groups(&groups(vec![
            group("apps", &["v1"]),
            group("apiextensions.k8s.io", &["v1", "v1beta1"]),
        ]));
        assert!(caps.api_extensions_v1);
        assert!(!caps.legacy_platform);
        assert!(!caps.oauth_authorizations);
    }

    #[test]
    fn test_old_cluster_without_v1_extensions() {
        let caps = ClusterCapabilities::from_groups(&groups(vec![group(
            "apiextensions.k8s.io",
            &["v1beta1"],
        )]));
        assert!(!caps.api_extensions_v1);
    }

    #[test]
    fn test_openshift_3_is_legacy() {
        let caps = ClusterCapabilities::from_groups(&groups(vec![
            group("project.openshift.io", &["v1"]),
            group("oauth.openshift.io", &["v1"]),
        ]));
        assert!(caps.legacy_platform);
        assert!(caps.oauth_authorizations);
    }

    #[test]
    fn test_openshift_4_is_not_legacy() {
        let caps = ClusterCapabilities::from_groups(&groups(vec![
            group("project.openshift.io", &["v1"]),
            group("config.openshift.io", &["v1"]),
            group("apiextensions.k8s.io", &["v1"]),
        ]));
        assert!(!caps.legacy_platform);
        assert!(caps.api_extensions_v1);
    }
}
