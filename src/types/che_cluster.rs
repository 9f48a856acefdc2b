// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "org.eclipse.che", version = "v1", kind = "CheCluster")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct CheClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_workspace: Option<DevWorkspaceSpec>,
    /// Sections the installer does not interpret, kept verbatim
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub che_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub che_image_tag: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthSpec {
    #[serde(
        default,
        rename = "oAuthClientName",
        skip_serializing_if = "Option::is_none"
    )]
    pub oauth_client_name: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevWorkspaceSpec {
    #[serde(default)]
    pub enable: bool,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl CheCluster {
    /// Whether the workspace engine toggle is switched on
    pub fn workspace_engine_enabled(&self) -> bool {
        self.spec
            .dev_workspace
            .as_ref()
            .is_some_and(|d| d.enable)
    }

    /// Name of the auth client whose authorizations must go before the resource
    pub fn oauth_client_name(&self) -> Option<&str> {
        self.spec
            .auth
            .as_ref()
            .and_then(|a| a.oauth_client_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    pub fn has_finalizers(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| !f.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> CheCluster {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_workspace_engine_enabled() {
        let cr = parse(
            r#"
apiVersion: org.eclipse.che/v1
kind: CheCluster
metadata:
  name: eclipse-che
spec:
  devWorkspace:
    enable: true
"#,
        );
        assert!(cr.workspace_engine_enabled());
    }

    #[test]
    fn test_workspace_engine_missing_section_is_disabled() {
        let cr = parse(
            r#"
apiVersion: org.eclipse.che/v1
kind: CheCluster
metadata:
  name: eclipse-che
spec:
  server: {}
"#,
        );
        assert!(!cr.workspace_engine_enabled());
    }

    #[test]
    fn test_oauth_client_name() {
        let cr = parse(
            r#"
apiVersion: org.eclipse.che/v1
kind: CheCluster
metadata:
  name: eclipse-che
spec:
  auth:
    oAuthClientName: eclipse-che-client
    identityProviderURL: https://keycloak
"#,
        );
        assert_eq!(cr.oauth_client_name(), Some("eclipse-che-client"));
        let auth = cr.spec.auth.unwrap();
        assert!(auth.other.contains_key("identityProviderURL"));
    }

    #[test]
    fn test_empty_oauth_client_name_is_ignored() {
        let cr = parse(
            r#"
apiVersion: org.eclipse.che/v1
kind: CheCluster
metadata:
  name: eclipse-che
spec:
  auth:
    oAuthClientName: ""
"#,
        );
        assert_eq!(cr.oauth_client_name(), None);
    }

    #[test]
    fn test_unknown_sections_are_preserved() {
        let cr = parse(
            r#"
apiVersion: org.eclipse.che/v1
kind: CheCluster
metadata:
  name: eclipse-che
spec:
  storage:
    pvcStrategy: common
"#,
        );
        let value = serde_json::to_value(&cr).unwrap();
        assert_eq!(value["spec"]["storage"]["pvcStrategy"], "common");
    }

    #[test]
    fn test_dev_workspace_settings_are_preserved() {
        let cr = parse(
            r#"
apiVersion: org.eclipse.che/v1
kind: CheCluster
metadata:
  name: eclipse-che
spec:
  devWorkspace:
    enable: true
    controllerImage: quay.io/devfile/devworkspace-controller:next
"#,
        );
        assert!(cr.workspace_engine_enabled());
        let value = serde_json::to_value(&cr).unwrap();
        assert_eq!(
            value["spec"]["devWorkspace"]["controllerImage"],
            "quay.io/devfile/devworkspace-controller:next"
        );
    }
}
