// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CheCluster custom resource staging, creation, patching and deletion

use crate::config::{Toggle, WaitConfig};
use crate::constants::paths;
use crate::error::{InstallerError, ObjectRef, Result};
use crate::kubernetes::apply::{apply_object, object_ref, Applied, ApplyMode};
use crate::manifest::{load_yaml, merge_json};
use crate::types::CheCluster;
use crate::wait::{poll_until, PollPolicy};
use kube::{
    api::{DeleteParams, ListParams, Patch, PatchParams},
    Api, Client, ResourceExt,
};
use serde_json::{json, Value};
use std::path::Path;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const KIND: &str = "CheCluster";

/// Build the merge patch for the custom resource from an optional patch file
/// and the requested feature flags
pub fn build_cr_patch(patch_path: Option<&Path>, workspace_engine: Option<Toggle>) -> Result<Value> {
    let mut patch = match patch_path {
        Some(path) => load_yaml::<Value>(path)?,
        None => Value::Null,
    };
    if patch.is_null() {
        patch = json!({});
    }
    if !patch.is_object() {
        return Err(InstallerError::Manifest {
            path: patch_path.map(Path::to_path_buf).unwrap_or_default(),
            message: "custom resource patch must be a mapping".to_string(),
        });
    }

    if let Some(toggle) = workspace_engine {
        merge_json(
            &mut patch,
            &json!({"spec": {"devWorkspace": {"enable": toggle.is_enabled()}}}),
        );
    }
    Ok(patch)
}

/// Load the custom resource to deploy: the custom file when given, the
/// default one otherwise, with `patch` merged in
pub fn stage_custom_resource(
    resources_dir: &Path,
    custom_path: Option<&Path>,
    patch: &Value,
    namespace: &str,
) -> Result<CheCluster> {
    let path = custom_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| resources_dir.join(paths::DEFAULT_CR));

    let mut value: Value = load_yaml(&path)?;
    merge_json(&mut value, patch);

    let mut resource: CheCluster =
        serde_json::from_value(value).map_err(|e| InstallerError::Manifest {
            path: path.clone(),
            message: e.to_string(),
        })?;
    resource.metadata.namespace = Some(namespace.to_string());
    resource.metadata.resource_version = None;
    Ok(resource)
}

/// Create the custom resource unless one with the same name exists
#[instrument(skip(client, resource), fields(name = %resource.name_any()))]
pub async fn apply_custom_resource(
    client: &Client,
    namespace: &str,
    resource: CheCluster,
) -> Result<Applied> {
    let api: Api<CheCluster> = Api::namespaced(client.clone(), namespace);
    let object = object_ref(KIND, &resource);
    apply_object(&api, object, resource, ApplyMode::CreateOnly).await
}

/// The custom resource deployed in `namespace`, if any.
/// A missing definition counts as no resource.
#[instrument(skip(client))]
pub async fn find_custom_resource(client: &Client, namespace: &str) -> Result<Option<CheCluster>> {
    let api: Api<CheCluster> = Api::namespaced(client.clone(), namespace);
    match api.list(&ListParams::default()).await.map_err(InstallerError::from) {
        Ok(list) => Ok(list.items.into_iter().next()),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Every custom resource in the cluster, across namespaces
#[instrument(skip(client))]
pub async fn list_all_custom_resources(client: &Client) -> Result<Vec<CheCluster>> {
    let api: Api<CheCluster> = Api::all(client.clone());
    match api.list(&ListParams::default()).await.map_err(InstallerError::from) {
        Ok(list) => Ok(list.items),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Merge-patch the deployed custom resource in place
#[instrument(skip(client, existing, patch), fields(name = %existing.name_any()))]
pub async fn patch_custom_resource(
    client: &Client,
    namespace: &str,
    existing: &CheCluster,
    patch: &Value,
) -> Result<CheCluster> {
    let api: Api<CheCluster> = Api::namespaced(client.clone(), namespace);
    let name = existing.name_any();
    let patched = api
        .patch(&name, &PatchParams::default(), &Patch::Merge(patch))
        .await
        .map_err(|e| InstallerError::api(ObjectRef::namespaced(KIND, &name, namespace), e))?;
    info!("Patched {} '{}' in namespace '{}'", KIND, name, namespace);
    Ok(patched)
}

/// Delete the custom resource and wait for it to disappear.
///
/// When it outlives the bounded wait its finalizers are cleared. A resource
/// that vanishes before that patch lands counts as deleted.
#[instrument(skip(client, waits))]
pub async fn delete_custom_resource(
    client: &Client,
    namespace: &str,
    name: &str,
    waits: &WaitConfig,
) -> Result<()> {
    let api: Api<CheCluster> = Api::namespaced(client.clone(), namespace);
    let object = ObjectRef::namespaced(KIND, name, namespace);

    api.delete(name, &DeleteParams::default())
        .await
        .map_err(|e| InstallerError::api(object.clone(), e))?;
    info!("Deleting {}", object);

    let api_ref = &api;
    let gone = poll_until(
        &format!("deletion of {}", object),
        PollPolicy::attempts(waits.poll_interval, waits.cr_deletion_attempts),
        move || async move {
            match api_ref.get_opt(name).await? {
                None => Ok(Some(())),
                Some(resource) => {
                    if resource.has_finalizers() {
                        debug!("{} is held by finalizers", name);
                    }
                    Ok(None)
                }
            }
        },
    )
    .await;

    match gone {
        Ok(()) => return Ok(()),
        Err(e) if e.is_timeout() => warn!("{} is still present, clearing its finalizers", object),
        Err(e) => return Err(e),
    }

    let clear = json!({"metadata": {"finalizers": null}});
    match api
        .patch(name, &PatchParams::default(), &Patch::Merge(&clear))
        .await
    {
        Ok(_) => {}
        // deleted concurrently between the wait and the patch
        Err(kube::Error::Api(err)) if err.code == 404 => {
            debug!("{} disappeared before its finalizers were cleared", object);
            return Ok(());
        }
        Err(e) => return Err(InstallerError::api(object, e)),
    }

    sleep(waits.finalizer_grace).await;

    let still_present = api
        .get_opt(name)
        .await
        .map_err(|e| InstallerError::api(object.clone(), e))?;
    match still_present {
        None => {
            info!("{} deleted", object);
            Ok(())
        }
        Some(_) => Err(InstallerError::Timeout {
            what: format!("deletion of {}", object),
            waited: waits.poll_interval * waits.cr_deletion_attempts + waits.finalizer_grace,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{deleted_json, fast_waits, status_json, MockService};
    use std::fs;
    use tempfile::TempDir;

    const CR_PATH: &str = "/apis/org.eclipse.che/v1/namespaces/che/checlusters/eclipse-che";

    const DEFAULT_CR: &str = r#"
apiVersion: org.eclipse.che/v1
kind: CheCluster
metadata:
  name: eclipse-che
spec:
  server:
    cheImageTag: ""
  auth:
    oAuthClientName: ""
  devWorkspace:
    enable: false
"#;

    fn cr_json(finalizers: &[&str]) -> String {
        json!({
            "apiVersion": "org.eclipse.che/v1",
            "kind": "CheCluster",
            "metadata": {
                "name": "eclipse-che",
                "namespace": "che",
                "resourceVersion": "3",
                "finalizers": finalizers
            },
            "spec": {}
        })
        .to_string()
    }

    #[test]
    fn test_build_patch_from_flags() {
        let patch = build_cr_patch(None, Some(Toggle::Enabled)).unwrap();
        assert_eq!(patch, json!({"spec": {"devWorkspace": {"enable": true}}}));
        assert_eq!(build_cr_patch(None, None).unwrap(), json!({}));
    }

    #[test]
    fn test_flags_override_patch_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patch.yaml");
        fs::write(
            &path,
            "spec:\n  server:\n    cheImageTag: '7.21'\n  devWorkspace:\n    enable: true\n",
        )
        .unwrap();

        let patch = build_cr_patch(Some(&path), Some(Toggle::Disabled)).unwrap();
        assert_eq!(patch["spec"]["server"]["cheImageTag"], "7.21");
        assert_eq!(patch["spec"]["devWorkspace"]["enable"], false);
    }

    #[test]
    fn test_stage_default_resource_with_patch() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("crds")).unwrap();
        fs::write(dir.path().join(paths::DEFAULT_CR), DEFAULT_CR).unwrap();

        let patch = json!({"spec": {"devWorkspace": {"enable": true}}});
        let resource = stage_custom_resource(dir.path(), None, &patch, "che").unwrap();

        assert_eq!(resource.name_any(), "eclipse-che");
        assert_eq!(resource.namespace().as_deref(), Some("che"));
        assert!(resource.workspace_engine_enabled());
    }

    #[test]
    fn test_stage_keeps_unmodelled_workspace_settings() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("crds")).unwrap();
        fs::write(
            dir.path().join(paths::DEFAULT_CR),
            format!(
                "{}    controllerImage: quay.io/devfile/devworkspace-controller:next\n",
                DEFAULT_CR.trim_start()
            ),
        )
        .unwrap();

        let patch = json!({"spec": {"devWorkspace": {"enable": true}}});
        let resource = stage_custom_resource(dir.path(), None, &patch, "che").unwrap();

        let body = serde_json::to_value(&resource).unwrap();
        assert_eq!(body["spec"]["devWorkspace"]["enable"], true);
        assert_eq!(
            body["spec"]["devWorkspace"]["controllerImage"],
            "quay.io/devfile/devworkspace-controller:next"
        );
    }

    #[test]
    fn test_stage_custom_resource_file() {
        let dir = TempDir::new().unwrap();
        let custom = dir.path().join("my-cr.yaml");
        fs::write(
            &custom,
            "apiVersion: org.eclipse.che/v1\nkind: CheCluster\nmetadata:\n  name: custom\nspec: {}\n",
        )
        .unwrap();

        let resource = stage_custom_resource(dir.path(), Some(&custom), &json!({}), "che").unwrap();
        assert_eq!(resource.name_any(), "custom");
    }

    #[tokio::test]
    async fn test_delete_waits_for_disappearance() {
        let mock = MockService::new()
            .on_delete(CR_PATH, 200, &cr_json(&[]))
            .on_get(CR_PATH, 200, &cr_json(&["cluster-resources.finalizers.che.eclipse.org"]))
            .on_get(CR_PATH, 404, &status_json(404, "NotFound", "gone"));

        delete_custom_resource(&mock.clone().into_client(), "che", "eclipse-che", &fast_waits())
            .await
            .unwrap();

        assert_eq!(mock.count("PATCH", CR_PATH), 0);
        assert_eq!(mock.count("GET", CR_PATH), 2);
    }

    #[tokio::test]
    async fn test_stuck_resource_gets_finalizers_cleared() {
        let mock = MockService::new()
            .on_delete(CR_PATH, 200, &deleted_json())
            .on_get(CR_PATH, 200, &cr_json(&["f"]))
            .on_get(CR_PATH, 200, &cr_json(&["f"]))
            .on_get(CR_PATH, 200, &cr_json(&["f"]))
            .on_get(CR_PATH, 404, &status_json(404, "NotFound", "gone"))
            .on_patch(CR_PATH, 200, &cr_json(&[]));

        delete_custom_resource(&mock.clone().into_client(), "che", "eclipse-che", &fast_waits())
            .await
            .unwrap();

        assert_eq!(mock.count("PATCH", CR_PATH), 1);
        let body = mock.last_body("PATCH", CR_PATH).unwrap();
        assert_eq!(body, json!({"metadata": {"finalizers": null}}));
    }

    #[tokio::test]
    async fn test_delete_of_vanished_resource_propagates() {
        let mock = MockService::new().on_delete(CR_PATH, 404, &status_json(404, "NotFound", "gone"));

        let err =
            delete_custom_resource(&mock.clone().into_client(), "che", "eclipse-che", &fast_waits())
                .await
                .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(mock.count("GET", CR_PATH), 0);
    }

    #[tokio::test]
    async fn test_finalizer_patch_race_counts_as_deleted() {
        let mock = MockService::new()
            .on_delete(CR_PATH, 200, &deleted_json())
            .on_get(CR_PATH, 200, &cr_json(&["f"]))
            .on_patch(CR_PATH, 404, &status_json(404, "NotFound", "gone"));

        delete_custom_resource(&mock.clone().into_client(), "che", "eclipse-che", &fast_waits())
            .await
            .unwrap();

        assert_eq!(mock.count("PATCH", CR_PATH), 1);
    }

    #[tokio::test]
    async fn test_finalizer_patch_failure_propagates() {
        let mock = MockService::new()
            .on_delete(CR_PATH, 200, &deleted_json())
            .on_get(CR_PATH, 200, &cr_json(&["f"]))
            .on_patch(CR_PATH, 403, &status_json(403, "Forbidden", "no"));

        let err =
            delete_custom_resource(&mock.into_client(), "che", "eclipse-che", &fast_waits())
                .await
                .unwrap_err();

        assert!(err.to_string().contains("CheCluster 'eclipse-che'"));
    }

    #[tokio::test]
    async fn test_resource_surviving_finalizer_clear_is_a_timeout() {
        let mock = MockService::new()
            .on_delete(CR_PATH, 200, &deleted_json())
            .on_get(CR_PATH, 200, &cr_json(&["f"]))
            .on_patch(CR_PATH, 200, &cr_json(&[]));

        let err =
            delete_custom_resource(&mock.into_client(), "che", "eclipse-che", &fast_waits())
                .await
                .unwrap_err();

        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_list_all_without_definition_is_empty() {
        let resources = list_all_custom_resources(&MockService::new().into_client())
            .await
            .unwrap();
        assert!(resources.is_empty());
    }
}
