// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource definition version selection and application

use crate::constants::{names, paths};
use crate::error::{InstallerError, ObjectRef, Result};
use crate::kubernetes::apply::{apply_object, delete_if_present, Applied, ApplyMode};
use crate::manifest::load_yaml;
use kube::{
    api::{ApiResource, DynamicObject},
    core::GroupVersionKind,
    Api, Client, ResourceExt,
};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const GROUP: &str = "apiextensions.k8s.io";
const KIND: &str = "CustomResourceDefinition";
const PLURAL: &str = "customresourcedefinitions";

/// Pick the definition file for the cluster.
///
/// Clusters without `apiextensions.k8s.io/v1` get the v1beta1 file when it is
/// present on disk; every other case uses the v1 file.
pub fn select_crd_path(resources_dir: &Path, api_extensions_v1: bool) -> PathBuf {
    if !api_extensions_v1 {
        let legacy = resources_dir.join(paths::CRD_V1BETA1);
        if legacy.exists() {
            debug!("Using v1beta1 CRD at {}", legacy.display());
            return legacy;
        }
    }
    resources_dir.join(paths::CRD_V1)
}

fn crd_api_resource(version: &str) -> ApiResource {
    ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(GROUP, version, KIND), PLURAL)
}

/// API version to talk to for definitions on this cluster
pub fn crd_version(api_extensions_v1: bool) -> &'static str {
    if api_extensions_v1 {
        "v1"
    } else {
        "v1beta1"
    }
}

/// Apply the definition file at `path`, using the API version it declares
#[instrument(skip(client))]
pub async fn apply_crd(client: &Client, path: &Path, mode: ApplyMode) -> Result<Applied> {
    let crd: DynamicObject = load_yaml(path)?;

    let version = crd
        .types
        .as_ref()
        .and_then(|t| t.api_version.strip_prefix(&format!("{}/", GROUP)))
        .map(str::to_string)
        .ok_or_else(|| InstallerError::Manifest {
            path: path.to_path_buf(),
            message: format!("apiVersion is not {}/*", GROUP),
        })?;

    let api: Api<DynamicObject> = Api::all_with(client.clone(), &crd_api_resource(&version));
    let object = ObjectRef::cluster(KIND, crd.name_any());
    apply_object(&api, object, crd, mode).await
}

/// Delete the managed custom resource definition if it exists
#[instrument(skip(client))]
pub async fn delete_crd(client: &Client, api_extensions_v1: bool) -> Result<bool> {
    let api: Api<DynamicObject> =
        Api::all_with(client.clone(), &crd_api_resource(crd_version(api_extensions_v1)));
    delete_if_present(&api, &ObjectRef::cluster(KIND, names::CRD)).await
}
