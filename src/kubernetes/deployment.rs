// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Operator deployment loading, patching and application

use crate::config::Channel;
use crate::constants::{names, paths, NIGHTLY_TAG};
use crate::error::{InstallerError, ObjectRef, Result};
use crate::kubernetes::apply::{apply_object, object_ref, Applied, ApplyMode};
use crate::manifest::load_yaml;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{Api, Client};
use std::fmt;
use std::path::Path;
use tracing::{info, instrument};

/// Container image split into repository and tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub tag: String,
}

impl ImageRef {
    /// Parse `registry:port/repo:tag`; a missing tag means `latest`.
    /// Digests are kept whole in the tag.
    pub fn parse(image: &str) -> Self {
        if let Some((name, digest)) = image.split_once('@') {
            return Self {
                name: name.to_string(),
                tag: digest.to_string(),
            };
        }
        let last_slash = image.rfind('/').map_or(0, |i| i + 1);
        match image[last_slash..].rfind(':') {
            Some(colon) => Self {
                name: image[..last_slash + colon].to_string(),
                tag: image[last_slash + colon + 1..].to_string(),
            },
            None => Self {
                name: image.to_string(),
                tag: "latest".to_string(),
            },
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag.contains(':') {
            write!(f, "{}@{}", self.name, self.tag)
        } else {
            write!(f, "{}:{}", self.name, self.tag)
        }
    }
}

/// Changes applied to the deployment manifest before it reaches the cluster
#[derive(Debug, Clone, Default)]
pub struct DeploymentOverrides {
    pub image: Option<String>,
    pub namespace: Option<String>,
    /// Keep only the operator container
    pub trim_containers: bool,
}

impl DeploymentOverrides {
    /// Resolve the image override from an explicit image or the release channel
    pub fn image_for_channel(
        explicit: Option<&str>,
        channel: Channel,
        manifest_image: Option<&str>,
    ) -> Option<String> {
        if let Some(image) = explicit {
            return Some(image.to_string());
        }
        match (channel, manifest_image) {
            (Channel::Nightly, Some(image)) => {
                let mut image = ImageRef::parse(image);
                image.tag = NIGHTLY_TAG.to_string();
                Some(image.to_string())
            }
            _ => None,
        }
    }
}

pub fn load_operator_deployment(resources_dir: &Path) -> Result<Deployment> {
    load_yaml(&resources_dir.join(paths::OPERATOR_DEPLOYMENT))
}

fn deployment_ref(deployment: &Deployment) -> ObjectRef {
    object_ref("Deployment", deployment)
}

/// Image of the operator container, if the deployment has one
pub fn operator_image(deployment: &Deployment) -> Option<&str> {
    deployment
        .spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .containers
        .iter()
        .find(|c| c.name == names::OPERATOR_CONTAINER)?
        .image
        .as_deref()
}

/// Apply image, namespace and container-list overrides to the manifest
pub fn patch_deployment(
    mut deployment: Deployment,
    overrides: &DeploymentOverrides,
) -> Result<Deployment> {
    if let Some(namespace) = &overrides.namespace {
        deployment.metadata.namespace = Some(namespace.clone());
    }

    let object = deployment_ref(&deployment);
    let missing_container = || InstallerError::MissingContainer {
        container: names::OPERATOR_CONTAINER.to_string(),
        object: object.clone(),
    };

    if let Some(image) = &overrides.image {
        let container = deployment
            .spec
            .as_mut()
            .and_then(|s| s.template.spec.as_mut())
            .and_then(|s| {
                s.containers
                    .iter_mut()
                    .find(|c| c.name == names::OPERATOR_CONTAINER)
            })
            .ok_or_else(missing_container)?;
        container.image = Some(image.clone());
    }

    if overrides.trim_containers {
        if let Some(pod) = deployment.spec.as_mut().and_then(|s| s.template.spec.as_mut()) {
            pod.containers.retain(|c| c.name == names::OPERATOR_CONTAINER);
        }
    }

    Ok(deployment)
}

/// Create the operator deployment; an existing one is left as is
#[instrument(skip(client, deployment))]
pub async fn create_operator_deployment(
    client: &Client,
    namespace: &str,
    deployment: Deployment,
) -> Result<Applied> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let object = deployment_ref(&deployment);
    apply_object(&api, object, deployment, ApplyMode::CreateOnly).await
}

/// Replace the operator deployment unconditionally
#[instrument(skip(client, deployment))]
pub async fn replace_operator_deployment(
    client: &Client,
    namespace: &str,
    deployment: Deployment,
) -> Result<Applied> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let object = deployment_ref(&deployment);
    apply_object(&api, object, deployment, ApplyMode::Replace).await
}

/// Fetch the deployed operator, failing when it is not there
#[instrument(skip(client))]
pub async fn get_operator_deployment(client: &Client, namespace: &str) -> Result<Deployment> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let object = ObjectRef::namespaced("Deployment", names::OPERATOR, namespace);
    match api.get_opt(names::OPERATOR).await {
        Ok(Some(deployment)) => Ok(deployment),
        Ok(None) => Err(InstallerError::Precondition { object }),
        Err(e) => Err(InstallerError::api(object, e)),
    }
}

/// Log the image transition of an update
pub fn report_image_change(previous: Option<&ImageRef>, target: Option<&ImageRef>) {
    match (previous, target) {
        (Some(previous), Some(target)) if previous == target => {
            info!("Operator image unchanged: {}", target)
        }
        (Some(previous), Some(target)) => {
            info!("Updating operator image from {} to {}", previous, target)
        }
        (None, Some(target)) => info!("Operator image set to {}", target),
        _ => {}
    }
}
