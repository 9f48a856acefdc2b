// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Target namespace bootstrap

use crate::error::{InstallerError, ObjectRef, Result};
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client,
};
use tracing::{debug, info, instrument};

/// Ensure the installation namespace exists, creating it if it doesn't.
/// Returns whether it was created.
#[instrument(skip(client))]
pub async fn ensure_namespace_exists(client: &Client, namespace: &str) -> Result<bool> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let object = ObjectRef::cluster("Namespace", namespace);

    match namespaces.get(namespace).await {
        Ok(_) => {
            debug!("Namespace {} already exists", namespace);
            Ok(false)
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            info!("Creating namespace {}", namespace);
            let ns = Namespace {
                metadata: ObjectMeta {
                    name: Some(namespace.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            };
            namespaces
                .create(&PostParams::default(), &ns)
                .await
                .map_err(|e| InstallerError::api(object, e))?;
            info!("Namespace {} created successfully", namespace);
            Ok(true)
        }
        Err(e) => Err(InstallerError::api(object, e)),
    }
}
