// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent create/replace/skip and probe-then-delete for single objects

use crate::error::{InstallerError, ObjectRef, Result};
use kube::{
    api::{DeleteParams, PostParams},
    Api, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::{self, Debug};
use tracing::{debug, info, instrument};

/// What to do when the object already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Leave existing objects untouched
    CreateOnly,
    /// Overwrite existing objects with the manifest
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Replaced,
    AlreadyExists,
}

/// One object handled by the applier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub object: ObjectRef,
    pub outcome: ApplyOutcome,
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.outcome {
            ApplyOutcome::Created => "created",
            ApplyOutcome::Replaced => "replaced",
            ApplyOutcome::AlreadyExists => "already exists",
        };
        write!(f, "{} {}", self.object, verb)
    }
}

/// Describe `obj` for messages, using its own namespace when it has one
pub fn object_ref<K: Resource>(kind: &str, obj: &K) -> ObjectRef {
    ObjectRef {
        kind: kind.to_string(),
        name: obj.name_any(),
        namespace: obj.namespace(),
    }
}

/// Create `obj` if absent; replace or skip it if present depending on `mode`.
///
/// Replace overwrites the whole object, matched by name, carrying over the
/// existing resourceVersion so the API server accepts the update.
#[instrument(skip(api, obj), fields(object = %object))]
pub async fn apply_object<K>(
    api: &Api<K>,
    object: ObjectRef,
    mut obj: K,
    mode: ApplyMode,
) -> Result<Applied>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug,
{
    let existing = api
        .get_opt(&object.name)
        .await
        .map_err(|e| InstallerError::api(object.clone(), e))?;

    let outcome = match (existing, mode) {
        (None, _) => {
            api.create(&PostParams::default(), &obj)
                .await
                .map_err(|e| InstallerError::api(object.clone(), e))?;
            info!("Created {}", object);
            ApplyOutcome::Created
        }
        (Some(current), ApplyMode::Replace) => {
            let Some(version) = current.resource_version() else {
                return Err(InstallerError::MissingResourceVersion { object });
            };
            obj.meta_mut().resource_version = Some(version);
            api.replace(&object.name, &PostParams::default(), &obj)
                .await
                .map_err(|e| InstallerError::api(object.clone(), e))?;
            info!("Replaced {}", object);
            ApplyOutcome::Replaced
        }
        (Some(_), ApplyMode::CreateOnly) => {
            debug!("{} already exists", object);
            ApplyOutcome::AlreadyExists
        }
    };

    Ok(Applied { object, outcome })
}

/// Delete the named object if the existence probe finds it.
///
/// Only the probe tolerates absence: an object that vanishes between the
/// probe and the delete call surfaces as an error.
#[instrument(skip(api), fields(object = %object))]
pub async fn delete_if_present<K>(api: &Api<K>, object: &ObjectRef) -> Result<bool>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let existing = api
        .get_opt(&object.name)
        .await
        .map_err(|e| InstallerError::api(object.clone(), e))?;

    if existing.is_none() {
        debug!("{} not found, nothing to delete", object);
        return Ok(false);
    }

    api.delete(&object.name, &DeleteParams::default())
        .await
        .map_err(|e| InstallerError::api(object.clone(), e))?;
    info!("Deleted {}", object);
    Ok(true)
}
