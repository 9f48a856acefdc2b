// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Blocks updates that would flip the workspace engine on as a side effect

use crate::error::{InstallerError, Result};
use crate::types::CheCluster;
use serde_json::Value;
use tracing::debug;

const WORKSPACE_ENGINE_POINTER: &str = "/spec/devWorkspace/enable";

/// Workspace engine state requested by a custom resource patch, if any
pub fn requested_workspace_engine(patch: &Value) -> Option<bool> {
    patch.pointer(WORKSPACE_ENGINE_POINTER).and_then(Value::as_bool)
}

/// Refuse an update that would enable the workspace engine on a custom
/// resource that was deployed with it disabled.
pub fn check_update_compatibility(existing: Option<&CheCluster>, patch: &Value) -> Result<()> {
    let Some(existing) = existing else {
        debug!("No deployed custom resource, nothing to compare");
        return Ok(());
    };

    if existing.workspace_engine_enabled() {
        return Ok(());
    }

    if requested_workspace_engine(patch) == Some(true) {
        return Err(InstallerError::Incompatible(format!(
            "the workspace engine is disabled on the deployed custom resource '{}' and cannot be enabled by an update; \
             reinstall with the workspace engine enabled instead",
            kube::ResourceExt::name_any(existing)
        )));
    }

    Ok(())
}
