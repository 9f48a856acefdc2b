// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! State shared by the steps of one pipeline run

use crate::error::{InstallerError, Result};
use crate::kubernetes::deployment::ImageRef;
use crate::kubernetes::ClusterCapabilities;
use crate::manifest::ResourceBuckets;
use crate::types::CheCluster;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// A run context field that steps declare they read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Capabilities,
    Buckets,
    CrdPath,
    PreviousImage,
    TargetImage,
    CrPatch,
    StagedResource,
    DeployedResource,
    BindingDeletions,
}

impl Slot {
    pub fn describe(self) -> &'static str {
        match self {
            Slot::Capabilities => "cluster capabilities",
            Slot::Buckets => "resource buckets",
            Slot::CrdPath => "custom resource definition path",
            Slot::PreviousImage => "previous operator image",
            Slot::TargetImage => "target operator image",
            Slot::CrPatch => "custom resource patch",
            Slot::StagedResource => "staged custom resource",
            Slot::DeployedResource => "deployed custom resource",
            Slot::BindingDeletions => "prefixed binding deletion count",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

fn read<T>(value: &Option<T>, slot: Slot) -> Result<&T> {
    value.as_ref().ok_or(InstallerError::NotInitialized(slot.describe()))
}

/// Written field by field as the pipeline advances. Reading a field before
/// the step that writes it has run is a [`InstallerError::NotInitialized`].
#[derive(Debug, Default)]
pub struct RunContext {
    resources_dir: PathBuf,
    capabilities: Option<ClusterCapabilities>,
    buckets: Option<ResourceBuckets>,
    crd_path: Option<PathBuf>,
    previous_image: Option<Option<ImageRef>>,
    target_image: Option<Option<ImageRef>>,
    cr_patch: Option<Value>,
    staged_resource: Option<CheCluster>,
    deployed_resource: Option<Option<CheCluster>>,
    binding_deletions: Option<usize>,
}

impl RunContext {
    pub fn new(resources_dir: impl Into<PathBuf>) -> Self {
        Self {
            resources_dir: resources_dir.into(),
            ..Default::default()
        }
    }

    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    pub fn capabilities(&self) -> Result<ClusterCapabilities> {
        read(&self.capabilities, Slot::Capabilities).copied()
    }

    pub fn set_capabilities(&mut self, capabilities: ClusterCapabilities) {
        self.capabilities = Some(capabilities);
    }

    pub fn buckets(&self) -> Result<&ResourceBuckets> {
        read(&self.buckets, Slot::Buckets)
    }

    pub fn set_buckets(&mut self, buckets: ResourceBuckets) {
        self.buckets = Some(buckets);
    }

    pub fn crd_path(&self) -> Result<&Path> {
        read(&self.crd_path, Slot::CrdPath).map(PathBuf::as_path)
    }

    pub fn set_crd_path(&mut self, path: PathBuf) {
        self.crd_path = Some(path);
    }

    pub fn previous_image(&self) -> Result<Option<&ImageRef>> {
        read(&self.previous_image, Slot::PreviousImage).map(Option::as_ref)
    }

    pub fn set_previous_image(&mut self, image: Option<ImageRef>) {
        self.previous_image = Some(image);
    }

    pub fn target_image(&self) -> Result<Option<&ImageRef>> {
        read(&self.target_image, Slot::TargetImage).map(Option::as_ref)
    }

    pub fn set_target_image(&mut self, image: Option<ImageRef>) {
        self.target_image = Some(image);
    }

    pub fn cr_patch(&self) -> Result<&Value> {
        read(&self.cr_patch, Slot::CrPatch)
    }

    pub fn set_cr_patch(&mut self, patch: Value) {
        self.cr_patch = Some(patch);
    }

    /// Hands the staged resource over to the step that creates it
    pub fn take_staged_resource(&mut self) -> Result<CheCluster> {
        self.staged_resource
            .take()
            .ok_or(InstallerError::NotInitialized(Slot::StagedResource.describe()))
    }

    pub fn set_staged_resource(&mut self, resource: CheCluster) {
        self.staged_resource = Some(resource);
    }

    pub fn deployed_resource(&self) -> Result<Option<&CheCluster>> {
        read(&self.deployed_resource, Slot::DeployedResource).map(Option::as_ref)
    }

    pub fn set_deployed_resource(&mut self, resource: Option<CheCluster>) {
        self.deployed_resource = Some(resource);
    }

    pub fn binding_deletions(&self) -> Result<usize> {
        read(&self.binding_deletions, Slot::BindingDeletions).copied()
    }

    pub fn set_binding_deletions(&mut self, count: usize) {
        self.binding_deletions = Some(count);
    }
}
