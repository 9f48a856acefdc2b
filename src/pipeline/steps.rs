// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Steps shared by more than one pipeline

use super::{Installer, RunContext, Slot, Step, StepOutcome};
use crate::error::Result;
use crate::kubernetes::apply::ApplyMode;
use crate::kubernetes::deployment::{
    load_operator_deployment, operator_image, patch_deployment, DeploymentOverrides,
};
use crate::kubernetes::{crd, probe_capabilities, rbac};
use crate::manifest::scan_resources;
use crate::wait::flush_delay;
use futures::future::{BoxFuture, FutureExt};
use k8s_openapi::api::apps::v1::Deployment;

pub(super) fn capabilities() -> Step {
    Step {
        title: "Probe cluster capabilities",
        requires: &[],
        provides: &[Slot::Capabilities],
        run: run_capabilities,
    }
}

fn run_capabilities<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        ctx.set_capabilities(probe_capabilities(&installer.client).await?);
        Ok(StepOutcome::Done)
    }
    .boxed()
}

pub(super) fn scan() -> Step {
    Step {
        title: "Scan RBAC manifests",
        requires: &[],
        provides: &[Slot::Buckets],
        run: run_scan,
    }
}

fn run_scan<'a>(_: &'a Installer, ctx: &'a mut RunContext) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let report = scan_resources(ctx.resources_dir())?;
        ctx.set_buckets(report.buckets);
        if report.warnings.is_empty() {
            Ok(StepOutcome::Done)
        } else {
            Ok(StepOutcome::Warnings(report.warnings))
        }
    }
    .boxed()
}

async fn apply_access(
    installer: &Installer,
    ctx: &RunContext,
    mode: ApplyMode,
) -> Result<StepOutcome> {
    let buckets = ctx.buckets()?;
    let namespace = installer.namespace();

    let mut applied = vec![
        rbac::apply_service_account(&installer.client, namespace, ctx.resources_dir(), mode)
            .await?,
    ];
    applied.extend(rbac::apply_rbac(&installer.client, namespace, buckets, mode).await?);
    Ok(StepOutcome::Applied(applied))
}

pub(super) fn create_access() -> Step {
    Step {
        title: "Create service account and RBAC",
        requires: &[Slot::Buckets],
        provides: &[],
        run: |installer, ctx| apply_access(installer, ctx, ApplyMode::CreateOnly).boxed(),
    }
}

pub(super) fn replace_access() -> Step {
    Step {
        title: "Update service account and RBAC",
        requires: &[Slot::Buckets],
        provides: &[],
        run: |installer, ctx| apply_access(installer, ctx, ApplyMode::Replace).boxed(),
    }
}

pub(super) fn select_crd() -> Step {
    Step {
        title: "Select custom resource definition",
        requires: &[Slot::Capabilities],
        provides: &[Slot::CrdPath],
        run: run_select_crd,
    }
}

fn run_select_crd<'a>(
    _: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let capabilities = ctx.capabilities()?;
        let path = crd::select_crd_path(ctx.resources_dir(), capabilities.api_extensions_v1);
        ctx.set_crd_path(path);
        Ok(StepOutcome::Done)
    }
    .boxed()
}

async fn apply_crd(installer: &Installer, ctx: &RunContext, mode: ApplyMode) -> Result<StepOutcome> {
    let applied = crd::apply_crd(&installer.client, ctx.crd_path()?, mode).await?;
    Ok(StepOutcome::Applied(vec![applied]))
}

pub(super) fn create_crd() -> Step {
    Step {
        title: "Create custom resource definition",
        requires: &[Slot::CrdPath],
        provides: &[],
        run: |installer, ctx| apply_crd(installer, ctx, ApplyMode::CreateOnly).boxed(),
    }
}

pub(super) fn replace_crd() -> Step {
    Step {
        title: "Update custom resource definition",
        requires: &[Slot::CrdPath],
        provides: &[],
        run: |installer, ctx| apply_crd(installer, ctx, ApplyMode::Replace).boxed(),
    }
}

pub(super) fn flush() -> Step {
    Step {
        title: "Wait for the API server to settle",
        requires: &[],
        provides: &[],
        run: |installer, _| {
            async move {
                flush_delay(installer.config.waits.flush_delay).await;
                Ok(StepOutcome::Done)
            }
            .boxed()
        },
    }
}

/// Operator deployment manifest with the configured image, target namespace
/// and, on clusters that need it, only the operator container
pub(super) fn staged_deployment(installer: &Installer, ctx: &RunContext) -> Result<Deployment> {
    let capabilities = ctx.capabilities()?;
    let manifest = load_operator_deployment(ctx.resources_dir())?;
    let config = &installer.config;

    let overrides = DeploymentOverrides {
        image: DeploymentOverrides::image_for_channel(
            config.operator_image.as_deref(),
            config.channel,
            operator_image(&manifest),
        ),
        namespace: Some(config.namespace.clone()),
        trim_containers: !capabilities.api_extensions_v1 || capabilities.legacy_platform,
    };
    patch_deployment(manifest, &overrides)
}
