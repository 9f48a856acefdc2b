// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::steps::{self, staged_deployment};
use super::{Installer, RunContext, Slot, Step, StepOutcome};
use crate::constants::names;
use crate::error::Result;
use crate::kubernetes::checluster::{apply_custom_resource, build_cr_patch, stage_custom_resource};
use crate::kubernetes::deployment::create_operator_deployment;
use crate::kubernetes::ensure_namespace_exists;
use crate::wait::{wait_for_pod_ready, PollPolicy};
use futures::future::{BoxFuture, FutureExt};

pub(super) fn steps() -> Vec<Step> {
    vec![
        steps::capabilities(),
        Step {
            title: "Ensure namespace",
            requires: &[],
            provides: &[],
            run: run_namespace,
        },
        steps::scan(),
        steps::create_access(),
        steps::select_crd(),
        steps::create_crd(),
        steps::flush(),
        Step {
            title: "Create operator deployment",
            requires: &[Slot::Capabilities],
            provides: &[],
            run: run_deployment,
        },
        Step {
            title: "Wait for operator pod",
            requires: &[],
            provides: &[],
            run: run_wait_for_pod,
        },
        Step {
            title: "Stage custom resource",
            requires: &[],
            provides: &[Slot::CrPatch, Slot::StagedResource],
            run: run_stage,
        },
        Step {
            title: "Create custom resource",
            requires: &[Slot::StagedResource],
            provides: &[],
            run: run_create_resource,
        },
    ]
}

fn run_namespace<'a>(
    installer: &'a Installer,
    _: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let created = ensure_namespace_exists(&installer.client, installer.namespace()).await?;
        Ok(if created {
            StepOutcome::Done
        } else {
            StepOutcome::Skipped("namespace exists".to_string())
        })
    }
    .boxed()
}

fn run_deployment<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let deployment = staged_deployment(installer, ctx)?;
        let applied =
            create_operator_deployment(&installer.client, installer.namespace(), deployment)
                .await?;
        Ok(StepOutcome::Applied(vec![applied]))
    }
    .boxed()
}

fn run_wait_for_pod<'a>(
    installer: &'a Installer,
    _: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let waits = &installer.config.waits;
        wait_for_pod_ready(
            &installer.client,
            installer.namespace(),
            names::OPERATOR_SELECTOR,
            PollPolicy::deadline(waits.poll_interval, waits.pod_ready_timeout),
        )
        .await?;
        Ok(StepOutcome::Done)
    }
    .boxed()
}

fn run_stage<'a>(installer: &'a Installer, ctx: &'a mut RunContext) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let config = &installer.config;
        let patch = build_cr_patch(config.cr_patch_path.as_deref(), config.workspace_engine)?;
        let resource = stage_custom_resource(
            ctx.resources_dir(),
            config.cr_path.as_deref(),
            &patch,
            installer.namespace(),
        )?;
        ctx.set_cr_patch(patch);
        ctx.set_staged_resource(resource);
        Ok(StepOutcome::Done)
    }
    .boxed()
}

fn run_create_resource<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let resource = ctx.take_staged_resource()?;
        let applied = apply_custom_resource(&installer.client, installer.namespace(), resource).await?;
        Ok(StepOutcome::Applied(vec![applied]))
    }
    .boxed()
}
