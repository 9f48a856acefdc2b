// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::steps::{self, staged_deployment};
use super::{Installer, RunContext, Slot, Step, StepOutcome};
use crate::constants::names;
use crate::error::Result;
use crate::guard::check_update_compatibility;
use crate::kubernetes::checluster::{build_cr_patch, find_custom_resource, patch_custom_resource};
use crate::kubernetes::deployment::{
    get_operator_deployment, operator_image, replace_operator_deployment, report_image_change,
    ImageRef,
};
use crate::wait::{wait_for_latest_replica_set, PollPolicy};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

pub(super) fn steps() -> Vec<Step> {
    vec![
        steps::capabilities(),
        Step {
            title: "Check operator deployment",
            requires: &[],
            provides: &[Slot::PreviousImage],
            run: run_check_deployment,
        },
        Step {
            title: "Check update compatibility",
            requires: &[],
            provides: &[Slot::CrPatch, Slot::DeployedResource],
            run: run_check_compatibility,
        },
        steps::scan(),
        steps::replace_access(),
        steps::select_crd(),
        steps::replace_crd(),
        steps::flush(),
        Step {
            title: "Update operator deployment",
            requires: &[Slot::Capabilities, Slot::PreviousImage],
            provides: &[Slot::TargetImage],
            run: run_replace_deployment,
        },
        Step {
            title: "Wait for new operator replica set",
            requires: &[Slot::TargetImage],
            provides: &[],
            run: run_wait_for_rollout,
        },
        Step {
            title: "Patch custom resource",
            requires: &[Slot::CrPatch, Slot::DeployedResource],
            provides: &[],
            run: run_patch_resource,
        },
    ]
}

fn run_check_deployment<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let deployment = get_operator_deployment(&installer.client, installer.namespace()).await?;
        ctx.set_previous_image(operator_image(&deployment).map(ImageRef::parse));
        Ok(StepOutcome::Done)
    }
    .boxed()
}

fn run_check_compatibility<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let config = &installer.config;
        let patch = build_cr_patch(config.cr_patch_path.as_deref(), config.workspace_engine)?;
        let deployed = find_custom_resource(&installer.client, installer.namespace()).await?;

        check_update_compatibility(deployed.as_ref(), &patch)?;

        ctx.set_cr_patch(patch);
        ctx.set_deployed_resource(deployed);
        Ok(StepOutcome::Done)
    }
    .boxed()
}

fn run_replace_deployment<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let deployment = staged_deployment(installer, ctx)?;
        let target = operator_image(&deployment).map(ImageRef::parse);

        let applied =
            replace_operator_deployment(&installer.client, installer.namespace(), deployment)
                .await?;

        report_image_change(ctx.previous_image()?, target.as_ref());
        ctx.set_target_image(target);
        Ok(StepOutcome::Applied(vec![applied]))
    }
    .boxed()
}

fn run_wait_for_rollout<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let waits = &installer.config.waits;
        wait_for_latest_replica_set(
            &installer.client,
            installer.namespace(),
            names::OPERATOR,
            PollPolicy::deadline(waits.poll_interval, waits.replica_timeout),
        )
        .await?;
        Ok(match ctx.target_image()? {
            Some(image) => StepOutcome::Note(format!("operator runs {}", image)),
            None => StepOutcome::Done,
        })
    }
    .boxed()
}

fn is_empty_patch(patch: &Value) -> bool {
    patch.as_object().is_some_and(|o| o.is_empty())
}

fn run_patch_resource<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let patch = ctx.cr_patch()?;
        let Some(deployed) = ctx.deployed_resource()? else {
            return Ok(StepOutcome::Skipped("no custom resource deployed".to_string()));
        };
        if is_empty_patch(patch) {
            return Ok(StepOutcome::Skipped("nothing to patch".to_string()));
        }

        patch_custom_resource(&installer.client, installer.namespace(), deployed, patch).await?;
        Ok(StepOutcome::Done)
    }
    .boxed()
}
