// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::steps;
use super::{Installer, RunContext, Slot, Step, StepOutcome};
use crate::constants::names;
use crate::error::{ObjectRef, Result};
use crate::kubernetes::checluster::{delete_custom_resource, find_custom_resource};
use crate::kubernetes::crd::crd_version;
use crate::teardown;
use futures::future::{BoxFuture, FutureExt};
use kube::ResourceExt;

pub(super) fn steps() -> Vec<Step> {
    vec![
        steps::capabilities(),
        Step {
            title: "Look up custom resource",
            requires: &[],
            provides: &[Slot::DeployedResource],
            run: run_lookup,
        },
        Step {
            title: "Delete OAuth client authorizations",
            requires: &[Slot::Capabilities, Slot::DeployedResource],
            provides: &[],
            run: run_delete_authorizations,
        },
        Step {
            title: "Delete custom resource",
            requires: &[Slot::DeployedResource],
            provides: &[],
            run: run_delete_resource,
        },
        Step {
            title: "Delete custom resource definition",
            requires: &[Slot::Capabilities],
            provides: &[],
            run: run_delete_crd,
        },
        Step {
            title: "Delete roles and role bindings",
            requires: &[],
            provides: &[],
            run: |installer, _| {
                async move {
                    let deleted =
                        teardown::delete_namespaced_rbac(&installer.client, installer.namespace())
                            .await?;
                    Ok(StepOutcome::Deleted(deleted))
                }
                .boxed()
            },
        },
        Step {
            title: "Delete cluster roles and bindings",
            requires: &[],
            provides: &[Slot::BindingDeletions],
            run: run_delete_cluster_rbac,
        },
        Step {
            title: "Delete legacy cluster role and binding",
            requires: &[Slot::BindingDeletions],
            provides: &[],
            run: run_delete_legacy_rbac,
        },
        Step {
            title: "Delete operator deployment, service account and volume claim",
            requires: &[],
            provides: &[],
            run: |installer, _| {
                async move {
                    let deleted = teardown::delete_operator_resources(
                        &installer.client,
                        installer.namespace(),
                    )
                    .await?;
                    Ok(StepOutcome::Deleted(deleted))
                }
                .boxed()
            },
        },
    ]
}

fn run_lookup<'a>(installer: &'a Installer, ctx: &'a mut RunContext) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let deployed = find_custom_resource(&installer.client, installer.namespace()).await?;
        let outcome = match &deployed {
            Some(_) => StepOutcome::Done,
            None => StepOutcome::Skipped("no custom resource deployed".to_string()),
        };
        ctx.set_deployed_resource(deployed);
        Ok(outcome)
    }
    .boxed()
}

fn run_delete_authorizations<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        if !ctx.capabilities()?.oauth_authorizations {
            return Ok(StepOutcome::Skipped("cluster has no OAuth API".to_string()));
        }
        let Some(client_name) = ctx
            .deployed_resource()?
            .and_then(|resource| resource.oauth_client_name())
        else {
            return Ok(StepOutcome::Skipped("no OAuth client configured".to_string()));
        };

        let deleted = teardown::delete_oauth_authorizations(&installer.client, client_name).await?;
        Ok(StepOutcome::Deleted(deleted))
    }
    .boxed()
}

fn run_delete_resource<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let Some(resource) = ctx.deployed_resource()? else {
            return Ok(StepOutcome::Skipped("no custom resource deployed".to_string()));
        };
        let name = resource.name_any();
        let namespace = installer.namespace();

        delete_custom_resource(&installer.client, namespace, &name, &installer.config.waits).await?;
        Ok(StepOutcome::Deleted(vec![ObjectRef::namespaced(
            "CheCluster",
            name,
            namespace,
        )]))
    }
    .boxed()
}

fn run_delete_crd<'a>(installer: &'a Installer, ctx: &'a mut RunContext) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let api_extensions_v1 = ctx.capabilities()?.api_extensions_v1;
        if teardown::delete_crd_if_unused(&installer.client, api_extensions_v1).await? {
            Ok(StepOutcome::Deleted(vec![ObjectRef::cluster(
                "CustomResourceDefinition",
                names::CRD,
            )]))
        } else {
            Ok(StepOutcome::Skipped(format!(
                "{} definition still in use or absent",
                crd_version(api_extensions_v1)
            )))
        }
    }
    .boxed()
}

fn run_delete_cluster_rbac<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let result =
            teardown::delete_prefixed_cluster_rbac(&installer.client, installer.namespace())
                .await?;
        ctx.set_binding_deletions(result.bindings_deleted);
        Ok(StepOutcome::Deleted(result.deleted))
    }
    .boxed()
}

fn run_delete_legacy_rbac<'a>(
    installer: &'a Installer,
    ctx: &'a mut RunContext,
) -> BoxFuture<'a, Result<StepOutcome>> {
    async move {
        let prefixed = ctx.binding_deletions()?;
        if prefixed > 0 {
            return Ok(StepOutcome::Skipped(format!(
                "{} prefixed cluster role binding(s) removed",
                prefixed
            )));
        }
        let deleted = teardown::delete_legacy_cluster_rbac(&installer.client).await?;
        Ok(StepOutcome::Deleted(deleted))
    }
    .boxed()
}
