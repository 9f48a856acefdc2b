// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Ordered step lists for deploy, update and delete, and the runner that
//! executes them over one [`RunContext`].
//!
//! Every step declares the context fields it reads and writes. A pipeline is
//! only built when each read is preceded by a write in an earlier step.

pub mod context;
mod delete;
mod deploy;
mod steps;
mod update;

pub use context::{RunContext, Slot};

use crate::config::Config;
use crate::error::{InstallerError, ObjectRef, Result};
use crate::kubernetes::{Applied, ApplyOutcome};
use futures::future::BoxFuture;
use kube::Client;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, instrument};

/// Everything a step needs besides the run context
pub struct Installer {
    pub client: Client,
    pub config: Config,
}

impl Installer {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Run the deploy pipeline
    pub async fn deploy(&self) -> Result<RunReport> {
        Pipeline::deploy()?.run(self).await
    }

    /// Run the update pipeline
    pub async fn update(&self) -> Result<RunReport> {
        Pipeline::update()?.run(self).await
    }

    /// Run the delete pipeline
    pub async fn delete(&self) -> Result<RunReport> {
        Pipeline::delete()?.run(self).await
    }
}

/// What a finished step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    /// Finished, with something worth telling the user
    Note(String),
    /// Finished, but found problems that did not stop it
    Warnings(Vec<String>),
    Skipped(String),
    Applied(Vec<Applied>),
    Deleted(Vec<ObjectRef>),
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Done => write!(f, "done"),
            StepOutcome::Note(note) => write!(f, "done, {}", note),
            StepOutcome::Warnings(warnings) => write!(f, "done with {} warning(s)", warnings.len()),
            StepOutcome::Skipped(reason) => write!(f, "skipped, {}", reason),
            StepOutcome::Applied(applied) => write!(f, "{} object(s) applied", applied.len()),
            StepOutcome::Deleted(deleted) => write!(f, "{} object(s) deleted", deleted.len()),
        }
    }
}

pub type StepFn =
    for<'a> fn(&'a Installer, &'a mut RunContext) -> BoxFuture<'a, Result<StepOutcome>>;

pub struct Step {
    pub title: &'static str,
    pub requires: &'static [Slot],
    pub provides: &'static [Slot],
    pub run: StepFn,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub title: &'static str,
    pub outcome: StepOutcome,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn applied(&self) -> impl Iterator<Item = &Applied> {
        self.steps.iter().flat_map(|s| match &s.outcome {
            StepOutcome::Applied(applied) => applied.as_slice(),
            _ => &[][..],
        })
    }

    pub fn deleted(&self) -> impl Iterator<Item = &ObjectRef> {
        self.steps.iter().flat_map(|s| match &s.outcome {
            StepOutcome::Deleted(deleted) => deleted.as_slice(),
            _ => &[][..],
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = &String> {
        self.steps.iter().flat_map(|s| match &s.outcome {
            StepOutcome::Warnings(warnings) => warnings.as_slice(),
            _ => &[][..],
        })
    }

    pub fn count(&self, outcome: ApplyOutcome) -> usize {
        self.applied().filter(|a| a.outcome == outcome).count()
    }
}

pub struct Pipeline {
    name: &'static str,
    steps: Vec<Step>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let titles: Vec<&str> = self.steps.iter().map(|s| s.title).collect();
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("steps", &titles)
            .finish()
    }
}

impl Pipeline {
    /// Build a pipeline, rejecting any step that reads a slot no earlier
    /// step writes
    pub fn new(name: &'static str, steps: Vec<Step>) -> Result<Self> {
        let mut written: HashSet<Slot> = HashSet::new();
        for step in &steps {
            if let Some(slot) = step.requires.iter().find(|s| !written.contains(*s)) {
                return Err(InstallerError::PipelineOrder {
                    step: step.title,
                    slot: slot.to_string(),
                });
            }
            written.extend(step.provides.iter().copied());
        }
        Ok(Self { name, steps })
    }

    pub fn deploy() -> Result<Self> {
        Self::new("deploy", deploy::steps())
    }

    pub fn update() -> Result<Self> {
        Self::new("update", update::steps())
    }

    pub fn delete() -> Result<Self> {
        Self::new("delete", delete::steps())
    }

    pub fn titles(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|s| s.title)
    }

    /// Run every step in order with a fresh context, stopping at the first error
    #[instrument(skip(self, installer), fields(pipeline = self.name, namespace = %installer.namespace()))]
    pub async fn run(&self, installer: &Installer) -> Result<RunReport> {
        let mut ctx = RunContext::new(&installer.config.resources_dir);
        let mut report = RunReport::default();
        let total = self.steps.len();

        for (index, step) in self.steps.iter().enumerate() {
            info!("[{}/{}] {}", index + 1, total, step.title);
            let outcome = (step.run)(installer, &mut ctx).await?;
            info!("[{}/{}] {}: {}", index + 1, total, step.title, outcome);
            report.steps.push(StepReport {
                title: step.title,
                outcome,
            });
        }

        info!("{} finished in namespace '{}'", self.name, installer.namespace());
        Ok(report)
    }
}
