// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::wait;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Release channel the operator image is taken from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Channel {
    #[default]
    Stable,
    Nightly,
}

/// Requested state of a feature toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    Enabled,
    Disabled,
}

impl Toggle {
    pub fn is_enabled(self) -> bool {
        self == Toggle::Enabled
    }
}

/// Command line flags, each with an environment variable fallback
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Namespace the operator is installed into
    #[arg(long, short = 'n', env = "CHE_NAMESPACE", default_value = "eclipse-che")]
    pub chenamespace: String,

    /// Directory holding the operator manifests
    #[arg(long, env = "CHE_TEMPLATES_DIR", default_value = "templates/che-operator")]
    pub templates: PathBuf,

    /// Operator container image, overrides the manifest image
    #[arg(long, env = "CHE_OPERATOR_IMAGE")]
    pub che_operator_image: Option<String>,

    #[arg(long, value_enum, env = "CHE_CHANNEL", default_value = "stable")]
    pub channel: Channel,

    /// Custom resource file used instead of the default one
    #[arg(long)]
    pub che_operator_cr_yaml: Option<PathBuf>,

    /// Merge patch applied to the custom resource
    #[arg(long)]
    pub che_operator_cr_patch_yaml: Option<PathBuf>,

    /// Workspace engine feature flag
    #[arg(long, value_enum)]
    pub workspace_engine: Option<Toggle>,

    /// Seconds to wait for the operator pod to become ready
    #[arg(long, default_value_t = wait::POD_READY_TIMEOUT_SECS)]
    pub pod_ready_timeout: u64,

    /// Seconds to wait for an updated deployment to converge
    #[arg(long, default_value_t = wait::REPLICA_TIMEOUT_SECS)]
    pub replica_timeout: u64,
}

/// Installer configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub namespace: String,
    pub resources_dir: PathBuf,
    pub operator_image: Option<String>,
    pub channel: Channel,
    pub cr_path: Option<PathBuf>,
    pub cr_patch_path: Option<PathBuf>,
    pub workspace_engine: Option<Toggle>,
    pub waits: WaitConfig,
}

/// Bounds for every convergence wait
#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub flush_delay: Duration,
    pub poll_interval: Duration,
    pub pod_ready_timeout: Duration,
    pub replica_timeout: Duration,
    pub cr_deletion_attempts: u32,
    pub finalizer_grace: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            flush_delay: Duration::from_secs(wait::FLUSH_DELAY_SECS),
            poll_interval: Duration::from_secs(wait::POLL_INTERVAL_SECS),
            pod_ready_timeout: Duration::from_secs(wait::POD_READY_TIMEOUT_SECS),
            replica_timeout: Duration::from_secs(wait::REPLICA_TIMEOUT_SECS),
            cr_deletion_attempts: wait::CR_DELETION_ATTEMPTS,
            finalizer_grace: Duration::from_secs(wait::FINALIZER_GRACE_SECS),
        }
    }
}

impl Config {
    /// Configuration with defaults for everything but the namespace and manifests
    pub fn new(namespace: impl Into<String>, resources_dir: impl Into<PathBuf>) -> Self {
        Self {
            namespace: namespace.into(),
            resources_dir: resources_dir.into(),
            operator_image: None,
            channel: Channel::Stable,
            cr_path: None,
            cr_patch_path: None,
            workspace_engine: None,
            waits: WaitConfig::default(),
        }
    }
}

impl From<ConfigArgs> for Config {
    fn from(args: ConfigArgs) -> Self {
        Self {
            namespace: args.chenamespace,
            resources_dir: args.templates,
            operator_image: args.che_operator_image,
            channel: args.channel,
            cr_path: args.che_operator_cr_yaml,
            cr_patch_path: args.che_operator_cr_patch_yaml,
            workspace_engine: args.workspace_engine,
            waits: WaitConfig {
                pod_ready_timeout: Duration::from_secs(args.pod_ready_timeout),
                replica_timeout: Duration::from_secs(args.replica_timeout),
                ..WaitConfig::default()
            },
        }
    }
}
