// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::{Parser, Subcommand};
use kube::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use che_installer::config::{Config, ConfigArgs};
use che_installer::pipeline::{Installer, RunReport, StepOutcome};

#[derive(Debug, Parser)]
#[command(name = "che-installer", version, about = "Installs the Che operator into a cluster")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install the operator and its custom resource
    Deploy,
    /// Update an existing installation in place
    Update,
    /// Remove the installation
    Delete,
}

fn print_report(report: &RunReport) {
    for step in &report.steps {
        println!("{}: {}", step.title, step.outcome);
        match &step.outcome {
            StepOutcome::Applied(applied) => applied.iter().for_each(|a| println!("  {}", a)),
            StepOutcome::Deleted(deleted) => deleted.iter().for_each(|d| println!("  {} deleted", d)),
            StepOutcome::Warnings(warnings) => warnings.iter().for_each(|w| println!("  warning: {}", w)),
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from(cli.config);
    info!(
        "Configuration loaded: namespace={}, templates={}",
        config.namespace,
        config.resources_dir.display()
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let installer = Installer::new(client, config);
    let report = match cli.command {
        Command::Deploy => installer.deploy().await?,
        Command::Update => installer.update().await?,
        Command::Delete => installer.delete().await?,
    };

    print_report(&report);
    Ok(())
}
