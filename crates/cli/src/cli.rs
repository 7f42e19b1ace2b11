//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Alert stack resolver and deployer
#[derive(Debug, Parser)]
#[command(name = "alertstack")]
#[command(about = "Resolve, render and deploy CloudWatch alert stacks")]
#[command(version)]
pub struct Cli {
    /// JSON parameter file (object map or CloudFormation parameter list)
    #[arg(long, global = true, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Parameter override, repeatable (e.g. --param Stage=prod)
    #[arg(long = "param", global = true, value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Ignore parameter environment variables
    #[arg(long, global = true)]
    pub no_env: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the resolved alarms and metric filter as JSON
    Resolve,
    /// Write the CloudFormation template
    Render(RenderArgs),
    /// Print resources in provisioning order with their dependencies
    Plan,
    /// Create or update the stack
    Deploy(DeployArgs),
}

/// Arguments for the render command
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Output file (stdout when omitted)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Arguments for the deploy command
#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Stack name (default: {Stage}-{Source}-alerts)
    #[arg(long)]
    pub stack_name: Option<String>,

    /// Render and log the deployment without calling AWS
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the S3 check for the alert function artifact
    #[arg(long)]
    pub skip_artifact_check: bool,

    /// Seconds to wait for the stack to settle
    #[arg(long, default_value_t = 1800)]
    pub timeout_secs: u64,

    /// Seconds between stack status polls
    #[arg(long, default_value_t = 5)]
    pub poll_interval_secs: u64,
}
