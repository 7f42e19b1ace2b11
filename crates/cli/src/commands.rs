//! Command implementations.
//!
//! Each command's output is built as a string first so the JSON shapes can
//! be tested without capturing stdout.

use std::time::Duration;

use anyhow::Context;
use serde::Serialize;

use alertstack_cloud::cloudformation::CloudFormationProvisioner;
use alertstack_cloud::{deploy_plan, DeployOptions, DryRunProvisioner, StackProvisioner};
use alertstack_core::alarm::{AlarmSpec, MetricFilterSpec};
use alertstack_core::config::AlertConfig;
use alertstack_core::resolver::{resolve, resolve_log_filter};
use alertstack_core::stack::StackPlan;
use alertstack_core::template::render;

use crate::cli::{Cli, Commands, DeployArgs, RenderArgs};
use crate::config::load_config;

#[derive(Serialize)]
struct Resolution {
    alarms: Vec<AlarmSpec>,
    metric_filter: Option<MetricFilterSpec>,
}

#[derive(Serialize)]
struct PlanStep<'a> {
    logical_id: &'a str,
    #[serde(rename = "type")]
    resource_type: &'static str,
    depends_on: &'a [String],
}

/// Resolved alarms and metric filter as pretty JSON.
pub fn resolve_json(config: &AlertConfig) -> anyhow::Result<String> {
    let resolution = Resolution {
        alarms: resolve(config),
        metric_filter: resolve_log_filter(config),
    };
    Ok(serde_json::to_string_pretty(&resolution)?)
}

/// Rendered CloudFormation template as pretty JSON.
pub fn render_json(config: &AlertConfig) -> anyhow::Result<String> {
    Ok(render(&StackPlan::build(config)).to_json_pretty()?)
}

/// Provisioning order as pretty JSON.
pub fn plan_json(config: &AlertConfig) -> anyhow::Result<String> {
    let plan = StackPlan::build(config);
    let steps: Vec<PlanStep<'_>> = plan
        .provisioning_order()?
        .into_iter()
        .map(|resource| PlanStep {
            logical_id: &resource.logical_id,
            resource_type: resource.spec.resource_type(),
            depends_on: &resource.depends_on,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&steps)?)
}

/// Run the parsed command line.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Resolve => println!("{}", resolve_json(&config)?),
        Commands::Render(args) => render_command(&config, args)?,
        Commands::Plan => println!("{}", plan_json(&config)?),
        Commands::Deploy(args) => deploy_command(&config, args).await?,
    }

    Ok(())
}

/// Run the command line, logging any failure once. Returns the process exit
/// code.
pub async fn run(cli: Cli) -> i32 {
    match execute(cli).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "Command failed");
            1
        }
    }
}

fn render_command(config: &AlertConfig, args: RenderArgs) -> anyhow::Result<()> {
    let template = render_json(config)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, template)
                .with_context(|| format!("Failed to write template to {}", path.display()))?;
            tracing::info!(path = %path.display(), "Template written");
        }
        None => println!("{template}"),
    }
    Ok(())
}

async fn deploy_command(config: &AlertConfig, args: DeployArgs) -> anyhow::Result<()> {
    let plan = StackPlan::build(config);
    let options = DeployOptions {
        stack_name: args.stack_name,
        verify_artifact: !args.skip_artifact_check,
        timeout: Duration::from_secs(args.timeout_secs),
    };

    let provisioner: Box<dyn StackProvisioner> = if args.dry_run {
        Box::new(DryRunProvisioner::new())
    } else {
        Box::new(
            CloudFormationProvisioner::from_env()
                .await
                .with_poll_interval(Duration::from_secs(args.poll_interval_secs)),
        )
    };

    let outcome = deploy_plan(provisioner.as_ref(), &plan, &options).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
