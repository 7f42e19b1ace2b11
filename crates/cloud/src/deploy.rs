//! Plan-to-stack deployment flow.
//!
//! Checks the plan's dependency graph, verifies the Lambda artifact, renders
//! the template and hands it to a [`StackProvisioner`].

use std::time::Duration;

use alertstack_core::error::CoreError;
use alertstack_core::stack::StackPlan;
use alertstack_core::template::render;
use alertstack_core::validation::is_valid_stack_name;

use crate::error::CloudError;
use crate::provisioner::{DeployOutcome, DeployRequest, StackProvisioner, DEFAULT_DEPLOY_TIMEOUT};

#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Explicit stack name; defaults to [`StackPlan::default_stack_name`].
    pub stack_name: Option<String>,
    /// Check the Lambda artifact exists before submitting.
    pub verify_artifact: bool,
    pub timeout: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            stack_name: None,
            verify_artifact: true,
            timeout: DEFAULT_DEPLOY_TIMEOUT,
        }
    }
}

/// Deploy `plan` through `provisioner`.
pub async fn deploy_plan(
    provisioner: &dyn StackProvisioner,
    plan: &StackPlan,
    options: &DeployOptions,
) -> Result<DeployOutcome, CloudError> {
    let stack_name = options
        .stack_name
        .clone()
        .unwrap_or_else(|| plan.default_stack_name());
    if !is_valid_stack_name(&stack_name) {
        return Err(CoreError::Validation(format!("Invalid stack name '{stack_name}'")).into());
    }

    let order = plan.provisioning_order()?;
    tracing::debug!(
        stack = %stack_name,
        order = ?order.iter().map(|r| r.logical_id.as_str()).collect::<Vec<_>>(),
        "Provisioning order",
    );

    if options.verify_artifact {
        let function = plan
            .function()
            .ok_or_else(|| CoreError::Internal("plan has no alert function".to_string()))?;
        provisioner
            .verify_artifact(&function.code_bucket, &function.code_key)
            .await?;
    }

    let template_body = render(plan).to_json_pretty()?;
    tracing::info!(
        stack = %stack_name,
        resources = plan.resources().len(),
        alarms = plan.alarms().count(),
        "Deploying alert stack",
    );

    let request = DeployRequest {
        stack_name,
        template_body,
        timeout: options.timeout,
    };
    provisioner.deploy(&request).await
}
