//! CloudFormation + S3 provisioner.
//!
//! Submits rendered templates with `CreateStack` / `UpdateStack` and polls
//! `DescribeStacks` until the stack settles. Artifact checks use S3
//! `HeadObject`. Credentials and region come from the default AWS chain.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cloudformation::types::Capability;

use crate::error::CloudError;
use crate::provisioner::{DeployOutcome, DeployRequest, StackProvisioner};
use crate::status::{is_no_updates, wait_until_settled, StackAction, StackSnapshot};

/// Default interval between `DescribeStacks` polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct CloudFormationProvisioner {
    cloudformation: aws_sdk_cloudformation::Client,
    s3: aws_sdk_s3::Client,
    poll_interval: Duration,
}

impl CloudFormationProvisioner {
    /// Build clients from the default credential and region chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(&config)
    }

    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            cloudformation: aws_sdk_cloudformation::Client::new(config),
            s3: aws_sdk_s3::Client::new(config),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Current status of `stack`, or `None` if it does not exist.
    async fn describe(&self, stack: &str) -> Result<Option<StackSnapshot>, CloudError> {
        let response = match self
            .cloudformation
            .describe_stacks()
            .stack_name(stack)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.message().is_some_and(|m| m.contains("does not exist")) => {
                return Ok(None);
            }
            Err(err) => return Err(CloudError::Aws(DisplayErrorContext(&err).to_string())),
        };

        Ok(response.stacks().first().and_then(|s| {
            s.stack_status().map(|status| StackSnapshot {
                status: status.as_str().to_string(),
                reason: s.stack_status_reason().map(str::to_string),
            })
        }))
    }

    async fn create(&self, request: &DeployRequest) -> Result<(), CloudError> {
        self.cloudformation
            .create_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .capabilities(Capability::CapabilityIam)
            .send()
            .await
            .map_err(|err| CloudError::Aws(DisplayErrorContext(&err).to_string()))?;
        Ok(())
    }

    /// Returns `false` when CloudFormation reports there is nothing to update.
    async fn update(&self, request: &DeployRequest) -> Result<bool, CloudError> {
        match self
            .cloudformation
            .update_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .capabilities(Capability::CapabilityIam)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.message().is_some_and(is_no_updates) => Ok(false),
            Err(err) => Err(CloudError::Aws(DisplayErrorContext(&err).to_string())),
        }
    }

    async fn wait(&self, request: &DeployRequest) -> Result<String, CloudError> {
        wait_until_settled(
            &request.stack_name,
            self.poll_interval,
            request.timeout,
            || self.describe(&request.stack_name),
        )
        .await
    }
}

#[async_trait]
impl StackProvisioner for CloudFormationProvisioner {
    async fn verify_artifact(&self, bucket: &str, key: &str) -> Result<(), CloudError> {
        match self.s3.head_object().bucket(bucket).key(key).send().await {
            Ok(head) => {
                tracing::info!(
                    bucket,
                    key,
                    size = head.content_length().unwrap_or_default(),
                    "Artifact found",
                );
                Ok(())
            }
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                Err(CloudError::ArtifactMissing {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(err) => Err(CloudError::Aws(
                aws_sdk_s3::error::DisplayErrorContext(&err).to_string(),
            )),
        }
    }

    async fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome, CloudError> {
        let stack_name = request.stack_name.clone();

        let existing = self.describe(&stack_name).await?;
        match StackAction::for_existing(existing.as_ref()) {
            StackAction::Create => {
                tracing::info!(stack = %stack_name, "Creating stack");
                self.create(request).await?;
                let status = self.wait(request).await?;
                Ok(DeployOutcome::Created { stack_name, status })
            }
            StackAction::Refuse { status } => Err(CloudError::StackFailed {
                stack: stack_name,
                status,
                reason: "stack must be deleted before it can be deployed again".to_string(),
            }),
            StackAction::Update => {
                tracing::info!(stack = %stack_name, "Updating stack");
                if !self.update(request).await? {
                    tracing::info!(stack = %stack_name, "Stack already up to date");
                    return Ok(DeployOutcome::Unchanged { stack_name });
                }
                let status = self.wait(request).await?;
                Ok(DeployOutcome::Updated { stack_name, status })
            }
        }
    }
}
