//! Provisioner abstraction.
//!
//! [`StackProvisioner`] is the seam between the pure plan and the cloud.
//! The CloudFormation implementation talks to AWS; [`DryRunProvisioner`]
//! records requests so the CLI and tests can exercise the full flow offline.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CloudError;

/// Default time to wait for a stack to settle (30 minutes).
pub const DEFAULT_DEPLOY_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// A rendered template ready to submit under a stack name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub stack_name: String,
    pub template_body: String,
    pub timeout: Duration,
}

/// Result of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeployOutcome {
    Created { stack_name: String, status: String },
    Updated { stack_name: String, status: String },
    /// CloudFormation reported no changes between the live stack and the template.
    Unchanged { stack_name: String },
    /// Nothing was submitted.
    DryRun { stack_name: String },
}

#[async_trait]
pub trait StackProvisioner: Send + Sync {
    /// Fail with [`CloudError::ArtifactMissing`] unless `s3://bucket/key` exists.
    async fn verify_artifact(&self, bucket: &str, key: &str) -> Result<(), CloudError>;

    /// Create or update the stack and wait for it to settle.
    async fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome, CloudError>;
}

/// Provisioner that submits nothing and remembers what it was asked to do.
#[derive(Debug)]
pub struct DryRunProvisioner {
    artifact_present: bool,
    requests: Mutex<Vec<DeployRequest>>,
}

impl DryRunProvisioner {
    /// A dry run in which every artifact is assumed to exist.
    pub fn new() -> Self {
        Self::with_artifact(true)
    }

    /// A dry run with a fixed answer for artifact checks.
    pub fn with_artifact(artifact_present: bool) -> Self {
        Self {
            artifact_present,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<DeployRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for DryRunProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StackProvisioner for DryRunProvisioner {
    async fn verify_artifact(&self, bucket: &str, key: &str) -> Result<(), CloudError> {
        if self.artifact_present {
            tracing::info!(bucket, key, "Dry run: assuming artifact exists");
            Ok(())
        } else {
            Err(CloudError::ArtifactMissing {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
        }
    }

    async fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome, CloudError> {
        tracing::info!(
            stack = %request.stack_name,
            template_bytes = request.template_body.len(),
            "Dry run: skipping stack submission",
        );
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());
        Ok(DeployOutcome::DryRun {
            stack_name: request.stack_name.clone(),
        })
    }
}
