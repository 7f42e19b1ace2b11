//! Stack status classification and the wait-until-settled loop.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::CloudError;

/// Coarse state of a stack derived from its CloudFormation status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    Pending,
    Succeeded,
    Failed,
}

/// Status and reason as reported by `DescribeStacks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSnapshot {
    pub status: String,
    pub reason: Option<String>,
}

/// Classify a CloudFormation stack status.
///
/// Anything still `_IN_PROGRESS` is pending. Rollbacks, `_FAILED` and
/// `DELETE_COMPLETE` are failures even when the rollback itself completed.
pub fn classify(status: &str) -> StackState {
    if status.ends_with("_IN_PROGRESS") {
        StackState::Pending
    } else if status.contains("ROLLBACK")
        || status.ends_with("_FAILED")
        || status == "DELETE_COMPLETE"
    {
        StackState::Failed
    } else if status.ends_with("_COMPLETE") {
        StackState::Succeeded
    } else {
        StackState::Failed
    }
}

/// Whether an existing stack can only be deleted, not updated.
pub fn requires_delete(status: &str) -> bool {
    status == "ROLLBACK_COMPLETE" || status == "ROLLBACK_FAILED"
}

/// Message CloudFormation returns when an update would change nothing.
const NO_UPDATES_MESSAGE: &str = "No updates are to be performed";

/// Whether an `UpdateStack` error only means the template is unchanged.
pub fn is_no_updates(message: &str) -> bool {
    message.contains(NO_UPDATES_MESSAGE)
}

/// What a deploy should do given the current state of the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackAction {
    Create,
    Update,
    Refuse { status: String },
}

impl StackAction {
    pub fn for_existing(existing: Option<&StackSnapshot>) -> Self {
        match existing {
            None => Self::Create,
            Some(snapshot) if requires_delete(&snapshot.status) => Self::Refuse {
                status: snapshot.status.clone(),
            },
            Some(_) => Self::Update,
        }
    }
}

/// Poll `describe` until the stack reaches a terminal status.
///
/// Returns the final status on success. A stack that disappears while
/// waiting is reported as failed.
pub async fn wait_until_settled<F, Fut>(
    stack: &str,
    poll_interval: Duration,
    timeout: Duration,
    mut describe: F,
) -> Result<String, CloudError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<StackSnapshot>, CloudError>>,
{
    let started = Instant::now();

    loop {
        let Some(snapshot) = describe().await? else {
            return Err(CloudError::StackFailed {
                stack: stack.to_string(),
                status: "DELETE_COMPLETE".to_string(),
                reason: "stack no longer exists".to_string(),
            });
        };

        match classify(&snapshot.status) {
            StackState::Succeeded => return Ok(snapshot.status),
            StackState::Failed => {
                return Err(CloudError::StackFailed {
                    stack: stack.to_string(),
                    status: snapshot.status,
                    reason: snapshot
                        .reason
                        .unwrap_or_else(|| "no reason reported".to_string()),
                });
            }
            StackState::Pending => {
                if started.elapsed() >= timeout {
                    return Err(CloudError::Timeout {
                        stack: stack.to_string(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
                tracing::info!(stack, status = %snapshot.status, "Waiting for stack");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}
