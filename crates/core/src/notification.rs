//! Notification target: SNS topic, Slack dispatch Lambda and its role.
//!
//! The Lambda code itself lives elsewhere; this module only describes where
//! to load it from and how it is wired to the topic.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::AlertConfig;
use crate::validation::sanitize_resource_name;

pub const ROLE_LOGICAL_ID: &str = "AlertFunctionRole";
pub const FUNCTION_LOGICAL_ID: &str = "AlertFunction";
pub const TOPIC_LOGICAL_ID: &str = "AlertTopic";
pub const PERMISSION_LOGICAL_ID: &str = "AlertTopicInvokePermission";

pub const LAMBDA_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const SNS_PRINCIPAL: &str = "sns.amazonaws.com";

pub const FUNCTION_RUNTIME: &str = "nodejs20.x";
pub const FUNCTION_HANDLER: &str = "index.handler";
pub const FUNCTION_TIMEOUT_SECS: u32 = 30;
pub const FUNCTION_MEMORY_MB: u32 = 128;

const MAX_TOPIC_NAME_LEN: usize = 256;
const MAX_FUNCTION_NAME_LEN: usize = 64;

/// Execution role for the dispatch function: write its own logs and read
/// the artifact bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRole {
    pub artifact_bucket: String,
}

impl ExecutionRole {
    pub fn for_config(config: &AlertConfig) -> Self {
        Self {
            artifact_bucket: config.s3_bucket.clone(),
        }
    }

    pub fn artifact_bucket_arn(&self) -> String {
        format!("arn:aws:s3:::{}", self.artifact_bucket)
    }

    pub fn artifact_objects_arn(&self) -> String {
        format!("arn:aws:s3:::{}/*", self.artifact_bucket)
    }
}

/// The Slack dispatch Lambda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertFunction {
    pub function_name: String,
    pub runtime: &'static str,
    pub handler: &'static str,
    pub timeout_secs: u32,
    pub memory_mb: u32,
    pub code_bucket: String,
    pub code_key: String,
    pub environment: BTreeMap<String, String>,
}

/// SNS topic with the dispatch function as its only subscriber, plus the
/// grant letting SNS invoke it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationTarget {
    pub topic_name: String,
    pub display_name: String,
    pub subscriber_logical_id: &'static str,
    pub invoke_principal: &'static str,
}

impl AlertFunction {
    pub fn for_config(config: &AlertConfig) -> Self {
        let environment = BTreeMap::from([
            ("SLACK_CHANNEL".to_string(), config.slack_channel.clone()),
            (
                "SLACK_HOOK_URL_BASE64".to_string(),
                config.slack_hook_url_base64.clone(),
            ),
            ("STAGE".to_string(), config.stage.clone()),
            ("SOURCE".to_string(), config.source.clone()),
        ]);

        Self {
            function_name: sanitize_resource_name(
                &format!("{}-{}-slack-alert", config.stage, config.source),
                MAX_FUNCTION_NAME_LEN,
            ),
            runtime: FUNCTION_RUNTIME,
            handler: FUNCTION_HANDLER,
            timeout_secs: FUNCTION_TIMEOUT_SECS,
            memory_mb: FUNCTION_MEMORY_MB,
            code_bucket: config.s3_bucket.clone(),
            code_key: config.s3_key.clone(),
            environment,
        }
    }
}

impl NotificationTarget {
    pub fn for_config(config: &AlertConfig) -> Self {
        Self {
            topic_name: sanitize_resource_name(
                &format!("{}-{}-alerts", config.stage, config.source),
                MAX_TOPIC_NAME_LEN,
            ),
            display_name: format!("{} {} alerts", config.source, config.stage),
            subscriber_logical_id: FUNCTION_LOGICAL_ID,
            invoke_principal: SNS_PRINCIPAL,
        }
    }
}
