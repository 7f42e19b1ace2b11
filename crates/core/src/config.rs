//! Alert stack configuration.
//!
//! [`AlertConfig`] is the fully parsed parameter set for one stack. Optional
//! targets are stored as `Option<String>`, and the accessor methods treat
//! blank strings as absent so that a config built by hand behaves the same as
//! one parsed from parameters.

use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::validation::{decode_slack_hook, validate_alarm_period};

pub const DEFAULT_LOG_ERROR_FILTER: &str = "ERROR";
pub const DEFAULT_STAGE: &str = "test";
pub const DEFAULT_SLACK_CHANNEL: &str = "alert-template";
pub const DEFAULT_S3_BUCKET: &str = "alert-template-artifacts";
pub const DEFAULT_S3_KEY: &str = "slack-alert/slack-alert.zip";
pub const DEFAULT_ALARM_PERIOD_SECS: u32 = 60;
pub const DEFAULT_ALARM_EVALUATION_PERIODS: u32 = 1;
pub const DEFAULT_ALARM_THRESHOLD_PERCENT: f64 = 80.0;

/// Shared tuning for the resource-utilization alarms.
///
/// The log-error alarm does not use these values.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct AlarmTuning {
    /// `AlarmPeriod`: seconds per evaluation period.
    pub period_secs: u32,
    /// `AlarmEvaluationPeriods`: consecutive periods that must breach.
    #[validate(range(min = 1, message = "AlarmEvaluationPeriods must be at least 1"))]
    pub evaluation_periods: u32,
    /// `AlarmThreshold`: utilization percent that triggers the alarm.
    #[validate(range(
        min = 0.0,
        max = 100.0,
        message = "AlarmThreshold must be between 0 and 100"
    ))]
    pub threshold_percent: f64,
}

impl Default for AlarmTuning {
    fn default() -> Self {
        Self {
            period_secs: DEFAULT_ALARM_PERIOD_SECS,
            evaluation_periods: DEFAULT_ALARM_EVALUATION_PERIODS,
            threshold_percent: DEFAULT_ALARM_THRESHOLD_PERCENT,
        }
    }
}

/// Full parameter set for one alert stack.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct AlertConfig {
    pub ec2_instance_id: Option<String>,
    pub ecs_cluster_name: Option<String>,
    pub ecs_service_name: Option<String>,
    pub as_group_name: Option<String>,
    pub cw_log_group_name: Option<String>,

    #[validate(
        length(min = 1, message = "Source is required"),
        custom(function = "not_blank", message = "Source is required")
    )]
    pub source: String,
    #[validate(
        length(min = 1, message = "LogErrorFilter must not be empty"),
        custom(function = "not_blank", message = "LogErrorFilter must not be empty")
    )]
    pub log_error_filter: String,
    #[validate(
        length(min = 1, message = "Stage must not be empty"),
        custom(function = "not_blank", message = "Stage must not be empty")
    )]
    pub stage: String,
    #[validate(
        length(min = 1, message = "SlackChannel must not be empty"),
        custom(function = "not_blank", message = "SlackChannel must not be empty")
    )]
    pub slack_channel: String,
    #[validate(
        length(min = 1, message = "SlackHookUrlBase64 is required"),
        custom(function = "not_blank", message = "SlackHookUrlBase64 is required")
    )]
    pub slack_hook_url_base64: String,
    #[validate(
        length(min = 1, message = "S3Bucket must not be empty"),
        custom(function = "not_blank", message = "S3Bucket must not be empty")
    )]
    pub s3_bucket: String,
    #[validate(
        length(min = 1, message = "S3Key must not be empty"),
        custom(function = "not_blank", message = "S3Key must not be empty")
    )]
    pub s3_key: String,

    #[validate(nested)]
    pub tuning: AlarmTuning,
}

/// Which ECS alarms apply. Service alarms replace cluster alarms whenever a
/// service name is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsTarget<'a> {
    Cluster { cluster: &'a str },
    Service { cluster: &'a str, service: &'a str },
}

impl AlertConfig {
    /// Config with every optional target unset and every default applied.
    pub fn new(source: impl Into<String>, slack_hook_url_base64: impl Into<String>) -> Self {
        Self {
            ec2_instance_id: None,
            ecs_cluster_name: None,
            ecs_service_name: None,
            as_group_name: None,
            cw_log_group_name: None,
            source: source.into(),
            log_error_filter: DEFAULT_LOG_ERROR_FILTER.to_string(),
            stage: DEFAULT_STAGE.to_string(),
            slack_channel: DEFAULT_SLACK_CHANNEL.to_string(),
            slack_hook_url_base64: slack_hook_url_base64.into(),
            s3_bucket: DEFAULT_S3_BUCKET.to_string(),
            s3_key: DEFAULT_S3_KEY.to_string(),
            tuning: AlarmTuning::default(),
        }
    }

    pub fn ec2_instance(&self) -> Option<&str> {
        non_blank(&self.ec2_instance_id)
    }

    pub fn as_group(&self) -> Option<&str> {
        non_blank(&self.as_group_name)
    }

    pub fn log_group(&self) -> Option<&str> {
        non_blank(&self.cw_log_group_name)
    }

    /// ECS alarm target, or `None` when no cluster is named.
    pub fn ecs_target(&self) -> Option<EcsTarget<'_>> {
        let cluster = non_blank(&self.ecs_cluster_name)?;
        Some(match non_blank(&self.ecs_service_name) {
            Some(service) => EcsTarget::Service { cluster, service },
            None => EcsTarget::Cluster { cluster },
        })
    }

    /// Check field constraints, the alarm period and the Slack hook encoding.
    pub fn validate_config(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if !self.tuning.threshold_percent.is_finite() {
            return Err(CoreError::Validation(
                "AlarmThreshold must be a finite number".to_string(),
            ));
        }
        validate_alarm_period(self.tuning.period_secs)?;
        decode_slack_hook(&self.slack_hook_url_base64)?;
        Ok(())
    }

    /// Legal but probably unintended combinations, for the caller to log.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if non_blank(&self.ecs_service_name).is_some() && non_blank(&self.ecs_cluster_name).is_none()
        {
            warnings.push(
                "ECSServiceName is set without ECSClusterName; no ECS alarms will be created"
                    .to_string(),
            );
        }
        warnings
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    // "https://hooks.slack.com/services/T000/B000/XXXX"
    const HOOK: &str = "aHR0cHM6Ly9ob29rcy5zbGFjay5jb20vc2VydmljZXMvVDAwMC9CMDAwL1hYWFg=";

    #[test]
    fn new_applies_defaults() {
        let config = AlertConfig::new("app", HOOK);
        assert_eq!(config.stage, "test");
        assert_eq!(config.slack_channel, "alert-template");
        assert_eq!(config.log_error_filter, "ERROR");
        assert_eq!(config.tuning.period_secs, 60);
        assert_eq!(config.tuning.evaluation_periods, 1);
        assert_eq!(config.tuning.threshold_percent, 80.0);
        assert!(config.validate_config().is_ok());
    }

    #[test]
    fn blank_targets_are_absent() {
        let mut config = AlertConfig::new("app", HOOK);
        config.ec2_instance_id = Some("   ".into());
        config.ecs_cluster_name = Some(String::new());
        assert_eq!(config.ec2_instance(), None);
        assert_eq!(config.ecs_target(), None);
    }

    #[test]
    fn ecs_target_switches_on_service_name() {
        let mut config = AlertConfig::new("app", HOOK);
        config.ecs_cluster_name = Some("main".into());
        assert_eq!(config.ecs_target(), Some(EcsTarget::Cluster { cluster: "main" }));

        config.ecs_service_name = Some("web".into());
        assert_eq!(
            config.ecs_target(),
            Some(EcsTarget::Service {
                cluster: "main",
                service: "web"
            })
        );
    }

    #[test]
    fn missing_source_fails_validation() {
        let config = AlertConfig::new("", HOOK);
        assert_matches!(config.validate_config(), Err(CoreError::Validation(msg)) if msg.contains("Source"));
    }

    #[test]
    fn whitespace_only_required_fields_fail_validation() {
        let config = AlertConfig::new("   ", HOOK);
        assert_matches!(config.validate_config(), Err(CoreError::Validation(msg)) if msg.contains("Source"));

        let mut config = AlertConfig::new("app", HOOK);
        config.stage = " \t".into();
        assert_matches!(config.validate_config(), Err(CoreError::Validation(msg)) if msg.contains("Stage"));
    }

    #[test]
    fn nan_threshold_fails_validation() {
        let mut config = AlertConfig::new("app", HOOK);
        config.tuning.threshold_percent = f64::NAN;
        assert_matches!(config.validate_config(), Err(CoreError::Validation(msg)) if msg.contains("AlarmThreshold"));
    }

    #[test]
    fn threshold_out_of_range_fails_validation() {
        let mut config = AlertConfig::new("app", HOOK);
        config.tuning.threshold_percent = 120.0;
        assert_matches!(config.validate_config(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn zero_evaluation_periods_fails_validation() {
        let mut config = AlertConfig::new("app", HOOK);
        config.tuning.evaluation_periods = 0;
        assert_matches!(config.validate_config(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn odd_period_fails_validation() {
        let mut config = AlertConfig::new("app", HOOK);
        config.tuning.period_secs = 45;
        assert_matches!(config.validate_config(), Err(CoreError::Validation(msg)) if msg.contains("AlarmPeriod"));
    }

    #[test]
    fn undecodable_hook_fails_validation() {
        let config = AlertConfig::new("app", "%%%");
        assert_matches!(config.validate_config(), Err(CoreError::Validation(msg)) if msg.contains("SlackHookUrlBase64"));
    }

    #[test]
    fn orphan_service_name_warns() {
        let mut config = AlertConfig::new("app", HOOK);
        assert!(config.warnings().is_empty());
        config.ecs_service_name = Some("web".into());
        assert_eq!(config.warnings().len(), 1);
    }
}
