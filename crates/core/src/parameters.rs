//! Named stack parameters and their sources.
//!
//! Parameters use the CloudFormation template names (`EC2InstanceId`,
//! `AlarmThreshold`, ...). A [`ParameterSet`] is filled from a JSON
//! parameter file, the environment and `Key=Value` overrides, merged with
//! later sources winning, then converted into an [`AlertConfig`].

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::AlertConfig;
use crate::error::CoreError;

/// A known stack parameter and the environment variable that can supply it.
#[derive(Debug, Clone, Copy)]
pub struct ParameterDef {
    pub name: &'static str,
    pub env_var: &'static str,
}

pub const EC2_INSTANCE_ID: &str = "EC2InstanceId";
pub const ECS_CLUSTER_NAME: &str = "ECSClusterName";
pub const ECS_SERVICE_NAME: &str = "ECSServiceName";
pub const AS_GROUP_NAME: &str = "ASGroupName";
pub const CW_LOG_GROUP_NAME: &str = "CWLogGroupName";
pub const SOURCE: &str = "Source";
pub const LOG_ERROR_FILTER: &str = "LogErrorFilter";
pub const STAGE: &str = "Stage";
pub const SLACK_CHANNEL: &str = "SlackChannel";
pub const SLACK_HOOK_URL_BASE64: &str = "SlackHookUrlBase64";
pub const S3_BUCKET: &str = "S3Bucket";
pub const S3_KEY: &str = "S3Key";
pub const ALARM_PERIOD: &str = "AlarmPeriod";
pub const ALARM_EVALUATION_PERIODS: &str = "AlarmEvaluationPeriods";
pub const ALARM_THRESHOLD: &str = "AlarmThreshold";

/// Every parameter the stack accepts.
pub const PARAMETERS: &[ParameterDef] = &[
    ParameterDef { name: EC2_INSTANCE_ID, env_var: "EC2_INSTANCE_ID" },
    ParameterDef { name: ECS_CLUSTER_NAME, env_var: "ECS_CLUSTER_NAME" },
    ParameterDef { name: ECS_SERVICE_NAME, env_var: "ECS_SERVICE_NAME" },
    ParameterDef { name: AS_GROUP_NAME, env_var: "AS_GROUP_NAME" },
    ParameterDef { name: CW_LOG_GROUP_NAME, env_var: "CW_LOG_GROUP_NAME" },
    ParameterDef { name: SOURCE, env_var: "SOURCE" },
    ParameterDef { name: LOG_ERROR_FILTER, env_var: "LOG_ERROR_FILTER" },
    ParameterDef { name: STAGE, env_var: "STAGE" },
    ParameterDef { name: SLACK_CHANNEL, env_var: "SLACK_CHANNEL" },
    ParameterDef { name: SLACK_HOOK_URL_BASE64, env_var: "SLACK_HOOK_URL_BASE64" },
    ParameterDef { name: S3_BUCKET, env_var: "S3_BUCKET" },
    ParameterDef { name: S3_KEY, env_var: "S3_KEY" },
    ParameterDef { name: ALARM_PERIOD, env_var: "ALARM_PERIOD" },
    ParameterDef { name: ALARM_EVALUATION_PERIODS, env_var: "ALARM_EVALUATION_PERIODS" },
    ParameterDef { name: ALARM_THRESHOLD, env_var: "ALARM_THRESHOLD" },
];

fn is_known(name: &str) -> bool {
    PARAMETERS.iter().any(|p| p.name == name)
}

/// Shape of a parameter file: either a plain object or the CloudFormation
/// CLI `[{"ParameterKey": .., "ParameterValue": ..}]` list.
#[derive(Deserialize)]
#[serde(untagged)]
enum ParameterFile {
    List(Vec<ListEntry>),
    Map(BTreeMap<String, serde_json::Value>),
}

#[derive(Deserialize)]
struct ListEntry {
    #[serde(rename = "ParameterKey")]
    key: String,
    #[serde(rename = "ParameterValue")]
    value: serde_json::Value,
}

/// A set of named parameter values. Only known parameter names are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    values: BTreeMap<String, String>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, rejecting names the stack does not define.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), CoreError> {
        let name = name.into();
        if !is_known(&name) {
            return Err(CoreError::UnknownParameter(name));
        }
        self.values.insert(name, value.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a JSON parameter file (object map or CloudFormation CLI list).
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        let file: ParameterFile = serde_json::from_str(text)?;
        let entries: Vec<(String, serde_json::Value)> = match file {
            ParameterFile::List(list) => list.into_iter().map(|e| (e.key, e.value)).collect(),
            ParameterFile::Map(map) => map.into_iter().collect(),
        };

        let mut set = Self::new();
        for (name, value) in entries {
            let value = scalar_to_string(&name, value)?;
            set.insert(name, value)?;
        }
        Ok(set)
    }

    /// Collect parameters from environment variables via `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let values = PARAMETERS
            .iter()
            .filter_map(|def| lookup(def.env_var).map(|v| (def.name.to_string(), v)))
            .collect();
        Self { values }
    }

    /// Collect parameters from the process environment.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Parse a `Key=Value` override. The value may itself contain `=`.
    pub fn parse_assignment(raw: &str) -> Result<(String, String), CoreError> {
        let (key, value) = raw.split_once('=').ok_or_else(|| {
            CoreError::Validation(format!("Expected Key=Value, got '{raw}'"))
        })?;
        let key = key.trim();
        if !is_known(key) {
            return Err(CoreError::UnknownParameter(key.to_string()));
        }
        Ok((key.to_string(), value.to_string()))
    }

    /// Overlay `other` on top of `self`; values in `other` win.
    pub fn merge(&mut self, other: ParameterSet) {
        self.values.extend(other.values);
    }

    /// Build an [`AlertConfig`], applying defaults for anything unset.
    ///
    /// Numeric parameters must parse; field constraints are checked later by
    /// [`AlertConfig::validate_config`].
    pub fn to_config(&self) -> Result<AlertConfig, CoreError> {
        let mut config = AlertConfig::new(
            self.get(SOURCE).unwrap_or_default(),
            self.get(SLACK_HOOK_URL_BASE64).unwrap_or_default(),
        );

        config.ec2_instance_id = self.optional(EC2_INSTANCE_ID);
        config.ecs_cluster_name = self.optional(ECS_CLUSTER_NAME);
        config.ecs_service_name = self.optional(ECS_SERVICE_NAME);
        config.as_group_name = self.optional(AS_GROUP_NAME);
        config.cw_log_group_name = self.optional(CW_LOG_GROUP_NAME);

        if let Some(v) = self.get(LOG_ERROR_FILTER) {
            config.log_error_filter = v.to_string();
        }
        if let Some(v) = self.get(STAGE) {
            config.stage = v.to_string();
        }
        if let Some(v) = self.get(SLACK_CHANNEL) {
            config.slack_channel = v.to_string();
        }
        if let Some(v) = self.get(S3_BUCKET) {
            config.s3_bucket = v.to_string();
        }
        if let Some(v) = self.get(S3_KEY) {
            config.s3_key = v.to_string();
        }

        if let Some(v) = self.get(ALARM_PERIOD) {
            config.tuning.period_secs = parse_number(ALARM_PERIOD, v)?;
        }
        if let Some(v) = self.get(ALARM_EVALUATION_PERIODS) {
            config.tuning.evaluation_periods = parse_number(ALARM_EVALUATION_PERIODS, v)?;
        }
        if let Some(v) = self.get(ALARM_THRESHOLD) {
            let threshold: f64 = parse_number(ALARM_THRESHOLD, v)?;
            if !threshold.is_finite() {
                return Err(CoreError::InvalidParameter {
                    name: ALARM_THRESHOLD.to_string(),
                    reason: "must be a finite number".to_string(),
                });
            }
            config.tuning.threshold_percent = threshold;
        }

        Ok(config)
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T, CoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| CoreError::InvalidParameter {
        name: name.to_string(),
        reason: format!("'{raw}' is not a valid number ({e})"),
    })
}

fn scalar_to_string(name: &str, value: serde_json::Value) -> Result<String, CoreError> {
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        _ => Err(CoreError::InvalidParameter {
            name: name.to_string(),
            reason: "expected a string or number".to_string(),
        }),
    }
}
