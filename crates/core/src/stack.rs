//! Stack plan: every resource the alert stack provisions, with dependencies.
//!
//! [`StackPlan::build`] runs the resolver and adds the notification
//! resources around it. [`StackPlan::provisioning_order`] gives a
//! deterministic create order in which the topic always precedes the alarms
//! that notify it.

use serde::Serialize;

use crate::alarm::{AlarmSpec, MetricFilterSpec, METRIC_FILTER_LOGICAL_ID};
use crate::config::AlertConfig;
use crate::error::CoreError;
use crate::notification::{
    AlertFunction, ExecutionRole, NotificationTarget, FUNCTION_LOGICAL_ID, PERMISSION_LOGICAL_ID,
    ROLE_LOGICAL_ID, TOPIC_LOGICAL_ID,
};
use crate::resolver::{resolve, resolve_log_filter};
use crate::validation::sanitize_stack_name;

/// Logical ID of the topic ARN output.
pub const TOPIC_ARN_OUTPUT: &str = "AlertTopicArn";

/// What a planned resource is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceSpec {
    ExecutionRole(ExecutionRole),
    Function(AlertFunction),
    Topic(NotificationTarget),
    InvokePermission,
    MetricFilter(MetricFilterSpec),
    Alarm(AlarmSpec),
}

impl ResourceSpec {
    /// CloudFormation resource type.
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::ExecutionRole(_) => "AWS::IAM::Role",
            Self::Function(_) => "AWS::Lambda::Function",
            Self::Topic(_) => "AWS::SNS::Topic",
            Self::InvokePermission => "AWS::Lambda::Permission",
            Self::MetricFilter(_) => "AWS::Logs::MetricFilter",
            Self::Alarm(_) => "AWS::CloudWatch::Alarm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedResource {
    pub logical_id: String,
    pub depends_on: Vec<String>,
    pub spec: ResourceSpec,
}

impl PlannedResource {
    fn new(logical_id: &str, depends_on: &[&str], spec: ResourceSpec) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            spec,
        }
    }
}

/// Value of a stack output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputValue {
    Literal(String),
    /// `Ref` to a resource in the same stack.
    Ref(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackOutput {
    pub name: &'static str,
    pub description: &'static str,
    pub value: OutputValue,
}

/// Full resource plan for one alert stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackPlan {
    pub stage: String,
    pub source: String,
    resources: Vec<PlannedResource>,
    outputs: Vec<StackOutput>,
}

impl StackPlan {
    /// Resolve `config` and assemble the complete plan.
    pub fn build(config: &AlertConfig) -> Self {
        let mut resources = vec![
            PlannedResource::new(
                ROLE_LOGICAL_ID,
                &[],
                ResourceSpec::ExecutionRole(ExecutionRole::for_config(config)),
            ),
            PlannedResource::new(
                FUNCTION_LOGICAL_ID,
                &[ROLE_LOGICAL_ID],
                ResourceSpec::Function(AlertFunction::for_config(config)),
            ),
            PlannedResource::new(
                TOPIC_LOGICAL_ID,
                &[FUNCTION_LOGICAL_ID],
                ResourceSpec::Topic(NotificationTarget::for_config(config)),
            ),
            PlannedResource::new(
                PERMISSION_LOGICAL_ID,
                &[FUNCTION_LOGICAL_ID, TOPIC_LOGICAL_ID],
                ResourceSpec::InvokePermission,
            ),
        ];

        if let Some(filter) = resolve_log_filter(config) {
            resources.push(PlannedResource::new(
                METRIC_FILTER_LOGICAL_ID,
                &[],
                ResourceSpec::MetricFilter(filter),
            ));
        }

        for alarm in resolve(config) {
            let depends_on: &[&str] = if alarm.kind.is_utilization() {
                &[TOPIC_LOGICAL_ID]
            } else {
                &[TOPIC_LOGICAL_ID, METRIC_FILTER_LOGICAL_ID]
            };
            resources.push(PlannedResource::new(
                alarm.kind.logical_id(),
                depends_on,
                ResourceSpec::Alarm(alarm),
            ));
        }

        Self {
            stage: config.stage.clone(),
            source: config.source.clone(),
            resources,
            outputs: outputs_for(config),
        }
    }

    /// Resources in declaration order.
    pub fn resources(&self) -> &[PlannedResource] {
        &self.resources
    }

    pub fn resource(&self, logical_id: &str) -> Option<&PlannedResource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    pub fn outputs(&self) -> &[StackOutput] {
        &self.outputs
    }

    pub fn alarms(&self) -> impl Iterator<Item = &AlarmSpec> {
        self.resources.iter().filter_map(|r| match &r.spec {
            ResourceSpec::Alarm(alarm) => Some(alarm),
            _ => None,
        })
    }

    pub fn function(&self) -> Option<&AlertFunction> {
        self.resources.iter().find_map(|r| match &r.spec {
            ResourceSpec::Function(function) => Some(function),
            _ => None,
        })
    }

    pub fn metric_filter(&self) -> Option<&MetricFilterSpec> {
        self.resources.iter().find_map(|r| match &r.spec {
            ResourceSpec::MetricFilter(filter) => Some(filter),
            _ => None,
        })
    }

    /// Stack name derived from stage and source, coerced into a legal
    /// CloudFormation name.
    pub fn default_stack_name(&self) -> String {
        sanitize_stack_name(&format!("{}-{}-alerts", self.stage, self.source))
    }

    /// Topological create order. Ties keep declaration order.
    pub fn provisioning_order(&self) -> Result<Vec<&PlannedResource>, CoreError> {
        let index_of = |id: &str| self.resources.iter().position(|r| r.logical_id == id);

        let mut pending = vec![0usize; self.resources.len()];
        for (i, resource) in self.resources.iter().enumerate() {
            for dep in &resource.depends_on {
                if index_of(dep).is_none() {
                    return Err(CoreError::Internal(format!(
                        "{} depends on unknown resource {dep}",
                        resource.logical_id
                    )));
                }
                pending[i] += 1;
            }
        }

        let mut done = vec![false; self.resources.len()];
        let mut order = Vec::with_capacity(self.resources.len());

        while order.len() < self.resources.len() {
            let next = (0..self.resources.len())
                .find(|&i| !done[i] && pending[i] == 0)
                .ok_or_else(|| {
                    CoreError::Internal("dependency cycle in stack plan".to_string())
                })?;

            done[next] = true;
            let finished = &self.resources[next].logical_id;
            for (i, resource) in self.resources.iter().enumerate() {
                if !done[i] {
                    pending[i] -= resource.depends_on.iter().filter(|d| *d == finished).count();
                }
            }
            order.push(&self.resources[next]);
        }

        Ok(order)
    }
}

fn outputs_for(config: &AlertConfig) -> Vec<StackOutput> {
    let literal = |name: &'static str, description: &'static str, value: &str| StackOutput {
        name,
        description,
        value: OutputValue::Literal(value.to_string()),
    };

    vec![
        literal("Stage", "Deployment stage", &config.stage),
        literal("SlackChannel", "Slack channel receiving alerts", &config.slack_channel),
        literal(
            "SlackHookUrlBase64",
            "Base64-encoded Slack webhook URL",
            &config.slack_hook_url_base64,
        ),
        literal("S3Bucket", "Bucket holding the alert function artifact", &config.s3_bucket),
        literal("S3Key", "Key of the alert function artifact", &config.s3_key),
        StackOutput {
            name: TOPIC_ARN_OUTPUT,
            description: "SNS topic receiving alarm notifications",
            value: OutputValue::Ref(TOPIC_LOGICAL_ID.to_string()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::alarm::AlarmKind;

    fn config() -> AlertConfig {
        AlertConfig::new("app", "aHR0cHM6Ly9leGFtcGxlLmNvbQ==")
    }

    fn position(order: &[&PlannedResource], id: &str) -> usize {
        order.iter().position(|r| r.logical_id == id).unwrap()
    }

    #[test]
    fn bare_config_has_only_notification_resources() {
        let plan = StackPlan::build(&config());
        let ids: Vec<_> = plan.resources().iter().map(|r| r.logical_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                ROLE_LOGICAL_ID,
                FUNCTION_LOGICAL_ID,
                TOPIC_LOGICAL_ID,
                PERMISSION_LOGICAL_ID
            ]
        );
        assert_eq!(plan.alarms().count(), 0);
        assert!(plan.metric_filter().is_none());
    }

    #[test]
    fn topic_precedes_every_alarm() {
        let mut c = config();
        c.ec2_instance_id = Some("i-1".into());
        c.ecs_cluster_name = Some("main".into());
        c.ecs_service_name = Some("web".into());
        c.as_group_name = Some("asg".into());
        c.cw_log_group_name = Some("/app/logs".into());

        let plan = StackPlan::build(&c);
        let order = plan.provisioning_order().unwrap();
        assert_eq!(order.len(), plan.resources().len());

        let topic = position(&order, TOPIC_LOGICAL_ID);
        for alarm in plan.alarms() {
            assert!(topic < position(&order, alarm.kind.logical_id()));
        }
        assert!(position(&order, ROLE_LOGICAL_ID) < position(&order, FUNCTION_LOGICAL_ID));
        assert!(
            position(&order, METRIC_FILTER_LOGICAL_ID)
                < position(&order, AlarmKind::LogErrors.logical_id())
        );
    }

    #[test]
    fn log_alarm_depends_on_filter() {
        let mut c = config();
        c.cw_log_group_name = Some("/app/logs".into());
        let plan = StackPlan::build(&c);
        let alarm = plan.resource(AlarmKind::LogErrors.logical_id()).unwrap();
        assert!(alarm.depends_on.iter().any(|d| d == METRIC_FILTER_LOGICAL_ID));
    }

    #[test]
    fn utilization_alarms_depend_only_on_topic() {
        let mut c = config();
        c.ec2_instance_id = Some("i-1".into());
        c.as_group_name = Some("web-asg".into());
        c.cw_log_group_name = Some("/app/logs".into());
        let plan = StackPlan::build(&c);

        for kind in [AlarmKind::Ec2Cpu, AlarmKind::AutoScalingCpu] {
            let alarm = plan.resource(kind.logical_id()).unwrap();
            assert_eq!(alarm.depends_on, vec![TOPIC_LOGICAL_ID.to_string()]);
        }
    }

    #[test]
    fn unknown_dependency_is_internal_error() {
        let mut plan = StackPlan::build(&config());
        plan.resources[0].depends_on.push("Missing".into());
        assert_matches!(plan.provisioning_order(), Err(CoreError::Internal(_)));
    }

    #[test]
    fn cycle_is_internal_error() {
        let mut plan = StackPlan::build(&config());
        plan.resources[0].depends_on.push(TOPIC_LOGICAL_ID.into());
        assert_matches!(plan.provisioning_order(), Err(CoreError::Internal(msg)) if msg.contains("cycle"));
    }

    #[test]
    fn outputs_echo_parameters_and_topic() {
        let plan = StackPlan::build(&config());
        let names: Vec<_> = plan.outputs().iter().map(|o| o.name).collect();
        assert_eq!(
            names,
            vec!["Stage", "SlackChannel", "SlackHookUrlBase64", "S3Bucket", "S3Key", TOPIC_ARN_OUTPUT]
        );
        assert_eq!(
            plan.outputs()[0].value,
            OutputValue::Literal("test".to_string())
        );
    }

    #[test]
    fn default_stack_name_is_legal() {
        let mut c = config();
        c.source = "my_app/api".into();
        assert_eq!(StackPlan::build(&c).default_stack_name(), "test-my-app-api-alerts");
    }
}
