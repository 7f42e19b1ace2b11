//! CloudFormation template rendering.
//!
//! [`render`] turns a [`StackPlan`] into a concrete template: no Parameters,
//! no Conditions, only the resources the resolver selected. Dependencies the
//! plan declares are emitted as `DependsOn` only when the properties do not
//! already reference the target through `Ref` or `Fn::GetAtt`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::alarm::{AlarmSpec, MetricFilterSpec};
use crate::error::CoreError;
use crate::notification::{
    AlertFunction, ExecutionRole, NotificationTarget, FUNCTION_LOGICAL_ID, LAMBDA_PRINCIPAL,
    ROLE_LOGICAL_ID, SNS_PRINCIPAL, TOPIC_LOGICAL_ID,
};
use crate::stack::{OutputValue, PlannedResource, ResourceSpec, StackPlan};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: &'static str,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, TemplateResource>,
    #[serde(rename = "Outputs")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub properties: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    pub description: &'static str,
    pub value: Value,
}

impl Template {
    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&TemplateResource> {
        self.resources.get(logical_id)
    }
}

/// Render the plan as a CloudFormation template.
pub fn render(plan: &StackPlan) -> Template {
    let resources = plan
        .resources()
        .iter()
        .map(|resource| (resource.logical_id.clone(), render_resource(resource)))
        .collect();

    let outputs = plan
        .outputs()
        .iter()
        .map(|output| {
            let value = match &output.value {
                OutputValue::Literal(v) => Value::String(v.clone()),
                OutputValue::Ref(id) => reference(id),
            };
            (
                output.name.to_string(),
                TemplateOutput {
                    description: output.description,
                    value,
                },
            )
        })
        .collect();

    Template {
        format_version: TEMPLATE_FORMAT_VERSION,
        description: format!("Alert stack for {} ({})", plan.source, plan.stage),
        resources,
        outputs,
    }
}

fn render_resource(resource: &PlannedResource) -> TemplateResource {
    let properties = match &resource.spec {
        ResourceSpec::ExecutionRole(role) => role_properties(role),
        ResourceSpec::Function(function) => function_properties(function),
        ResourceSpec::Topic(target) => topic_properties(target),
        ResourceSpec::InvokePermission => permission_properties(),
        ResourceSpec::MetricFilter(filter) => metric_filter_properties(filter),
        ResourceSpec::Alarm(alarm) => alarm_properties(alarm),
    };

    let depends_on = resource
        .depends_on
        .iter()
        .filter(|dep| !references(&properties, dep))
        .cloned()
        .collect();

    TemplateResource {
        resource_type: resource.spec.resource_type(),
        depends_on,
        properties,
    }
}

fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

fn arn_of(logical_id: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, "Arn"] })
}

/// Whether `value` contains a `Ref` or `Fn::GetAtt` pointing at `logical_id`.
fn references(value: &Value, logical_id: &str) -> bool {
    match value {
        Value::Object(map) => {
            if map.get("Ref").and_then(Value::as_str) == Some(logical_id) {
                return true;
            }
            if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                if parts.first().and_then(Value::as_str) == Some(logical_id) {
                    return true;
                }
            }
            map.values().any(|v| references(v, logical_id))
        }
        Value::Array(items) => items.iter().any(|v| references(v, logical_id)),
        _ => false,
    }
}

fn role_properties(role: &ExecutionRole) -> Value {
    json!({
        "AssumeRolePolicyDocument": {
            "Version": POLICY_VERSION,
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": [LAMBDA_PRINCIPAL] },
                "Action": ["sts:AssumeRole"],
            }],
        },
        "Policies": [
            {
                "PolicyName": "alert-function-logs",
                "PolicyDocument": {
                    "Version": POLICY_VERSION,
                    "Statement": [{
                        "Effect": "Allow",
                        "Action": [
                            "logs:CreateLogGroup",
                            "logs:CreateLogStream",
                            "logs:PutLogEvents",
                        ],
                        "Resource": "arn:aws:logs:*:*:*",
                    }],
                },
            },
            {
                "PolicyName": "alert-artifact-read",
                "PolicyDocument": {
                    "Version": POLICY_VERSION,
                    "Statement": [{
                        "Effect": "Allow",
                        "Action": ["s3:GetObject", "s3:ListBucket"],
                        "Resource": [role.artifact_bucket_arn(), role.artifact_objects_arn()],
                    }],
                },
            },
        ],
    })
}

fn function_properties(function: &AlertFunction) -> Value {
    json!({
        "FunctionName": function.function_name,
        "Runtime": function.runtime,
        "Handler": function.handler,
        "Timeout": function.timeout_secs,
        "MemorySize": function.memory_mb,
        "Role": arn_of(ROLE_LOGICAL_ID),
        "Code": {
            "S3Bucket": function.code_bucket,
            "S3Key": function.code_key,
        },
        "Environment": { "Variables": function.environment },
    })
}

fn topic_properties(target: &NotificationTarget) -> Value {
    json!({
        "TopicName": target.topic_name,
        "DisplayName": target.display_name,
        "Subscription": [{
            "Endpoint": arn_of(target.subscriber_logical_id),
            "Protocol": "lambda",
        }],
    })
}

fn permission_properties() -> Value {
    json!({
        "Action": "lambda:InvokeFunction",
        "FunctionName": reference(FUNCTION_LOGICAL_ID),
        "Principal": SNS_PRINCIPAL,
        "SourceArn": reference(TOPIC_LOGICAL_ID),
    })
}

fn metric_filter_properties(filter: &MetricFilterSpec) -> Value {
    json!({
        "LogGroupName": filter.log_group_name,
        "FilterPattern": filter.filter_pattern,
        "MetricTransformations": [{
            "MetricName": filter.metric_name,
            "MetricNamespace": filter.metric_namespace,
            "MetricValue": filter.metric_value,
        }],
    })
}

fn alarm_properties(alarm: &AlarmSpec) -> Value {
    let mut properties = json!({
        "AlarmName": alarm.name,
        "AlarmDescription": alarm.description,
        "Namespace": alarm.namespace,
        "MetricName": alarm.metric_name,
        "Statistic": alarm.statistic.as_str(),
        "ComparisonOperator": alarm.comparison.as_str(),
        "Threshold": alarm.threshold,
        "Period": alarm.period_secs,
        "EvaluationPeriods": alarm.evaluation_periods,
        "AlarmActions": [reference(TOPIC_LOGICAL_ID)],
    });
    if !alarm.dimensions.is_empty() {
        properties["Dimensions"] = json!(alarm.dimensions);
    }
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmKind;
    use crate::config::AlertConfig;
    use crate::notification::PERMISSION_LOGICAL_ID;

    fn config() -> AlertConfig {
        AlertConfig::new("app", "aHR0cHM6Ly9leGFtcGxlLmNvbQ==")
    }

    #[test]
    fn one_template_resource_per_planned_resource() {
        let mut c = config();
        c.ec2_instance_id = Some("i-1".into());
        c.cw_log_group_name = Some("/app/logs".into());
        let plan = StackPlan::build(&c);
        let template = render(&plan);
        assert_eq!(template.resources.len(), plan.resources().len());
        assert_eq!(template.format_version, "2010-09-09");
    }

    #[test]
    fn alarms_notify_the_topic() {
        let mut c = config();
        c.ecs_cluster_name = Some("main".into());
        let template = render(&StackPlan::build(&c));
        let alarm = template.resource(AlarmKind::EcsClusterCpu.logical_id()).unwrap();
        assert_eq!(alarm.resource_type, "AWS::CloudWatch::Alarm");
        assert_eq!(alarm.properties["AlarmActions"][0]["Ref"], TOPIC_LOGICAL_ID);
        assert_eq!(alarm.properties["Dimensions"][0]["Name"], "ClusterName");
        assert_eq!(alarm.properties["Dimensions"][0]["Value"], "main");
        assert!(alarm.depends_on.is_empty());
    }

    #[test]
    fn log_alarm_has_explicit_depends_on_filter() {
        let mut c = config();
        c.cw_log_group_name = Some("/app/logs".into());
        let template = render(&StackPlan::build(&c));
        let alarm = template.resource(AlarmKind::LogErrors.logical_id()).unwrap();
        assert_eq!(alarm.depends_on, vec![crate::alarm::METRIC_FILTER_LOGICAL_ID.to_string()]);
        assert!(alarm.properties.get("Dimensions").is_none());
        assert_eq!(alarm.properties["Statistic"], "Sum");
    }

    #[test]
    fn function_references_role_and_artifact() {
        let template = render(&StackPlan::build(&config()));
        let function = template.resource(FUNCTION_LOGICAL_ID).unwrap();
        assert_eq!(function.properties["Role"]["Fn::GetAtt"][0], ROLE_LOGICAL_ID);
        assert_eq!(function.properties["Code"]["S3Key"], crate::config::DEFAULT_S3_KEY);
        assert!(function.depends_on.is_empty());
    }

    #[test]
    fn permission_grants_sns() {
        let template = render(&StackPlan::build(&config()));
        let permission = template.resource(PERMISSION_LOGICAL_ID).unwrap();
        assert_eq!(permission.properties["Principal"], "sns.amazonaws.com");
        assert_eq!(permission.properties["SourceArn"]["Ref"], TOPIC_LOGICAL_ID);
    }

    #[test]
    fn outputs_render_literals_and_refs() {
        let template = render(&StackPlan::build(&config()));
        assert_eq!(template.outputs["Stage"].value, "test");
        assert_eq!(template.outputs["AlertTopicArn"].value["Ref"], TOPIC_LOGICAL_ID);
    }

    #[test]
    fn serializes_with_cloudformation_keys() {
        let json = render(&StackPlan::build(&config())).to_json_pretty().unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(parsed["Resources"][TOPIC_LOGICAL_ID]["Type"], "AWS::SNS::Topic");
        assert!(parsed["Resources"][TOPIC_LOGICAL_ID].get("DependsOn").is_none());
    }
}
