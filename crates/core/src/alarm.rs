//! Resolved CloudWatch alarm and metric filter types.

use serde::Serialize;

/// Alarm family. One variant per alarm the stack can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmKind {
    Ec2Cpu,
    EcsClusterCpu,
    EcsClusterMemory,
    EcsServiceCpu,
    EcsServiceMemory,
    AutoScalingCpu,
    LogErrors,
}

impl AlarmKind {
    /// CloudFormation logical ID of the alarm resource.
    pub fn logical_id(self) -> &'static str {
        match self {
            Self::Ec2Cpu => "Ec2CpuAlarm",
            Self::EcsClusterCpu => "EcsClusterCpuAlarm",
            Self::EcsClusterMemory => "EcsClusterMemoryAlarm",
            Self::EcsServiceCpu => "EcsServiceCpuAlarm",
            Self::EcsServiceMemory => "EcsServiceMemoryAlarm",
            Self::AutoScalingCpu => "AutoScalingCpuAlarm",
            Self::LogErrors => "LogErrorAlarm",
        }
    }

    /// Suffix used in the alarm name.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Ec2Cpu => "ec2-cpu",
            Self::EcsClusterCpu => "ecs-cluster-cpu",
            Self::EcsClusterMemory => "ecs-cluster-memory",
            Self::EcsServiceCpu => "ecs-service-cpu",
            Self::EcsServiceMemory => "ecs-service-memory",
            Self::AutoScalingCpu => "asg-cpu",
            Self::LogErrors => "log-errors",
        }
    }

    /// Whether this is one of the shared-tuning utilization alarms.
    pub fn is_utilization(self) -> bool {
        !matches!(self, Self::LogErrors)
    }
}

/// Key/value pair scoping a metric to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Statistic {
    Average,
    Sum,
}

impl Statistic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Average => "Average",
            Self::Sum => "Sum",
        }
    }
}

/// Every alarm in the stack fires when the statistic rises above the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonOperator {
    GreaterThanThreshold,
}

impl ComparisonOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GreaterThanThreshold => "GreaterThanThreshold",
        }
    }
}

/// One resolved alarm, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmSpec {
    pub kind: AlarmKind,
    pub name: String,
    pub description: String,
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub statistic: Statistic,
    pub comparison: ComparisonOperator,
    pub threshold: f64,
    pub period_secs: u32,
    pub evaluation_periods: u32,
}

impl AlarmSpec {
    /// Value of the named dimension, if the alarm carries it.
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

/// Log metric filter turning matching log lines into a count metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricFilterSpec {
    pub log_group_name: String,
    pub filter_pattern: String,
    pub metric_namespace: String,
    pub metric_name: String,
    pub metric_value: String,
}

/// CloudFormation logical ID of the metric filter resource.
pub const METRIC_FILTER_LOGICAL_ID: &str = "LogErrorMetricFilter";
