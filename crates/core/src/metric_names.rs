//! Well-known CloudWatch namespaces, metric names and dimension keys.
//!
//! These are the canonical names used by the resolver when building alarm
//! specs and by the template renderer when emitting metric filters.

/// Namespace for EC2 instance and auto-scaling group metrics.
pub const NAMESPACE_EC2: &str = "AWS/EC2";

/// Namespace for ECS cluster and service metrics.
pub const NAMESPACE_ECS: &str = "AWS/ECS";

/// CPU utilization percentage (0-100).
pub const METRIC_CPU_UTILIZATION: &str = "CPUUtilization";

/// Memory utilization percentage (0-100). ECS only.
pub const METRIC_MEMORY_UTILIZATION: &str = "MemoryUtilization";

/// Custom metric emitted by the log metric filter, one per matching line.
pub const METRIC_ERROR_COUNT: &str = "ErrorCount";

/// Value the metric filter publishes for each matching log event.
pub const ERROR_COUNT_INCREMENT: &str = "1";

pub const DIMENSION_INSTANCE_ID: &str = "InstanceId";
pub const DIMENSION_CLUSTER_NAME: &str = "ClusterName";
pub const DIMENSION_SERVICE_NAME: &str = "ServiceName";
pub const DIMENSION_AUTO_SCALING_GROUP: &str = "AutoScalingGroupName";

/// Custom namespace for a source's error-count metric: `{source}/error`.
pub fn error_namespace(source: &str) -> String {
    format!("{source}/error")
}
