//! Conditional alarm resolver.
//!
//! Pure logic: decides which alarm families apply to an [`AlertConfig`] and
//! builds their specs. Each family has its own constructor; [`resolve`]
//! gates them on the config and emits them in a fixed order (EC2, ECS, ASG,
//! log errors).

use crate::alarm::{AlarmKind, AlarmSpec, ComparisonOperator, Dimension, MetricFilterSpec, Statistic};
use crate::config::{AlertConfig, EcsTarget};
use crate::metric_names::{
    error_namespace, DIMENSION_AUTO_SCALING_GROUP, DIMENSION_CLUSTER_NAME, DIMENSION_INSTANCE_ID,
    DIMENSION_SERVICE_NAME, ERROR_COUNT_INCREMENT, METRIC_CPU_UTILIZATION, METRIC_ERROR_COUNT,
    METRIC_MEMORY_UTILIZATION, NAMESPACE_EC2, NAMESPACE_ECS,
};

/// The log-error alarm always uses a one-minute, single-period window and
/// fires on the first error. These do not follow the shared tuning.
pub const LOG_ALARM_PERIOD_SECS: u32 = 60;
pub const LOG_ALARM_EVALUATION_PERIODS: u32 = 1;
pub const LOG_ALARM_THRESHOLD: f64 = 0.0;

/// Resolve every alarm the config calls for.
pub fn resolve(config: &AlertConfig) -> Vec<AlarmSpec> {
    let mut alarms = Vec::new();

    if let Some(instance_id) = config.ec2_instance() {
        alarms.push(ec2_cpu_alarm(config, instance_id));
    }

    match config.ecs_target() {
        Some(EcsTarget::Cluster { cluster }) => {
            alarms.push(ecs_cluster_alarm(config, cluster, AlarmKind::EcsClusterCpu));
            alarms.push(ecs_cluster_alarm(config, cluster, AlarmKind::EcsClusterMemory));
        }
        Some(EcsTarget::Service { cluster, service }) => {
            alarms.push(ecs_service_alarm(config, cluster, service, AlarmKind::EcsServiceCpu));
            alarms.push(ecs_service_alarm(config, cluster, service, AlarmKind::EcsServiceMemory));
        }
        None => {}
    }

    if let Some(group) = config.as_group() {
        alarms.push(asg_cpu_alarm(config, group));
    }

    if let Some(log_group) = config.log_group() {
        alarms.push(log_error_alarm(config, log_group));
    }

    alarms
}

/// Metric filter feeding the log-error alarm, present iff a log group is set.
pub fn resolve_log_filter(config: &AlertConfig) -> Option<MetricFilterSpec> {
    let log_group = config.log_group()?;
    Some(MetricFilterSpec {
        log_group_name: log_group.to_string(),
        filter_pattern: config.log_error_filter.clone(),
        metric_namespace: error_namespace(&config.source),
        metric_name: METRIC_ERROR_COUNT.to_string(),
        metric_value: ERROR_COUNT_INCREMENT.to_string(),
    })
}

/// `{stage}-{source}-{slug}`.
fn alarm_name(config: &AlertConfig, kind: AlarmKind) -> String {
    format!("{}-{}-{}", config.stage, config.source, kind.slug())
}

/// Utilization alarm skeleton using the shared tuning.
fn utilization_alarm(
    config: &AlertConfig,
    kind: AlarmKind,
    namespace: &str,
    metric_name: &str,
    dimensions: Vec<Dimension>,
    subject: &str,
) -> AlarmSpec {
    let tuning = &config.tuning;
    AlarmSpec {
        kind,
        name: alarm_name(config, kind),
        description: format!(
            "{} ({}): {metric_name} of {subject} above {}% for {} x {}s",
            config.source,
            config.stage,
            tuning.threshold_percent,
            tuning.evaluation_periods,
            tuning.period_secs,
        ),
        namespace: namespace.to_string(),
        metric_name: metric_name.to_string(),
        dimensions,
        statistic: Statistic::Average,
        comparison: ComparisonOperator::GreaterThanThreshold,
        threshold: tuning.threshold_percent,
        period_secs: tuning.period_secs,
        evaluation_periods: tuning.evaluation_periods,
    }
}

fn ec2_cpu_alarm(config: &AlertConfig, instance_id: &str) -> AlarmSpec {
    utilization_alarm(
        config,
        AlarmKind::Ec2Cpu,
        NAMESPACE_EC2,
        METRIC_CPU_UTILIZATION,
        vec![Dimension::new(DIMENSION_INSTANCE_ID, instance_id)],
        &format!("EC2 instance {instance_id}"),
    )
}

fn ecs_cluster_alarm(config: &AlertConfig, cluster: &str, kind: AlarmKind) -> AlarmSpec {
    utilization_alarm(
        config,
        kind,
        NAMESPACE_ECS,
        ecs_metric(kind),
        vec![Dimension::new(DIMENSION_CLUSTER_NAME, cluster)],
        &format!("ECS cluster {cluster}"),
    )
}

fn ecs_service_alarm(
    config: &AlertConfig,
    cluster: &str,
    service: &str,
    kind: AlarmKind,
) -> AlarmSpec {
    utilization_alarm(
        config,
        kind,
        NAMESPACE_ECS,
        ecs_metric(kind),
        vec![
            Dimension::new(DIMENSION_CLUSTER_NAME, cluster),
            Dimension::new(DIMENSION_SERVICE_NAME, service),
        ],
        &format!("ECS service {service} in cluster {cluster}"),
    )
}

fn ecs_metric(kind: AlarmKind) -> &'static str {
    match kind {
        AlarmKind::EcsClusterMemory | AlarmKind::EcsServiceMemory => METRIC_MEMORY_UTILIZATION,
        _ => METRIC_CPU_UTILIZATION,
    }
}

fn asg_cpu_alarm(config: &AlertConfig, group: &str) -> AlarmSpec {
    utilization_alarm(
        config,
        AlarmKind::AutoScalingCpu,
        NAMESPACE_EC2,
        METRIC_CPU_UTILIZATION,
        vec![Dimension::new(DIMENSION_AUTO_SCALING_GROUP, group)],
        &format!("auto-scaling group {group}"),
    )
}

fn log_error_alarm(config: &AlertConfig, log_group: &str) -> AlarmSpec {
    let kind = AlarmKind::LogErrors;
    AlarmSpec {
        kind,
        name: alarm_name(config, kind),
        description: format!(
            "{} ({}): log lines matching '{}' in {log_group}",
            config.source, config.stage, config.log_error_filter,
        ),
        namespace: error_namespace(&config.source),
        metric_name: METRIC_ERROR_COUNT.to_string(),
        dimensions: Vec::new(),
        statistic: Statistic::Sum,
        comparison: ComparisonOperator::GreaterThanThreshold,
        threshold: LOG_ALARM_THRESHOLD,
        period_secs: LOG_ALARM_PERIOD_SECS,
        evaluation_periods: LOG_ALARM_EVALUATION_PERIODS,
    }
}
