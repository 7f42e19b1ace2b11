//! Integration tests for argument parsing and the file-producing commands.

use std::io::Write;

use alertstack_cli::cli::{Cli, Commands};
use alertstack_cli::commands::{execute, resolve_json, run};
use alertstack_cli::config::load_config;
use assert_matches::assert_matches;
use clap::Parser;

const PARAMS: &str = r#"[
  {"ParameterKey": "Source", "ParameterValue": "billing"},
  {"ParameterKey": "Stage", "ParameterValue": "prod"},
  {"ParameterKey": "SlackHookUrlBase64", "ParameterValue": "aHR0cHM6Ly9ob29rcy5zbGFjay5jb20vc2VydmljZXMvVDAwMC9CMDAwL1hYWFg="},
  {"ParameterKey": "ECSClusterName", "ParameterValue": "main"},
  {"ParameterKey": "ECSServiceName", "ParameterValue": "checkout"},
  {"ParameterKey": "CWLogGroupName", "ParameterValue": "/ecs/checkout"}
]"#;

fn params_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(PARAMS.as_bytes()).expect("write params");
    file
}

// ---------------------------------------------------------------------------
// Test: argument parsing
// ---------------------------------------------------------------------------

#[test]
fn deploy_defaults() {
    let cli = Cli::try_parse_from(["alertstack", "deploy"]).unwrap();
    assert_matches!(cli.command, Commands::Deploy(args) => {
        assert_eq!(args.timeout_secs, 1800);
        assert_eq!(args.poll_interval_secs, 5);
        assert!(!args.dry_run);
        assert!(args.stack_name.is_none());
    });
}

#[test]
fn global_flags_follow_subcommand() {
    let cli = Cli::try_parse_from([
        "alertstack",
        "resolve",
        "--no-env",
        "--param",
        "Stage=qa",
        "--param",
        "Source=billing",
    ])
    .unwrap();
    assert!(cli.no_env);
    assert_eq!(cli.overrides, vec!["Stage=qa", "Source=billing"]);
    assert_matches!(cli.command, Commands::Resolve);
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["alertstack", "destroy"]).is_err());
}

// ---------------------------------------------------------------------------
// Test: loading from a parameter file
// ---------------------------------------------------------------------------

#[test]
fn service_parameters_resolve_service_and_log_alarms() {
    let file = params_file();
    let path = file.path().to_str().unwrap();
    let cli = Cli::try_parse_from(["alertstack", "resolve", "--no-env", "--params", path]).unwrap();

    let config = load_config(&cli).unwrap();
    let json: serde_json::Value = serde_json::from_str(&resolve_json(&config).unwrap()).unwrap();

    let kinds: Vec<&str> = json["alarms"]
        .as_array()
        .unwrap()
        .iter()
        .map(|alarm| alarm["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["ecs_service_cpu", "ecs_service_memory", "log_errors"]);
    assert_eq!(json["metric_filter"]["log_group_name"], "/ecs/checkout");
}

#[test]
fn invalid_hook_fails_to_load() {
    let file = params_file();
    let path = file.path().to_str().unwrap();
    let cli = Cli::try_parse_from([
        "alertstack",
        "resolve",
        "--no-env",
        "--params",
        path,
        "--param",
        "SlackHookUrlBase64=bm90LWEtdXJs",
    ])
    .unwrap();

    assert!(load_config(&cli).is_err());
}

#[test]
fn missing_parameter_file_is_an_error() {
    let cli = Cli::try_parse_from([
        "alertstack",
        "plan",
        "--no-env",
        "--params",
        "/nonexistent/params.json",
    ])
    .unwrap();

    let err = load_config(&cli).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/params.json"));
}

// ---------------------------------------------------------------------------
// Test: render to file
// ---------------------------------------------------------------------------

#[tokio::test]
async fn render_writes_template_file() {
    let file = params_file();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("template.json");

    let cli = Cli::try_parse_from([
        "alertstack",
        "render",
        "--no-env",
        "--params",
        file.path().to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ])
    .unwrap();

    execute(cli).await.unwrap();

    let template: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");

    let resources = template["Resources"].as_object().unwrap();
    assert!(resources.contains_key("EcsServiceCpuAlarm"));
    assert!(resources.contains_key("EcsServiceMemoryAlarm"));
    assert!(!resources.contains_key("EcsClusterCpuAlarm"));
    assert_eq!(
        resources["LogErrorAlarm"]["DependsOn"],
        serde_json::json!(["LogErrorMetricFilter"])
    );
}

#[tokio::test]
async fn dry_run_deploy_succeeds_without_aws() {
    let file = params_file();
    let cli = Cli::try_parse_from([
        "alertstack",
        "deploy",
        "--dry-run",
        "--no-env",
        "--params",
        file.path().to_str().unwrap(),
    ])
    .unwrap();

    execute(cli).await.unwrap();
}

// ---------------------------------------------------------------------------
// Test: exit codes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_command_exits_with_one() {
    let cli = Cli::try_parse_from([
        "alertstack",
        "resolve",
        "--no-env",
        "--params",
        "/nonexistent/params.json",
    ])
    .unwrap();

    assert_eq!(run(cli).await, 1);
}

#[tokio::test]
async fn successful_command_exits_with_zero() {
    let file = params_file();
    let cli = Cli::try_parse_from([
        "alertstack",
        "plan",
        "--no-env",
        "--params",
        file.path().to_str().unwrap(),
    ])
    .unwrap();

    assert_eq!(run(cli).await, 0);
}
