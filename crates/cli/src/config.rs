//! Parameter loading for the CLI.
//!
//! Sources are layered, later ones winning:
//!
//! | Source                      | Example                                   |
//! |-----------------------------|-------------------------------------------|
//! | `--params FILE`             | `{"Source": "billing", "Stage": "prod"}`  |
//! | environment (and `.env`)    | `ECS_CLUSTER_NAME=main`                   |
//! | `--param KEY=VALUE`         | `--param AlarmThreshold=90`               |

use anyhow::Context;

use alertstack_core::config::AlertConfig;
use alertstack_core::error::CoreError;
use alertstack_core::parameters::ParameterSet;

use crate::cli::Cli;

/// Merge the parameter sources in precedence order.
pub fn collect_parameters(
    file_text: Option<&str>,
    env: ParameterSet,
    overrides: &[String],
) -> Result<ParameterSet, CoreError> {
    let mut params = match file_text {
        Some(text) => ParameterSet::from_json(text)?,
        None => ParameterSet::new(),
    };

    params.merge(env);

    let mut flags = ParameterSet::new();
    for raw in overrides {
        let (key, value) = ParameterSet::parse_assignment(raw)?;
        flags.insert(key, value)?;
    }
    params.merge(flags);

    Ok(params)
}

/// Load and validate the alert config described by the CLI flags.
pub fn load_config(cli: &Cli) -> anyhow::Result<AlertConfig> {
    let file_text = cli
        .params
        .as_ref()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read parameter file {}", path.display()))
        })
        .transpose()?;

    let env = if cli.no_env {
        ParameterSet::new()
    } else {
        ParameterSet::from_env()
    };

    let params = collect_parameters(file_text.as_deref(), env, &cli.overrides)?;
    tracing::debug!(count = params.len(), "Collected parameters");

    let config = params.to_config()?;
    config.validate_config()?;

    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn flags_override_env_which_overrides_file() {
        let file = r#"{"Source": "from-file", "Stage": "file", "SlackChannel": "file"}"#;
        let env = ParameterSet::from_env_with(|key| match key {
            "STAGE" => Some("env".into()),
            "SLACK_CHANNEL" => Some("env".into()),
            _ => None,
        });
        let overrides = vec!["SlackChannel=flag".to_string()];

        let params = collect_parameters(Some(file), env, &overrides).unwrap();
        assert_eq!(params.get("Source"), Some("from-file"));
        assert_eq!(params.get("Stage"), Some("env"));
        assert_eq!(params.get("SlackChannel"), Some("flag"));
    }

    #[test]
    fn unknown_override_is_rejected() {
        let result = collect_parameters(None, ParameterSet::new(), &["Bogus=1".to_string()]);
        assert_matches!(result, Err(CoreError::UnknownParameter(name)) if name == "Bogus");
    }

    #[test]
    fn malformed_file_is_rejected() {
        let result = collect_parameters(Some("not json"), ParameterSet::new(), &[]);
        assert_matches!(result, Err(CoreError::Serialization(_)));
    }
}
