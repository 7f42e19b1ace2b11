//! Shared validation helpers.
//!
//! Range and format checks that the `validator` derive on
//! [`crate::config::AlertConfig`] cannot express on its own.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use crate::error::CoreError;

/// Periods CloudWatch accepts below one minute (high-resolution metrics).
const SUB_MINUTE_PERIODS: &[u32] = &[10, 30];

/// Maximum CloudFormation stack name length.
pub const MAX_STACK_NAME_LEN: usize = 128;

static STACK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("valid stack name regex"));

/// Validate a CloudWatch alarm period: 10, 30, or any positive multiple of 60.
pub fn validate_alarm_period(period_secs: u32) -> Result<(), CoreError> {
    if SUB_MINUTE_PERIODS.contains(&period_secs) || (period_secs > 0 && period_secs % 60 == 0) {
        return Ok(());
    }
    Err(CoreError::Validation(format!(
        "AlarmPeriod must be 10, 30 or a multiple of 60 seconds, got {period_secs}"
    )))
}

/// Decode the base64 Slack hook parameter and check it is an `https://` URL.
///
/// Returns the decoded URL on success.
pub fn decode_slack_hook(encoded: &str) -> Result<String, CoreError> {
    let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
        CoreError::Validation(format!("SlackHookUrlBase64 is not valid base64: {e}"))
    })?;
    let url = String::from_utf8(bytes).map_err(|_| {
        CoreError::Validation("SlackHookUrlBase64 does not decode to UTF-8 text".into())
    })?;
    if !url.starts_with("https://") {
        return Err(CoreError::Validation(
            "SlackHookUrlBase64 must decode to an https:// URL".into(),
        ));
    }
    Ok(url)
}

/// Whether `name` is a legal CloudFormation stack name.
pub fn is_valid_stack_name(name: &str) -> bool {
    name.len() <= MAX_STACK_NAME_LEN && STACK_NAME.is_match(name)
}

/// Coerce arbitrary text into a legal stack name.
///
/// Characters outside `[A-Za-z0-9-]` become `-`, a leading non-letter gets an
/// `s-` prefix, and the result is cut to [`MAX_STACK_NAME_LEN`].
pub fn sanitize_stack_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();

    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name.insert_str(0, "s-");
    }

    name.truncate(MAX_STACK_NAME_LEN);
    name
}

/// Coerce text into an SNS topic / Lambda function name: `[A-Za-z0-9_-]`,
/// at most `max_len` characters.
pub fn sanitize_resource_name(raw: &str, max_len: usize) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .take(max_len)
        .collect()
}
