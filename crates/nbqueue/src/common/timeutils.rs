use std::time::Duration;

crate::arg_wrapper!(ArgDuration, Duration, humantime::parse_duration);

/// Parses a human readable duration (e.g. `90s` or `5m`) used in run definition files.
pub fn parse_human_time(value: &str) -> anyhow::Result<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| anyhow::anyhow!("Invalid duration `{value}`: {e}"))
}
