use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ConfigError;

/// Default idle budget handed to the task and used to bound polling.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Default bounded wait for a single queue pop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const TIMEOUT_SECS_ENV: &str = "AGENT_RELAY_STREAM_TIMEOUT_SECS";
const POLL_INTERVAL_MS_ENV: &str = "AGENT_RELAY_POLL_INTERVAL_MS";
const OBSERVABILITY_ENV: [&str; 2] = [
    "AGENT_RELAY_OBSERVABILITY_ENABLED",
    "AGENT_RELAY_OBSERVABILITY",
];
const LOG_LEVEL_ENV: &str = "AGENT_RELAY_LOG_LEVEL";
const JSON_LOG_PATH_ENV: &str = "AGENT_RELAY_JSON_LOG_PATH";

/// Per-run options for `StreamCoordinator`.
///
/// `timeout` is not a deadline for the run. It is threaded to the task
/// through `RunContext` and caps the length of one idle poll slice.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CollectOptions {
    /// Per-run timeout made available to the task.
    pub timeout: Duration,
    /// Bounded wait for one queue pop before completion is re-checked.
    pub poll_interval: Duration,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl CollectOptions {
    /// Overrides the per-run timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the poll slice.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Builds options from `AGENT_RELAY_STREAM_TIMEOUT_SECS` and
    /// `AGENT_RELAY_POLL_INTERVAL_MS`, keeping defaults for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut options = Self::default();
        if let Some(secs) = parse_u64(&lookup, TIMEOUT_SECS_ENV)? {
            options.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_u64(&lookup, POLL_INTERVAL_MS_ENV)? {
            options.poll_interval = Duration::from_millis(ms);
        }
        options.validate()?;
        Ok(options)
    }

    /// Rejects zero durations, which would turn the drain loop into a spin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid("timeout", "must be greater than 0"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::invalid(
                "poll_interval",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Effective wait for one pop: the poll interval, capped by the timeout.
    pub fn poll_slice(&self) -> Duration {
        self.poll_interval.min(self.timeout)
    }
}

/// Logging setup consumed by `observability::install`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservabilityOptions {
    pub enabled: bool,
    /// `EnvFilter` directives. `None` defers to `RUST_LOG`, then `info`.
    pub filter: Option<String>,
    /// JSONL output file. `None` logs compactly to stdout.
    pub json_log_path: Option<PathBuf>,
}

impl Default for ObservabilityOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: None,
            json_log_path: None,
        }
    }
}

impl ObservabilityOptions {
    /// Reads `AGENT_RELAY_OBSERVABILITY_ENABLED` (or `AGENT_RELAY_OBSERVABILITY`),
    /// `AGENT_RELAY_LOG_LEVEL` and `AGENT_RELAY_JSON_LOG_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut options = Self::default();
        if let Some((key, raw)) = OBSERVABILITY_ENV
            .into_iter()
            .find_map(|key| non_blank(&lookup, key).map(|raw| (key, raw)))
        {
            options.enabled = parse_flag(&raw).ok_or(ConfigError::Env { key, value: raw })?;
        }
        options.filter = non_blank(&lookup, LOG_LEVEL_ENV);
        options.json_log_path = non_blank(&lookup, JSON_LOG_PATH_ENV).map(PathBuf::from);
        Ok(options)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn non_blank(lookup: &impl Fn(&'static str) -> Option<String>, key: &'static str) -> Option<String> {
    lookup(key)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_u64(
    lookup: &impl Fn(&'static str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = CollectOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(120));
        assert_eq!(options.poll_slice(), Duration::from_millis(500));
    }

    #[test]
    fn poll_slice_is_capped_by_timeout() {
        let options = CollectOptions::default().timeout(Duration::from_millis(100));
        assert_eq!(options.poll_slice(), Duration::from_millis(100));
    }

    #[test]
    fn lookup_overrides_and_validates() {
        let options = CollectOptions::from_lookup(|key| match key {
            TIMEOUT_SECS_ENV => Some("30".into()),
            POLL_INTERVAL_MS_ENV => Some(" 250 ".into()),
            _ => None,
        })
        .expect("valid env");
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.poll_interval, Duration::from_millis(250));

        let err = CollectOptions::from_lookup(|key| {
            (key == POLL_INTERVAL_MS_ENV).then(|| "soon".to_string())
        });
        assert!(matches!(err, Err(ConfigError::Env { key, .. }) if key == POLL_INTERVAL_MS_ENV));

        let err = CollectOptions::from_lookup(|key| {
            (key == TIMEOUT_SECS_ENV).then(|| "0".to_string())
        });
        assert!(matches!(err, Err(ConfigError::Invalid { name: "timeout", .. })));
    }

    #[test]
    fn observability_defaults_to_console_logging() {
        let options = ObservabilityOptions::from_lookup(|_| None).expect("defaults");
        assert_eq!(options, ObservabilityOptions::default());
        assert!(options.enabled);
    }

    #[test]
    fn observability_lookup_reads_flag_filter_and_path() {
        let options = ObservabilityOptions::from_lookup(|key| match key {
            "AGENT_RELAY_OBSERVABILITY" => Some(" Off ".into()),
            LOG_LEVEL_ENV => Some("agent_relay_stream=debug".into()),
            JSON_LOG_PATH_ENV => Some("logs/relay.jsonl".into()),
            _ => None,
        })
        .expect("valid env");
        assert!(!options.enabled);
        assert_eq!(options.filter.as_deref(), Some("agent_relay_stream=debug"));
        assert_eq!(options.json_log_path, Some(PathBuf::from("logs/relay.jsonl")));

        let options = ObservabilityOptions::from_lookup(|key| {
            (key == "AGENT_RELAY_OBSERVABILITY_ENABLED").then(|| "yes".to_string())
        })
        .expect("valid env");
        assert!(options.enabled);
    }

    #[test]
    fn unreadable_observability_flag_is_reported() {
        let err = ObservabilityOptions::from_lookup(|key| {
            (key == "AGENT_RELAY_OBSERVABILITY_ENABLED").then(|| "maybe".to_string())
        });
        assert!(matches!(
            err,
            Err(ConfigError::Env { key: "AGENT_RELAY_OBSERVABILITY_ENABLED", value }) if value == "maybe"
        ));
    }
}
