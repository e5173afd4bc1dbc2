use std::ffi::OsString;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::ObservabilityOptions;
use crate::errors::ConfigError;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Installs the process-wide subscriber from the `AGENT_RELAY_*` logging
/// variables. See `ObservabilityOptions::from_env`.
pub fn init_observability() -> Result<(), ConfigError> {
    install(&ObservabilityOptions::from_env()?)
}

/// Installs the subscriber described by `options`. Only the first
/// successful call has an effect.
///
/// If another subscriber already owns the global slot it is left in place.
pub fn install(options: &ObservabilityOptions) -> Result<(), ConfigError> {
    INSTALLED
        .get_or_try_init(|| {
            if !options.enabled {
                return Ok(());
            }
            let filter = env_filter(options.filter.as_deref())?;
            let installed = match &options.json_log_path {
                Some(path) => {
                    let (dir, file_name) = split_log_path(path)?;
                    std::fs::create_dir_all(&dir).map_err(|err| {
                        ConfigError::invalid("json_log_path", format!("{}: {err}", dir.display()))
                    })?;
                    let jsonl = tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_writer(tracing_appender::rolling::never(dir, file_name));
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(jsonl)
                        .try_init()
                }
                None => {
                    let console = tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stdout);
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(console)
                        .try_init()
                }
            };
            if let Err(err) = installed {
                tracing::debug!(error = %err, "keeping the subscriber that is already installed");
            }
            Ok(())
        })
        .map(|_| ())
}

fn env_filter(directives: Option<&str>) -> Result<EnvFilter, ConfigError> {
    match directives {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|err| ConfigError::invalid("log_level", err.to_string())),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

// `rolling::never` wants the directory and file name apart.
fn split_log_path(path: &Path) -> Result<(PathBuf, OsString), ConfigError> {
    let file_name = path.file_name().ok_or_else(|| {
        ConfigError::invalid("json_log_path", format!("{} does not name a file", path.display()))
    })?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((dir.to_path_buf(), file_name.to_os_string()))
}
