use std::path::{Path, PathBuf};
use std::time::Duration;

/// Loads `.env` from the working directory, then the one next to this
/// crate's manifest. Variables already set are never overwritten, so the
/// first file to define a key wins. Returns the files that were read.
pub fn init() -> Result<Vec<PathBuf>, dotenvy::Error> {
    load_env_files([
        PathBuf::from(".env"),
        Path::new(env!("CARGO_MANIFEST_DIR")).join(".env"),
    ])
}

fn load_env_files(paths: impl IntoIterator<Item = PathBuf>) -> Result<Vec<PathBuf>, dotenvy::Error> {
    let mut loaded = Vec::new();
    for path in paths {
        match dotenvy::from_path(&path) {
            Ok(()) => loaded.push(path),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err),
        }
    }
    Ok(loaded)
}

/// Reads and parses an environment variable, logging unparsable values.
pub fn get_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment value");
            None
        }
    }
}

/// Delay between scripted agent steps (`AGENT_RELAY_DEMO_STEP_MS`, default 300 ms).
pub fn step_delay() -> Duration {
    Duration::from_millis(get_env("AGENT_RELAY_DEMO_STEP_MS").unwrap_or(300))
}

/// Paywalled URL used by the payment demo (`X402_DEMO_URL`).
pub fn paywalled_url() -> String {
    get_env("X402_DEMO_URL").unwrap_or_else(|| "https://www.x402.org/protected".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let present = dir.path().join("demo.env");
        std::fs::write(&present, "AGENT_RELAY_DEMO_CONFIG_TEST=from-file\n").expect("write env");

        let loaded = load_env_files([dir.path().join("missing.env"), present.clone()])
            .expect("loads");
        assert_eq!(loaded, vec![present]);
        assert_eq!(
            get_env::<String>("AGENT_RELAY_DEMO_CONFIG_TEST").as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn malformed_env_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let broken = dir.path().join("broken.env");
        std::fs::write(&broken, "NOT VALID LINE\n").expect("write env");
        assert!(load_env_files([broken]).is_err());
    }
}
