// Configuration source loading.
//
// Priority order:
// 1. Environment variables (GBQ_TOOLKIT_* prefix)
// 2. Config file path from --config, then GBQ_TOOLKIT_CONFIG
// 3. Inline config content from GBQ_TOOLKIT_CONFIG_CONTENT
// 4. Default config file (./gbq-toolkit.toml)
// 5. Built-in defaults
//
// CLI flags other than --config are applied by the binary on top of this.

use std::env;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::debug;

use super::{AppConfig, Destination, LogFormat, DEFAULT_CONFIG_FILE};

pub const ENV_PREFIX: &str = "GBQ_TOOLKIT_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own values without touching the process environment.
pub trait EnvSource {
    /// Looks up `GBQ_TOOLKIT_{key}`.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

/// Loads configuration from files and the given environment.
pub fn load_with_env<E: EnvSource>(explicit_path: Option<&Path>, env: &E) -> Result<AppConfig> {
    let mut config = load_from_file(explicit_path, env)?.unwrap_or_default();
    apply_env_overrides(&mut config, env)?;
    Ok(config)
}

fn load_from_file<E: EnvSource>(explicit_path: Option<&Path>, env: &E) -> Result<Option<AppConfig>> {
    if let Some(path) = explicit_path {
        return parse_file(path).map(Some);
    }

    if let Some(path) = env.get("CONFIG") {
        return parse_file(Path::new(&path)).map(Some);
    }

    if let Some(content) = env.get("CONFIG_CONTENT") {
        let config: AppConfig = toml::from_str(&content)
            .context("Failed to parse inline config from GBQ_TOOLKIT_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        return parse_file(default_path).map(Some);
    }

    Ok(None)
}

fn parse_file(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Apply environment-variable overrides (highest priority after CLI flags).
pub fn apply_env_overrides<E: EnvSource>(config: &mut AppConfig, env: &E) -> Result<()> {
    // Server
    if let Some(addr) = get_env_string(env, "LISTEN_ADDR") {
        config.server.listen_addr = addr;
    }
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.server.log_level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.server.log_format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => bail!(
                "{}LOG_FORMAT must be 'text' or 'json', got '{}'",
                ENV_PREFIX,
                other
            ),
        };
    }
    if let Some(raw) = get_env_string(env, "MAX_UPLOAD_BYTES") {
        config.server.max_upload_bytes = raw
            .parse()
            .with_context(|| format!("{}MAX_UPLOAD_BYTES must be a byte count, got '{}'", ENV_PREFIX, raw))?;
    }

    // Ingest
    if let Some(project) = get_env_string(env, "PROJECT_ID") {
        config.ingest.project_id = Some(project);
    }
    if let Some(table_id) = get_env_string(env, "TABLE_ID") {
        config.ingest.destination = Destination::Fixed { table_id };
    }
    if let Some(location) = get_env_string(env, "LOCATION") {
        config.ingest.location = Some(location);
    }

    Ok(())
}

/// Blank values count as unset.
fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
