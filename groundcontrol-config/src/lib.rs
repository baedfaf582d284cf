use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Pre-compiled regex for hostname validation (compiled once at first use)
static HOSTNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9\.]*[a-zA-Z0-9]$").unwrap());

/// Slugs end up in global ids and directory names.
static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]*$").unwrap());

/// Separator used inside global ids; must not appear in id segments.
const ID_DELIMITER: char = ':';

#[derive(Debug, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
    #[serde(default)]
    pub jobs: Option<JobsSection>,
    #[serde(default)]
    pub workspaces_root: Option<String>,
    #[serde(default)]
    pub workspaces: Option<Vec<WorkspaceConfig>>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct JobsSection {
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub subscriber_buffer: Option<usize>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load a RawConfigFile from a path. The format is inferred from the extension: .toml, .yaml/.yml, .json
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    parse_config_str(&s, ext.as_deref())
}

/// Parse configuration from a string with optional format hint
#[inline]
fn parse_config_str(s: &str, ext: Option<&str>) -> Result<RawConfigFile, ConfigError> {
    match ext {
        #[cfg(feature = "toml")]
        Some("toml") => toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        #[cfg(feature = "yaml")]
        Some("yaml" | "yml") => {
            serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        #[cfg(feature = "json")]
        Some("json") => serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => parse_config_auto(s),
    }
}

/// Try to parse config by attempting each enabled format
#[inline]
fn parse_config_auto(s: &str) -> Result<RawConfigFile, ConfigError> {
    #[cfg(feature = "yaml")]
    if let Ok(cfg) = serde_yaml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "toml")]
    if let Ok(cfg) = toml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "json")]
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(any(feature = "yaml", feature = "toml", feature = "json"))]
    {
        Err(ConfigError::Parse(
            "failed to parse config as any supported format".into(),
        ))
    }

    #[cfg(not(any(feature = "yaml", feature = "toml", feature = "json")))]
    {
        let _ = s;
        Err(ConfigError::Parse("no config format enabled".into()))
    }
}

/// Concrete application configuration with defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub jobs: JobsConfig,
    pub workspaces_root: PathBuf,
    pub workspaces: Vec<WorkspaceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobsConfig {
    /// Maximum number of jobs running at once.
    pub concurrency: usize,
    /// Events buffered per subscriber before the oldest are dropped.
    pub subscriber_buffer: usize,
}

/// A workspace declared in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub repository: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_branch() -> String {
    "master".to_string()
}

/// `~/groundcontrol/workspaces`, or a relative directory when there is no home.
pub fn default_workspaces_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("groundcontrol").join("workspaces"))
        .unwrap_or_else(|| PathBuf::from("groundcontrol").join("workspaces"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            jobs: JobsConfig {
                concurrency: 2,
                subscriber_buffer: 256,
            },
            workspaces_root: default_workspaces_root(),
            workspaces: Vec::new(),
        }
    }
}

#[inline]
fn parse_bool(s: &str) -> Result<bool, ()> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => Err(()),
    }
}

/// Helper macro to apply optional value if present
macro_rules! apply_opt {
    ($target:expr, $source:expr) => {
        if let Some(v) = $source {
            $target = v;
        }
    };
    ($target:expr, $source:expr, into) => {
        if let Some(v) = $source {
            $target = v.into();
        }
    };
}

/// Load concrete `Config` from optional file and environment variables.
/// Environment variables take precedence over file values and defaults.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = path {
        let raw = load_raw_from_file(p)?;
        if let Some(server) = raw.server {
            apply_opt!(cfg.server.host, server.host);
            apply_opt!(cfg.server.port, server.port);
        }
        if let Some(logging) = raw.logging {
            apply_opt!(cfg.logging.level, logging.level);
            apply_opt!(cfg.logging.json, logging.json);
        }
        if let Some(jobs) = raw.jobs {
            apply_opt!(cfg.jobs.concurrency, jobs.concurrency);
            apply_opt!(cfg.jobs.subscriber_buffer, jobs.subscriber_buffer);
        }
        apply_opt!(cfg.workspaces_root, raw.workspaces_root, into);
        apply_opt!(cfg.workspaces, raw.workspaces);
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

/// Helper to parse env var as a specific type
#[inline]
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Parse(format!("invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Helper to parse env var as bool
#[inline]
fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(v) => parse_bool(&v)
            .map(Some)
            .map_err(|_| ConfigError::Parse(format!("invalid {}", key))),
        Err(_) => Ok(None),
    }
}

/// Helper to get env var as string
#[inline]
fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Apply all environment variable overrides to config
fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    // Server
    if let Some(v) = env_str("GROUNDCONTROL_SERVER_HOST") {
        cfg.server.host = v;
    }
    if let Some(v) = env_parse::<u16>("GROUNDCONTROL_SERVER_PORT")? {
        cfg.server.port = v;
    }

    // Logging
    if let Some(v) = env_str("GROUNDCONTROL_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_bool("GROUNDCONTROL_LOG_JSON")? {
        cfg.logging.json = v;
    }

    // Jobs
    if let Some(v) = env_parse::<usize>("GROUNDCONTROL_JOBS_CONCURRENCY")? {
        cfg.jobs.concurrency = v;
    }
    if let Some(v) = env_parse::<usize>("GROUNDCONTROL_JOBS_SUBSCRIBER_BUFFER")? {
        cfg.jobs.subscriber_buffer = v;
    }

    // Workspaces
    if let Some(v) = env_str("GROUNDCONTROL_WORKSPACES_ROOT") {
        cfg.workspaces_root = PathBuf::from(v);
    }

    Ok(())
}

fn validate_segment(value: &str, what: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{} must not be empty", what)));
    }
    if value.contains(ID_DELIMITER) {
        return Err(ConfigError::Validation(format!(
            "{} must not contain '{}': {}",
            what, ID_DELIMITER, value
        )));
    }
    Ok(())
}

/// Validate higher-level constraints on the resolved configuration.
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.server.port == 0 {
        return Err(ConfigError::Validation("server.port must be > 0".into()));
    }
    let host_ok = cfg.server.host.parse::<std::net::IpAddr>().is_ok()
        || HOSTNAME_REGEX.is_match(&cfg.server.host);
    if !host_ok {
        return Err(ConfigError::Validation(format!(
            "invalid server.host: {}",
            cfg.server.host
        )));
    }

    if cfg.jobs.concurrency == 0 {
        return Err(ConfigError::Validation(
            "jobs.concurrency must be >= 1".into(),
        ));
    }
    if cfg.jobs.subscriber_buffer == 0 {
        return Err(ConfigError::Validation(
            "jobs.subscriber_buffer must be >= 1".into(),
        ));
    }

    let mut slugs = HashSet::new();
    for ws in &cfg.workspaces {
        validate_segment(&ws.slug, "workspace slug")?;
        if !SLUG_REGEX.is_match(&ws.slug) {
            return Err(ConfigError::Validation(format!(
                "invalid workspace slug: {}",
                ws.slug
            )));
        }
        if !slugs.insert(ws.slug.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate workspace slug: {}",
                ws.slug
            )));
        }

        let mut projects = HashSet::new();
        for project in &ws.projects {
            if project.repository.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "workspace {} has a project without repository",
                    ws.slug
                )));
            }
            validate_segment(&project.branch, "project branch")?;
            if !projects.insert((project.repository.as_str(), project.branch.as_str())) {
                return Err(ConfigError::Validation(format!(
                    "duplicate project {}@{} in workspace {}",
                    project.repository, project.branch, ws.slug
                )));
            }
        }
    }
    Ok(())
}
