//! Invocation settings.
//!
//! One [`Settings`] value is resolved at startup and handed to the factory,
//! formatter, transport factory and sender. Layers, lowest first:
//!
//! 1. built-in defaults
//! 2. config file (`--config`, else the first of `~/.cdevents-cli.toml`,
//!    `~/.cdevents-cli.yaml` or `~/.cdevents-cli.yml` that exists); files
//!    ending in `.yaml`/`.yml` are read as YAML, anything else as TOML
//! 3. `CDEVENTS_*` environment variables
//! 4. command-line flags (applied by the binary)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cdevents_transport::{HttpOptions, RetryPolicy};
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// Path reported for parse errors in text not read from a file
const INLINE: &str = "<inline>";
use crate::output::OutputFormat;

/// File name looked up in the home directory
pub const DEFAULT_CONFIG_FILE: &str = ".cdevents-cli.toml";

/// Home-directory candidates, in lookup order
pub const HOME_CONFIG_FILES: [&str; 3] = [
    DEFAULT_CONFIG_FILE,
    ".cdevents-cli.yaml",
    ".cdevents-cli.yml",
];

const ENV_SOURCE: &str = "CDEVENTS_SOURCE";
const ENV_TARGET: &str = "CDEVENTS_TARGET";
const ENV_RETRIES: &str = "CDEVENTS_RETRIES";
const ENV_TIMEOUT: &str = "CDEVENTS_TIMEOUT";
const ENV_OUTPUT: &str = "CDEVENTS_OUTPUT";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Event source URI
    pub source: String,
    /// Destination descriptors; empty means console
    pub targets: Vec<String>,
    pub retries: u32,
    /// Deadline for the whole delivery
    pub timeout: Duration,
    pub output: OutputFormat,
    /// Extra HTTP headers
    pub headers: BTreeMap<String, String>,
    /// Fan out to several targets concurrently
    pub parallel_fanout: bool,
    /// Base retry delay; zero retries immediately
    pub backoff: Duration,
    /// HTTP `User-Agent` override
    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source: default_source(local_hostname().as_deref()),
            targets: Vec::new(),
            retries: 3,
            timeout: Duration::from_secs(30),
            output: OutputFormat::default(),
            headers: BTreeMap::new(),
            parallel_fanout: false,
            backoff: Duration::ZERO,
            user_agent: None,
        }
    }
}

/// Syntax of a settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// `.yaml` and `.yml` are YAML; everything else is TOML.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Toml,
        }
    }
}

/// On-disk shape; every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    source: Option<String>,
    targets: Option<Vec<String>>,
    retries: Option<u32>,
    timeout: Option<String>,
    output: Option<OutputFormat>,
    headers: BTreeMap<String, String>,
    parallel_fanout: Option<bool>,
    backoff: Option<String>,
    user_agent: Option<String>,
}

impl Settings {
    /// Resolve defaults, config file and process environment.
    ///
    /// An explicit `path` must exist; the home-directory files are optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, dirs::home_dir().as_deref(), |key| std::env::var(key).ok())
    }

    /// [`Settings::load`] with the home directory and environment supplied.
    pub fn load_with<F>(path: Option<&Path>, home: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => home.and_then(find_home_config),
        };
        if let Some(file) = file {
            settings.apply_file(&file)?;
        }

        settings.apply_env(lookup)?;
        Ok(settings)
    }

    /// Overlay values from a TOML or YAML file, chosen by extension.
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let format = ConfigFormat::for_path(path);
        let applied = match format {
            ConfigFormat::Toml => self.apply_toml(&contents),
            ConfigFormat::Yaml => self.apply_yaml(&contents),
        };
        applied.map_err(|err| err.at_path(path))?;
        debug!(path = %path.display(), ?format, "loaded config file");
        Ok(())
    }

    /// Overlay values from TOML text.
    pub fn apply_toml(&mut self, contents: &str) -> Result<(), ConfigError> {
        let file: SettingsFile = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: INLINE.to_string(),
            source,
        })?;
        self.apply_settings_file(file)
    }

    /// Overlay values from YAML text; an empty document changes nothing.
    pub fn apply_yaml(&mut self, contents: &str) -> Result<(), ConfigError> {
        if contents.trim().is_empty() {
            return Ok(());
        }
        let file: SettingsFile = serde_yaml::from_str(contents).map_err(|source| ConfigError::ParseYaml {
            path: INLINE.to_string(),
            source,
        })?;
        self.apply_settings_file(file)
    }

    fn apply_settings_file(&mut self, file: SettingsFile) -> Result<(), ConfigError> {
        if let Some(source) = file.source {
            self.source = source;
        }
        if let Some(targets) = file.targets {
            self.targets = targets;
        }
        if let Some(retries) = file.retries {
            self.retries = retries;
        }
        if let Some(timeout) = file.timeout {
            self.timeout = parse_duration(&timeout).map_err(|r| ConfigError::invalid("timeout", &timeout, r))?;
        }
        if let Some(output) = file.output {
            self.output = output;
        }
        self.headers.extend(file.headers);
        if let Some(parallel) = file.parallel_fanout {
            self.parallel_fanout = parallel;
        }
        if let Some(backoff) = file.backoff {
            self.backoff = parse_duration(&backoff).map_err(|r| ConfigError::invalid("backoff", &backoff, r))?;
        }
        if let Some(agent) = file.user_agent.filter(|a| !a.trim().is_empty()) {
            self.user_agent = Some(agent);
        }
        Ok(())
    }

    /// Overlay `CDEVENTS_*` variables using `lookup` to read them.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(source) = get(ENV_SOURCE) {
            self.source = source;
        }
        if let Some(targets) = get(ENV_TARGET) {
            self.targets = split_targets(&targets);
        }
        if let Some(retries) = get(ENV_RETRIES) {
            self.retries = retries
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_RETRIES, &retries, "expected a non-negative integer"))?;
        }
        if let Some(timeout) = get(ENV_TIMEOUT) {
            self.timeout = parse_duration(&timeout).map_err(|r| ConfigError::invalid(ENV_TIMEOUT, &timeout, r))?;
        }
        if let Some(output) = get(ENV_OUTPUT) {
            self.output = output
                .parse()
                .map_err(|e: crate::error::OutputError| ConfigError::invalid(ENV_OUTPUT, &output, e.to_string()))?;
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries)
            .with_timeout((!self.timeout.is_zero()).then_some(self.timeout))
            .with_backoff(self.backoff)
    }

    /// Each HTTP request is also capped at the overall timeout.
    pub fn http_options(&self) -> HttpOptions {
        let defaults = HttpOptions::default();
        HttpOptions {
            headers: self.headers.clone(),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            request_timeout: (!self.timeout.is_zero()).then_some(self.timeout),
        }
    }
}

/// `cdevents-cli/<host>`, or plain `cdevents-cli` without a host name
pub fn default_source(hostname: Option<&str>) -> String {
    match hostname.map(str::trim).filter(|h| !h.is_empty()) {
        Some(host) => format!("cdevents-cli/{host}"),
        None => "cdevents-cli".to_string(),
    }
}

/// Split a comma-separated target list, dropping blanks.
pub fn split_targets(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `500ms`, `30s`, `5m`, `1h` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);

    if digits.is_empty() {
        return Err("expected a number followed by ms, s, m or h".to_string());
    }
    let n: u64 = digits.parse().map_err(|_| "number out of range".to_string())?;

    match unit.trim() {
        "" | "s" => Ok(Duration::from_secs(n)),
        "ms" => Ok(Duration::from_millis(n)),
        "m" => Ok(Duration::from_secs(n.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(n.saturating_mul(3600))),
        other => Err(format!("unknown duration unit {other:?}")),
    }
}

/// Parse a `key=value` header argument.
pub fn parse_header(input: &str) -> Result<(String, String), ConfigError> {
    match input.split_once(['=', ':']) {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ConfigError::invalid("header", input, "expected key=value")),
    }
}

/// This machine's host name, when it is valid UTF-8
pub fn local_hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

fn find_home_config(home: &Path) -> Option<PathBuf> {
    HOME_CONFIG_FILES
        .iter()
        .map(|name| home.join(name))
        .find(|p| p.is_file())
}
