//! Tuning defaults loaded from the user's config file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use appcenter_core::retry::RetryPolicy;
use appcenter_core::settings::{MAX_CHUNK_CONCURRENCY, PollSettings, UploadSettings};
use appcenter_core::transport::TransportConfig;
use appcenter_core::transport::constants::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};

/// `key = value` file configuration for upload tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Attempts per request, including the first.
    pub retry_attempts: Option<u32>,
    /// First backoff delay in milliseconds.
    pub retry_base_delay_ms: Option<u64>,
    /// Backoff cap in milliseconds.
    pub retry_max_delay_ms: Option<u64>,
    /// Seconds between processing status polls.
    pub poll_interval_secs: Option<u64>,
    /// Ceiling on total processing wait in seconds.
    pub poll_timeout_secs: Option<u64>,
    /// Chunks in flight at once.
    pub chunk_concurrency: Option<usize>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Service base URL.
    pub base_url: Option<String>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        validate_range("retry_attempts", self.retry_attempts.map(u64::from), 1, 10)?;
        validate_range("retry_base_delay_ms", self.retry_base_delay_ms, 0, 60_000)?;
        validate_range("retry_max_delay_ms", self.retry_max_delay_ms, 1, 300_000)?;
        validate_range("poll_interval_secs", self.poll_interval_secs, 1, 300)?;
        validate_range("poll_timeout_secs", self.poll_timeout_secs, 1, 7200)?;
        validate_range(
            "chunk_concurrency",
            self.chunk_concurrency.map(|n| n as u64),
            1,
            MAX_CHUNK_CONCURRENCY as u64,
        )?;
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600)?;
        validate_range("request_timeout_secs", self.request_timeout_secs, 1, 3600)?;

        if let (Some(interval), Some(timeout)) = (self.poll_interval_secs, self.poll_timeout_secs) {
            if timeout < interval {
                bail!(
                    "Invalid config: `poll_timeout_secs` ({timeout}) is shorter than `poll_interval_secs` ({interval})"
                );
            }
        }
        Ok(())
    }

    /// Library settings with this file's overrides applied to the defaults.
    #[must_use]
    pub fn upload_settings(&self) -> UploadSettings {
        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::new(
            self.retry_attempts.unwrap_or(defaults.max_attempts()),
            self.retry_base_delay_ms
                .map_or(defaults.base_delay(), Duration::from_millis),
            self.retry_max_delay_ms
                .map_or(defaults.max_delay(), Duration::from_millis),
            2.0,
        );

        let poll_defaults = PollSettings::default();
        let poll = PollSettings {
            interval: self
                .poll_interval_secs
                .map_or(poll_defaults.interval, Duration::from_secs),
            max_wait: self
                .poll_timeout_secs
                .map_or(poll_defaults.max_wait, Duration::from_secs),
            retry: poll_defaults.retry,
        };

        let settings = UploadSettings::default().with_retry(retry).with_poll(poll);
        match self.chunk_concurrency {
            Some(concurrency) => settings.with_chunk_concurrency(concurrency),
            None => settings,
        }
    }

    /// Applies the timeout overrides to `config`.
    #[must_use]
    pub fn apply_timeouts(&self, config: TransportConfig) -> TransportConfig {
        let connect = self.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS);
        let request = self.request_timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS);
        config.with_timeouts(Duration::from_secs(connect), Duration::from_secs(request))
    }
}

fn validate_range(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config, or defaults when no file exists.
    pub config: FileConfig,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/appcenter-upload/config.toml`
/// 2. `$HOME/.config/appcenter-upload/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("appcenter-upload")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("appcenter-upload")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` if given, else from the default path if present.
pub fn load_file_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(resolve_default_config_path);
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig {
            path,
            config: FileConfig::default(),
            loaded_from_file: false,
        });
    };

    if explicit.is_none() && !path_ref.exists() {
        return Ok(LoadedConfig {
            path,
            config: FileConfig::default(),
            loaded_from_file: false,
        });
    }

    let raw = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file '{}'", path_ref.display()))?;
    let config = parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path_ref.display()))?;
    Ok(LoadedConfig {
        path,
        config,
        loaded_from_file: true,
    })
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "retry_attempts" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.retry_attempts = Some(
                    u32::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("retry_attempts out of range for u32"))?,
                );
            }
            "retry_base_delay_ms" => {
                cfg.retry_base_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "retry_max_delay_ms" => {
                cfg.retry_max_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "poll_interval_secs" => {
                cfg.poll_interval_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "poll_timeout_secs" => {
                cfg.poll_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "chunk_concurrency" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.chunk_concurrency = Some(
                    usize::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("chunk_concurrency out of range for usize"))?,
                );
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "request_timeout_secs" => {
                cfg.request_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "base_url" => {
                cfg.base_url = Some(parse_string_literal(value).with_context(invalid)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}
