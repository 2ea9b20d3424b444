//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{collections::HashMap, num::NonZeroUsize, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use globset::Glob;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

mod cli;

pub use cli::{CliArgs, Command, ResolveArgs, ResolveOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "collate";
const DEFAULT_FILE_SET_CACHE_LIMIT: usize = 256;
const DEFAULT_RESOURCES_ROOT: &str = ".";
const DEFAULT_CONTROLLER_MAPPING: &str = "/res";
const DEFAULT_CHARSET: &str = "UTF-8";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub aggregation: AggregationSettings,
    pub resources: ResourceSettings,
    /// Token tables keyed by theme id.
    pub themes: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub file_set_cache_limit: NonZeroUsize,
}

#[derive(Debug, Clone, Default)]
pub struct AggregationSettings {
    pub compression_exclusions: Vec<String>,
    pub missing_file_warning_suppressions: Vec<String>,
    pub client_debug: bool,
    pub collation_debug: bool,
}

#[derive(Debug, Clone)]
pub struct ResourceSettings {
    pub root: PathBuf,
    pub context_path: String,
    pub controller_mapping: String,
    pub charset: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("COLLATE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Resolve(args) => raw.apply_resolve_overrides(&args.overrides),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    aggregation: RawAggregationSettings,
    resources: RawResourceSettings,
    themes: HashMap<String, HashMap<String, String>>,
}

impl RawSettings {
    fn apply_resolve_overrides(&mut self, overrides: &ResolveOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(limit) = overrides.file_set_cache_limit {
            self.cache.file_set_cache_limit = Some(limit);
        }
        if let Some(enabled) = overrides.client_debug {
            self.aggregation.client_debug = Some(enabled);
        }
        if let Some(enabled) = overrides.collation_debug {
            self.aggregation.collation_debug = Some(enabled);
        }
        if let Some(root) = overrides.resources_root.as_ref() {
            self.resources.root = Some(root.clone());
        }
        if let Some(path) = overrides.resources_context_path.as_ref() {
            self.resources.context_path = Some(path.clone());
        }
        if let Some(mapping) = overrides.resources_controller_mapping.as_ref() {
            self.resources.controller_mapping = Some(mapping.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            aggregation,
            resources,
            themes,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache)?;
        let aggregation = build_aggregation_settings(aggregation)?;
        let resources = build_resource_settings(resources)?;

        Ok(Self {
            logging,
            cache,
            aggregation,
            resources,
            themes,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let limit = cache
        .file_set_cache_limit
        .unwrap_or(DEFAULT_FILE_SET_CACHE_LIMIT);
    let file_set_cache_limit = NonZeroUsize::new(limit).ok_or_else(|| {
        LoadError::invalid("cache.file_set_cache_limit", "must be greater than zero")
    })?;

    Ok(CacheSettings {
        file_set_cache_limit,
    })
}

fn build_aggregation_settings(
    aggregation: RawAggregationSettings,
) -> Result<AggregationSettings, LoadError> {
    validate_globs(
        "aggregation.compression_exclusions",
        &aggregation.compression_exclusions,
    )?;
    validate_globs(
        "aggregation.missing_file_warning_suppressions",
        &aggregation.missing_file_warning_suppressions,
    )?;

    Ok(AggregationSettings {
        compression_exclusions: aggregation.compression_exclusions,
        missing_file_warning_suppressions: aggregation.missing_file_warning_suppressions,
        client_debug: aggregation.client_debug.unwrap_or(false),
        collation_debug: aggregation.collation_debug.unwrap_or(false),
    })
}

fn build_resource_settings(resources: RawResourceSettings) -> Result<ResourceSettings, LoadError> {
    let charset = match resources.charset.as_deref().map(str::trim) {
        None => DEFAULT_CHARSET.to_string(),
        Some(label) if is_utf8_label(label) => DEFAULT_CHARSET.to_string(),
        Some(label) => {
            return Err(LoadError::invalid(
                "resources.charset",
                format!("`{label}` is not supported; resources are decoded as UTF-8"),
            ));
        }
    };

    Ok(ResourceSettings {
        root: resources
            .root
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESOURCES_ROOT)),
        context_path: resources.context_path.unwrap_or_default(),
        controller_mapping: resources
            .controller_mapping
            .unwrap_or_else(|| DEFAULT_CONTROLLER_MAPPING.to_string()),
        charset,
    })
}

fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8")
}

fn validate_globs(key: &'static str, patterns: &[String]) -> Result<(), LoadError> {
    for pattern in patterns {
        Glob::new(pattern)
            .map_err(|err| LoadError::invalid(key, format!("`{pattern}`: {err}")))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    file_set_cache_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAggregationSettings {
    compression_exclusions: Vec<String>,
    missing_file_warning_suppressions: Vec<String>,
    client_debug: Option<bool>,
    collation_debug: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawResourceSettings {
    root: Option<PathBuf>,
    context_path: Option<String>,
    controller_mapping: Option<String>,
    charset: Option<String>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
