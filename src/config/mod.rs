//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::Grouping;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "storefront-cms";
const ENV_PREFIX: &str = "STOREFRONT_CMS";
const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Command-line arguments for the storefront-cms binary.
#[derive(Debug, Parser)]
#[command(
    name = "storefront-cms",
    version,
    about = "Cached reads and cache invalidation for storefront CMS content"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "STOREFRONT_CMS_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the CMS base URL.
    #[arg(long = "cms-server-url", value_name = "URL", global = true)]
    pub cms_server_url: Option<String>,

    /// Override the CMS API key.
    #[arg(long = "cms-api-key", value_name = "KEY", global = true)]
    pub cms_api_key: Option<String>,

    /// Disable or enable the content cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_enabled: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Fetch one published item by slug.
    Get(GetArgs),
    /// List published items of a collection.
    List(ListArgs),
    /// List categories with their nested items.
    Categories(CategoriesArgs),
    /// Print the cache keys and tags a collection change invalidates.
    ///
    /// The plan is computed only; no cache is cleared and the CMS is not contacted.
    Invalidate(InvalidateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct GetArgs {
    /// Collection name, e.g. `pages` or `articles`.
    pub collection: String,
    pub slug: String,
    #[arg(long, value_name = "LOCALE")]
    pub locale: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    pub collection: String,
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<NonZeroU32>,
    #[arg(long, value_name = "PAGE")]
    pub page: Option<NonZeroU32>,
    /// Sort field; prefix with `-` for descending.
    #[arg(long, value_name = "FIELD", allow_hyphen_values = true)]
    pub sort: Option<String>,
    /// Restrict to items whose category has this slug.
    #[arg(long = "category", value_name = "SLUG")]
    pub category_slug: Option<String>,
    #[arg(long, value_name = "LOCALE")]
    pub locale: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct CategoriesArgs {
    #[arg(value_enum)]
    pub kind: GroupingKind,
    #[arg(long, value_name = "LOCALE")]
    pub locale: Option<String>,
    #[arg(long = "category", value_name = "SLUG")]
    pub category_slug: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct InvalidateArgs {
    pub collection: String,
    #[arg(long, value_name = "SLUG")]
    pub slug: Option<String>,
    #[arg(long, value_name = "LOCALE")]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupingKind {
    Pages,
    Articles,
}

impl From<GroupingKind> for Grouping {
    fn from(kind: GroupingKind) -> Self {
        match kind {
            GroupingKind::Pages => Grouping::PageCategories,
            GroupingKind::Articles => Grouping::ArticleCategories,
        }
    }
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cms: CmsSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

/// Upstream CMS connection and TTL overrides.
///
/// Connection fields stay optional here; the client rejects a missing URL or
/// key when it is built, so commands that never reach the CMS still run.
#[derive(Debug, Clone, Default)]
pub struct CmsSettings {
    pub server_url: Option<String>,
    pub api_key: Option<String>,
    pub content_cache_ttl: Option<Duration>,
    pub list_cache_ttl: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub capacity: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
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

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    cms: RawCmsSettings,
    cache: RawCacheSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCmsSettings {
    server_url: Option<String>,
    api_key: Option<String>,
    content_cache_ttl: Option<u64>,
    list_cache_ttl: Option<u64>,
    request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.cms_server_url.as_ref() {
            self.cms.server_url = Some(url.clone());
        }
        if let Some(key) = overrides.cms_api_key.as_ref() {
            self.cms.api_key = Some(key.clone());
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            cms,
            cache,
            logging,
        } = raw;

        Ok(Self {
            cms: build_cms_settings(cms)?,
            cache: build_cache_settings(cache)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_cms_settings(cms: RawCmsSettings) -> Result<CmsSettings, LoadError> {
    let server_url = non_blank(cms.server_url);
    if let Some(url) = server_url.as_deref() {
        Url::parse(url)
            .map_err(|err| LoadError::invalid("cms.server_url", format!("invalid URL: {err}")))?;
    }

    Ok(CmsSettings {
        server_url,
        api_key: non_blank(cms.api_key),
        content_cache_ttl: positive_seconds(cms.content_cache_ttl, "cms.content_cache_ttl")?,
        list_cache_ttl: positive_seconds(cms.list_cache_ttl, "cms.list_cache_ttl")?,
        request_timeout: positive_millis(cms.request_timeout_ms, "cms.request_timeout_ms")?,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = NonZeroUsize::new(cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY))
        .ok_or_else(|| LoadError::invalid("cache.capacity", "must be greater than zero"))?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        capacity,
    })
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

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn positive_seconds(value: Option<u64>, key: &'static str) -> Result<Option<Duration>, LoadError> {
    positive(value, key).map(|value| value.map(Duration::from_secs))
}

fn positive_millis(value: Option<u64>, key: &'static str) -> Result<Option<Duration>, LoadError> {
    positive(value, key).map(|value| value.map(Duration::from_millis))
}

fn positive(value: Option<u64>, key: &'static str) -> Result<Option<u64>, LoadError> {
    match value {
        Some(0) => Err(LoadError::invalid(key, "must be greater than zero")),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_leave_cms_unset_and_cache_enabled() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert!(settings.cms.server_url.is_none());
        assert!(settings.cms.content_cache_ttl.is_none());
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.capacity.get(), DEFAULT_CACHE_CAPACITY);
        assert_eq!(settings.logging.level, LevelFilter::INFO);
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.cms.server_url = Some("https://file.example.com".into());
        raw.logging.level = Some("info".into());

        raw.apply_overrides(&GlobalOverrides {
            cms_server_url: Some("https://cli.example.com".into()),
            cache_enabled: Some(false),
            log_level: Some("debug".into()),
            log_json: Some(true),
            ..Default::default()
        });
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(
            settings.cms.server_url.as_deref(),
            Some("https://cli.example.com")
        );
        assert!(!settings.cache.enabled);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn ttl_values_become_durations() {
        let mut raw = RawSettings::default();
        raw.cms.content_cache_ttl = Some(600);
        raw.cms.list_cache_ttl = Some(30);

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.cms.content_cache_ttl, Some(Duration::from_secs(600)));
        assert_eq!(settings.cms.list_cache_ttl, Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut raw = RawSettings::default();
        raw.cms.list_cache_ttl = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero ttl should fail");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "cms.list_cache_ttl",
                ..
            }
        ));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut raw = RawSettings::default();
        raw.cache.capacity = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero capacity should fail");
        assert!(err.to_string().contains("cache.capacity"));
    }

    #[test]
    fn malformed_server_url_is_rejected() {
        let mut raw = RawSettings::default();
        raw.cms.server_url = Some("not a url".into());

        let err = Settings::from_raw(raw).expect_err("bad url should fail");
        assert!(err.to_string().contains("cms.server_url"));
    }

    #[test]
    fn blank_credentials_read_as_absent() {
        let mut raw = RawSettings::default();
        raw.cms.server_url = Some("   ".into());
        raw.cms.api_key = Some(" key ".into());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(settings.cms.server_url.is_none());
        assert_eq!(settings.cms.api_key.as_deref(), Some("key"));
    }

    #[test]
    fn config_file_is_loaded() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "[cms]\nserver_url = \"https://cms.example.com\"\ncontent_cache_ttl = 120\n\n[cache]\ncapacity = 50"
        )
        .expect("write config");

        let args = CliArgs::parse_from([
            "storefront-cms",
            "--config-file",
            file.path().to_str().expect("utf-8 path"),
            "get",
            "pages",
            "home",
        ]);
        let settings = load(&args).expect("settings load");

        assert_eq!(
            settings.cms.server_url.as_deref(),
            Some("https://cms.example.com")
        );
        assert_eq!(
            settings.cms.content_cache_ttl,
            Some(Duration::from_secs(120))
        );
        assert_eq!(settings.cache.capacity.get(), 50);
    }

    #[test]
    fn request_timeout_is_read_in_milliseconds() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(file, "[cms]\nrequest_timeout_ms = 5000").expect("write config");

        let args = CliArgs::parse_from([
            "storefront-cms",
            "--config-file",
            file.path().to_str().expect("utf-8 path"),
            "invalidate",
            "pages",
        ]);
        let settings = load(&args).expect("settings load");

        assert_eq!(settings.cms.request_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let mut raw = RawSettings::default();
        raw.cms.request_timeout_ms = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero timeout should fail");
        assert!(err.to_string().contains("cms.request_timeout_ms"));
    }

    #[test]
    fn parse_list_arguments() {
        let args = CliArgs::parse_from([
            "storefront-cms",
            "list",
            "articles",
            "--limit",
            "5",
            "--sort",
            "-publishedAt",
            "--category",
            "news",
            "--locale",
            "de",
        ]);

        match args.command {
            Command::List(list) => {
                assert_eq!(list.collection, "articles");
                assert_eq!(list.limit, NonZeroU32::new(5));
                assert_eq!(list.sort.as_deref(), Some("-publishedAt"));
                assert_eq!(list.category_slug.as_deref(), Some("news"));
                assert_eq!(list.locale.as_deref(), Some("de"));
            }
            other => panic!("wrong command parsed: {other:?}"),
        }
    }

    #[test]
    fn parse_categories_with_global_override() {
        let args = CliArgs::parse_from([
            "storefront-cms",
            "categories",
            "articles",
            "--cms-api-key",
            "secret",
        ]);

        assert_eq!(args.overrides.cms_api_key.as_deref(), Some("secret"));
        match args.command {
            Command::Categories(categories) => {
                assert_eq!(Grouping::from(categories.kind), Grouping::ArticleCategories);
            }
            other => panic!("wrong command parsed: {other:?}"),
        }
    }

    #[test]
    fn parse_invalidate_arguments() {
        let args = CliArgs::parse_from([
            "storefront-cms",
            "invalidate",
            "pages",
            "--slug",
            "home",
        ]);

        match args.command {
            Command::Invalidate(invalidate) => {
                assert_eq!(invalidate.collection, "pages");
                assert_eq!(invalidate.slug.as_deref(), Some("home"));
                assert!(invalidate.locale.is_none());
            }
            other => panic!("wrong command parsed: {other:?}"),
        }
    }
}
