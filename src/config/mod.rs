//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::{IpAddr, SocketAddr},
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "aula";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_MEDIA_DIR: &str = "media";
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 512 * 1024 * 1024;
const DEFAULT_LESSON_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_COMPLETION_CACHE_TTL_SECS: u64 = 120;
const DEFAULT_CACHE_OP_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_TOKEN_TTL_MINUTES: u64 = 60;

/// Command-line arguments for the Aula binary.
#[derive(Debug, Parser)]
#[command(name = "aula", version, about = "Aula course platform server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "AULA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Aula HTTP service.
    Serve(Box<ServeArgs>),
    /// Create an administrator account.
    #[command(name = "create-admin")]
    CreateAdmin(CreateAdminArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct CreateAdminArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Email address for the new administrator.
    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    /// Display name for the new administrator.
    #[arg(long = "full-name", value_name = "NAME", default_value = "Administrator")]
    pub full_name: String,

    /// Password for the new administrator.
    #[arg(long, value_name = "PASSWORD")]
    pub password: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the cache connection URL.
    #[arg(long = "cache-url", value_name = "URL")]
    pub cache_url: Option<String>,

    /// Override the lesson content cache expiry in seconds.
    #[arg(long = "cache-lesson-ttl-seconds", value_name = "SECONDS")]
    pub cache_lesson_ttl_seconds: Option<u64>,

    /// Override the completion flag cache expiry in seconds.
    #[arg(long = "cache-completion-ttl-seconds", value_name = "SECONDS")]
    pub cache_completion_ttl_seconds: Option<u64>,

    /// Override the per-operation cache timeout in milliseconds.
    #[arg(long = "cache-op-timeout-ms", value_name = "MILLISECONDS")]
    pub cache_op_timeout_ms: Option<u64>,

    /// Override the media storage directory.
    #[arg(long = "media-directory", value_name = "PATH")]
    pub media_directory: Option<PathBuf>,

    /// Override the maximum request size for video uploads in bytes.
    #[arg(long = "media-max-request-bytes", value_name = "BYTES")]
    pub media_max_request_bytes: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub auth: AuthSettings,
    pub media: MediaSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
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
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Connection URL of the cache host. When absent the process runs with
    /// an in-memory store, which is fine for a single node.
    pub url: Option<String>,
    pub lesson_ttl_seconds: NonZeroU64,
    pub completion_ttl_seconds: NonZeroU64,
    pub op_timeout_ms: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub secret: Option<String>,
    pub token_ttl_minutes: NonZeroU64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub directory: PathBuf,
    pub max_request_bytes: NonZeroU64,
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

/// Parse CLI arguments and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("AULA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::CreateAdmin(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    auth: RawAuthSettings,
    media: RawMediaSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    url: Option<String>,
    lesson_ttl_seconds: Option<u64>,
    completion_ttl_seconds: Option<u64>,
    op_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    secret: Option<String>,
    token_ttl_minutes: Option<u64>,
    cookie_secure: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMediaSettings {
    directory: Option<PathBuf>,
    max_request_bytes: Option<u64>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(url) = overrides.cache_url.as_ref() {
            self.cache.url = Some(url.clone());
        }
        if let Some(ttl) = overrides.cache_lesson_ttl_seconds {
            self.cache.lesson_ttl_seconds = Some(ttl);
        }
        if let Some(ttl) = overrides.cache_completion_ttl_seconds {
            self.cache.completion_ttl_seconds = Some(ttl);
        }
        if let Some(timeout) = overrides.cache_op_timeout_ms {
            self.cache.op_timeout_ms = Some(timeout);
        }
        if let Some(directory) = overrides.media_directory.as_ref() {
            self.media.directory = Some(directory.clone());
        }
        if let Some(limit) = overrides.media_max_request_bytes {
            self.media.max_request_bytes = Some(limit);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            auth,
            media,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            auth: build_auth_settings(auth)?,
            media: build_media_settings(media)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let ip: IpAddr = host
        .parse()
        .map_err(|err| LoadError::invalid("server.host", format!("not an IP address: {err}")))?;

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr: SocketAddr::new(ip, port),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(raw) => LevelFilter::from_str(&raw)
            .map_err(|_| LoadError::invalid("logging.level", format!("unknown level `{raw}`")))?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let max_connections = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max_connections).ok_or_else(|| {
        LoadError::invalid("database.max_connections", "must be greater than zero")
    })?;

    Ok(DatabaseSettings {
        url: database.url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let lesson_ttl_seconds = cache
        .lesson_ttl_seconds
        .unwrap_or(DEFAULT_LESSON_CACHE_TTL_SECS);
    let lesson_ttl_seconds = NonZeroU64::new(lesson_ttl_seconds)
        .ok_or_else(|| LoadError::invalid("cache.lesson_ttl_seconds", "must be greater than zero"))?;

    let completion_ttl_seconds = cache
        .completion_ttl_seconds
        .unwrap_or(DEFAULT_COMPLETION_CACHE_TTL_SECS);
    let completion_ttl_seconds = NonZeroU64::new(completion_ttl_seconds).ok_or_else(|| {
        LoadError::invalid("cache.completion_ttl_seconds", "must be greater than zero")
    })?;

    let op_timeout_ms = cache.op_timeout_ms.unwrap_or(DEFAULT_CACHE_OP_TIMEOUT_MS);
    let op_timeout_ms = NonZeroU64::new(op_timeout_ms)
        .ok_or_else(|| LoadError::invalid("cache.op_timeout_ms", "must be greater than zero"))?;

    Ok(CacheSettings {
        url: cache.url,
        lesson_ttl_seconds,
        completion_ttl_seconds,
        op_timeout_ms,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    if let Some(secret) = auth.secret.as_ref() {
        if secret.is_empty() {
            return Err(LoadError::invalid("auth.secret", "must not be empty"));
        }
    }

    let token_ttl_minutes = auth.token_ttl_minutes.unwrap_or(DEFAULT_TOKEN_TTL_MINUTES);
    let token_ttl_minutes = NonZeroU64::new(token_ttl_minutes)
        .ok_or_else(|| LoadError::invalid("auth.token_ttl_minutes", "must be greater than zero"))?;

    Ok(AuthSettings {
        secret: auth.secret,
        token_ttl_minutes,
        cookie_secure: auth.cookie_secure.unwrap_or(false),
    })
}

fn build_media_settings(media: RawMediaSettings) -> Result<MediaSettings, LoadError> {
    let max_request_bytes = media
        .max_request_bytes
        .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes)
        .ok_or_else(|| LoadError::invalid("media.max_request_bytes", "must be greater than zero"))?;

    Ok(MediaSettings {
        directory: media
            .directory
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_DIR)),
        max_request_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let settings = Settings::from_raw(RawSettings::default()).expect("defaults are valid");
        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(
            settings.cache.lesson_ttl_seconds.get(),
            DEFAULT_LESSON_CACHE_TTL_SECS
        );
        assert_eq!(
            settings.cache.completion_ttl_seconds.get(),
            DEFAULT_COMPLETION_CACHE_TTL_SECS
        );
        assert!(settings.database.url.is_none());
        assert!(settings.cache.url.is_none());
    }

    #[test]
    fn zero_port_is_rejected() {
        let raw = RawSettings {
            server: RawServerSettings {
                host: None,
                port: Some(0),
            },
            ..RawSettings::default()
        };
        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid { key: "server.port", .. })
        ));
    }

    #[test]
    fn zero_cache_ttl_is_rejected() {
        let raw = RawSettings {
            cache: RawCacheSettings {
                lesson_ttl_seconds: Some(0),
                ..RawCacheSettings::default()
            },
            ..RawSettings::default()
        };
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn serve_overrides_take_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);

        let overrides = ServeOverrides {
            server_port: Some(5000),
            cache_lesson_ttl_seconds: Some(900),
            ..ServeOverrides::default()
        };
        raw.apply_serve_overrides(&overrides);

        let settings = Settings::from_raw(raw).expect("valid");
        assert_eq!(settings.server.addr.port(), 5000);
        assert_eq!(settings.cache.lesson_ttl_seconds.get(), 900);
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let raw = RawSettings {
            logging: RawLoggingSettings {
                level: Some("verbose".to_string()),
                json: None,
            },
            ..RawSettings::default()
        };
        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid { key: "logging.level", .. })
        ));
    }
}
