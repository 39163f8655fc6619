use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub digest: DigestConfig,
    pub mail: MailConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DigestConfig {
    /// Bearer secret for the cron endpoints. When unset every request is rejected.
    pub cron_secret: Option<SecretString>,
    pub app_base_url: String,
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub api_base_url: String,
    pub api_key: Option<SecretString>,
    pub from_address: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTransport {
    Http,
    Log,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub cron_secret: Option<String>,
    pub mail_transport: Option<MailTransport>,
    pub mail_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://fleetpulse.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            digest: DigestConfig {
                cron_secret: None,
                app_base_url: "http://localhost:3000".to_string(),
            },
            mail: MailConfig {
                transport: MailTransport::Log,
                api_base_url: "https://api.resend.com".to_string(),
                api_key: None,
                from_address: "Fleetpulse <alerts@fleetpulse.local>".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for MailTransport {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "log" => Ok(Self::Log),
            other => Err(ConfigError::Validation(format!(
                "unsupported mail transport `{other}` (expected http|log)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl MailTransport {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Log => "log",
        }
    }
}

impl DigestConfig {
    /// The configured cron secret, if any non-blank value is set.
    pub fn cron_secret(&self) -> Option<&str> {
        self.cron_secret
            .as_ref()
            .map(|secret| secret.expose_secret())
            .filter(|secret| !secret.trim().is_empty())
    }
}

impl MailConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|secret| secret.expose_secret())
            .filter(|secret| !secret.trim().is_empty())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("fleetpulse.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(digest) = patch.digest {
            if let Some(cron_secret) = digest.cron_secret {
                self.digest.cron_secret = Some(secret_value(cron_secret));
            }
            if let Some(app_base_url) = digest.app_base_url {
                self.digest.app_base_url = app_base_url;
            }
        }

        if let Some(mail) = patch.mail {
            if let Some(transport) = mail.transport {
                self.mail.transport = transport;
            }
            if let Some(api_base_url) = mail.api_base_url {
                self.mail.api_base_url = api_base_url;
            }
            if let Some(api_key) = mail.api_key {
                self.mail.api_key = Some(secret_value(api_key));
            }
            if let Some(from_address) = mail.from_address {
                self.mail.from_address = from_address;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FLEETPULSE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("FLEETPULSE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("FLEETPULSE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("FLEETPULSE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("FLEETPULSE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FLEETPULSE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("FLEETPULSE_SERVER_PORT") {
            self.server.port = parse_u16("FLEETPULSE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("FLEETPULSE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("FLEETPULSE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("FLEETPULSE_DIGEST_CRON_SECRET") {
            self.digest.cron_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("FLEETPULSE_DIGEST_APP_BASE_URL") {
            self.digest.app_base_url = value;
        }

        if let Some(value) = read_env("FLEETPULSE_MAIL_TRANSPORT") {
            self.mail.transport = value.parse()?;
        }
        if let Some(value) = read_env("FLEETPULSE_MAIL_API_BASE_URL") {
            self.mail.api_base_url = value;
        }
        if let Some(value) = read_env("FLEETPULSE_MAIL_API_KEY") {
            self.mail.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FLEETPULSE_MAIL_FROM_ADDRESS") {
            self.mail.from_address = value;
        }

        let log_level =
            read_env("FLEETPULSE_LOGGING_LEVEL").or_else(|| read_env("FLEETPULSE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FLEETPULSE_LOGGING_FORMAT").or_else(|| read_env("FLEETPULSE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(cron_secret) = overrides.cron_secret {
            self.digest.cron_secret = Some(secret_value(cron_secret));
        }
        if let Some(transport) = overrides.mail_transport {
            self.mail.transport = transport;
        }
        if let Some(api_key) = overrides.mail_api_key {
            self.mail.api_key = Some(secret_value(api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_digest(&self.digest)?;
        validate_mail(&self.mail)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("fleetpulse.toml"), PathBuf::from("config/fleetpulse.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_digest(digest: &DigestConfig) -> Result<(), ConfigError> {
    if !is_http_url(&digest.app_base_url) {
        return Err(ConfigError::Validation(
            "digest.app_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_mail(mail: &MailConfig) -> Result<(), ConfigError> {
    if !is_http_url(&mail.api_base_url) {
        return Err(ConfigError::Validation(
            "mail.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if mail.from_address.trim().is_empty() {
        return Err(ConfigError::Validation("mail.from_address must not be empty".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    digest: Option<DigestPatch>,
    mail: Option<MailPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DigestPatch {
    cron_secret: Option<String>,
    app_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MailPatch {
    transport: Option<MailTransport>,
    api_base_url: Option<String>,
    api_key: Option<String>,
    from_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
