use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use fleetpulse_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct ConfigField {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    vec![
        ConfigField {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["FLEETPULSE_DATABASE_URL"],
        },
        ConfigField {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["FLEETPULSE_DATABASE_MAX_CONNECTIONS"],
        },
        ConfigField {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["FLEETPULSE_DATABASE_TIMEOUT_SECS"],
        },
        ConfigField {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["FLEETPULSE_SERVER_BIND_ADDRESS"],
        },
        ConfigField {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["FLEETPULSE_SERVER_PORT"],
        },
        ConfigField {
            key: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["FLEETPULSE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        ConfigField {
            key: "digest.cron_secret",
            value: redact_secret(config.digest.cron_secret()),
            env_keys: &["FLEETPULSE_DIGEST_CRON_SECRET"],
        },
        ConfigField {
            key: "digest.app_base_url",
            value: config.digest.app_base_url.clone(),
            env_keys: &["FLEETPULSE_DIGEST_APP_BASE_URL"],
        },
        ConfigField {
            key: "mail.transport",
            value: config.mail.transport.as_str().to_string(),
            env_keys: &["FLEETPULSE_MAIL_TRANSPORT"],
        },
        ConfigField {
            key: "mail.api_base_url",
            value: config.mail.api_base_url.clone(),
            env_keys: &["FLEETPULSE_MAIL_API_BASE_URL"],
        },
        ConfigField {
            key: "mail.api_key",
            value: redact_secret(config.mail.api_key()),
            env_keys: &["FLEETPULSE_MAIL_API_KEY"],
        },
        ConfigField {
            key: "mail.from_address",
            value: config.mail.from_address.clone(),
            env_keys: &["FLEETPULSE_MAIL_FROM_ADDRESS"],
        },
        ConfigField {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["FLEETPULSE_LOGGING_LEVEL", "FLEETPULSE_LOG_LEVEL"],
        },
        ConfigField {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["FLEETPULSE_LOGGING_FORMAT", "FLEETPULSE_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("fleetpulse.toml"), PathBuf::from("config/fleetpulse.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&str>) -> String {
    match secret {
        Some(_) => "<redacted>".to_string(),
        None => "<unset>".to_string(),
    }
}
