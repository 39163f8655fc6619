use std::env;
use std::sync::{Mutex, OnceLock};

use fleetpulse_cli::commands::{config, digest, doctor, migrate, seed};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    let db = TempDatabase::new();
    with_env(&[("FLEETPULSE_DATABASE_URL", db.url())], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("FLEETPULSE_DATABASE_URL", "postgres://localhost/fleet")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_returns_demo_fleet_summary() {
    let db = TempDatabase::new();
    with_env(&[("FLEETPULSE_DATABASE_URL", db.url())], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected deterministic seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message
            .contains("  - acct-demo-free [free]: free tier: one-shot overdue alerts only"));
        assert!(message.contains("  - acct-demo-business [business]:"));
        assert!(message.contains("  - acct-demo-muted [personal]: notifications disabled"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let db = TempDatabase::new();
    with_env(&[("FLEETPULSE_DATABASE_URL", db.url())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn digest_previews_the_seeded_fleet_without_writing() {
    let db = TempDatabase::new();
    with_env(&[("FLEETPULSE_DATABASE_URL", db.url())], || {
        assert_eq!(seed::run().exit_code, 0, "seed should succeed");

        let first = digest::run(None);
        assert_eq!(first.exit_code, 0, "expected preview success: {}", first.output);
        let report = parse_payload(&first.output);
        assert_eq!(report["emailsToSend"], 3);
        assert_eq!(report["skippedUsers"], 0);
        let users: Vec<&str> = report["digests"]
            .as_array()
            .expect("digests array")
            .iter()
            .filter_map(|digest| digest["userId"].as_str())
            .collect();
        assert_eq!(users, vec!["acct-demo-business", "acct-demo-free", "acct-demo-personal"]);

        let second = digest::run(None);
        assert_eq!(parse_payload(&second.output)["emailsToSend"], 3);
    });
}

#[test]
fn digest_rejects_malformed_run_time() {
    with_env(&[], || {
        let result = digest::run(Some("yesterday"));
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "digest");
        assert_eq!(payload["error_class"], "invalid_argument");
    });
}

#[test]
fn doctor_json_passes_with_complete_env() {
    let db = TempDatabase::new();
    with_env(
        &[
            ("FLEETPULSE_DATABASE_URL", db.url()),
            ("FLEETPULSE_DIGEST_CRON_SECRET", "doctor-secret"),
        ],
        || {
            let result = doctor::run(true);
            assert_eq!(result.exit_code, 0, "expected passing doctor: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["overall_status"], "pass");
            assert_eq!(payload["checks"].as_array().map(Vec::len), Some(4));
        },
    );
}

#[test]
fn doctor_flags_missing_cron_secret() {
    let db = TempDatabase::new();
    with_env(&[("FLEETPULSE_DATABASE_URL", db.url())], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        let cron_check = payload["checks"]
            .as_array()
            .and_then(|checks| checks.iter().find(|check| check["name"] == "cron_secret"))
            .expect("cron_secret check");
        assert_eq!(cron_check["status"], "fail");
    });
}

#[test]
fn config_output_redacts_secrets_and_attributes_sources() {
    with_env(
        &[
            ("FLEETPULSE_DIGEST_CRON_SECRET", "super-secret-cron"),
            ("FLEETPULSE_LOG_LEVEL", "debug"),
        ],
        || {
            let output = config::run();

            assert!(!output.contains("super-secret-cron"));
            assert!(output.contains(
                "- digest.cron_secret = <redacted> (source: env (FLEETPULSE_DIGEST_CRON_SECRET))"
            ));
            assert!(
                output.contains("- logging.level = debug (source: env (FLEETPULSE_LOG_LEVEL))")
            );
            assert!(output.contains("- mail.api_key = <unset> (source: default)"));
        },
    );
}

struct TempDatabase {
    _dir: TempDir,
    url: String,
}

impl TempDatabase {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("fleetpulse.db").display());
        Self { _dir: dir, url }
    }

    fn url(&self) -> &str {
        &self.url
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FLEETPULSE_DATABASE_URL",
        "FLEETPULSE_DATABASE_MAX_CONNECTIONS",
        "FLEETPULSE_DATABASE_TIMEOUT_SECS",
        "FLEETPULSE_SERVER_BIND_ADDRESS",
        "FLEETPULSE_SERVER_PORT",
        "FLEETPULSE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "FLEETPULSE_DIGEST_CRON_SECRET",
        "FLEETPULSE_DIGEST_APP_BASE_URL",
        "FLEETPULSE_MAIL_TRANSPORT",
        "FLEETPULSE_MAIL_API_BASE_URL",
        "FLEETPULSE_MAIL_API_KEY",
        "FLEETPULSE_MAIL_FROM_ADDRESS",
        "FLEETPULSE_LOGGING_LEVEL",
        "FLEETPULSE_LOGGING_FORMAT",
        "FLEETPULSE_LOG_LEVEL",
        "FLEETPULSE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
