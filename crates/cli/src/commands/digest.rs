use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetpulse_core::notifications::{DigestEngine, DigestRenderer};
use fleetpulse_db::{SqlAccountRepository, SqlFleetRepository, SqlNotificationLedgerRepository};

use crate::commands::{with_database, CommandResult};

/// Dry-run of the digest job against the configured database. Nothing is sent
/// and the ledger is left untouched.
pub fn run(at: Option<&str>) -> CommandResult {
    let now = match parse_run_time(at) {
        Ok(now) => now,
        Err(message) => return CommandResult::failure("digest", "invalid_argument", message, 2),
    };

    let result = with_database("digest", |pool, config| async move {
        let renderer = DigestRenderer::new(config.digest.app_base_url.clone())
            .map_err(|error| ("template_init", error.to_string(), 6u8))?;
        let engine = DigestEngine::new(
            Arc::new(SqlAccountRepository::new(pool.clone())),
            Arc::new(SqlFleetRepository::new(pool.clone())),
            Arc::new(SqlNotificationLedgerRepository::new(pool)),
            renderer,
        );
        engine.preview(now).await.map_err(|error| ("digest_preview", error.to_string(), 7u8))
    });

    match result {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure("digest", "serialization", error.to_string(), 8),
        },
        Err(failure) => failure,
    }
}

fn parse_run_time(at: Option<&str>) -> Result<DateTime<Utc>, String> {
    match at {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|value| value.with_timezone(&Utc))
            .map_err(|error| format!("`--at` must be an RFC 3339 timestamp: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_run_time;

    #[test]
    fn explicit_run_time_is_normalized_to_utc() {
        let parsed = parse_run_time(Some("2026-10-19T08:00:00+02:00")).expect("valid timestamp");

        assert_eq!(parsed.to_rfc3339(), "2026-10-19T06:00:00+00:00");
    }

    #[test]
    fn malformed_run_time_is_rejected() {
        let error = parse_run_time(Some("next tuesday")).expect_err("invalid timestamp");

        assert!(error.contains("--at"));
    }
}
