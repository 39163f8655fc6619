use chrono::Utc;
use fleetpulse_db::{AccountSeedInfo, DemoFleetDataset};

use crate::commands::{with_database, CommandResult};

pub fn run() -> CommandResult {
    let today = Utc::now().date_naive();

    let result = with_database("seed", |pool, _config| async move {
        let seed_result = DemoFleetDataset::load(&pool, today)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;

        let verification = DemoFleetDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 7u8))?;

        if !verification.all_present {
            let message = verification_failure_message(&verification.checks);
            return Err(("seed_verification", message, 7u8));
        }
        Ok(seed_result)
    });

    match result {
        Ok(seed) => {
            let account_lines: Vec<String> =
                seed.accounts_seeded.iter().map(describe_account).collect();
            let message = format!(
                "demo fleet loaded ({} vehicles, {} service records):\n{}",
                seed.vehicles_seeded,
                seed.service_records_seeded,
                account_lines.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err(failure) => failure,
    }
}

fn describe_account(account: &AccountSeedInfo) -> String {
    format!("  - {} [{}]: {}", account.account_id, account.tier, account.description)
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::verification_failure_message;

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [
            ("acct-demo-free", true),
            ("veh-demo-van-1", false),
            ("rec-demo-van-2-battery", false),
        ];

        assert_eq!(
            verification_failure_message(&checks),
            "seed verification failed for: veh-demo-van-1, rec-demo-van-2-battery"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = [("acct-demo-free", true), ("veh-demo-civic", true)];

        assert_eq!(verification_failure_message(&checks), "some seed data failed to load");
    }
}
