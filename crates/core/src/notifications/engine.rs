//! Batch pass over every notifiable account: scan, assemble digests, and
//! (in execute mode) send them and commit the ledger.
//!
//! One run is strictly sequential. A failure reading one account skips that
//! account; a failure listing accounts aborts the run before anything is
//! touched. Ledger rows for an alert are written only after the digest that
//! carried it was accepted by the mailer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::account::{Account, Tier};
use crate::errors::ApplicationError;
use crate::notifications::digest::Digest;
use crate::notifications::ports::{AccountDirectory, FleetRecords, Mailer, NotificationLedger};
use crate::notifications::render::DigestRenderer;
use crate::notifications::scanner::{scan_account, AccountScan};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub emails_to_send: usize,
    pub skipped_users: usize,
    pub errors: Vec<String>,
    pub digests: Vec<DigestPreview>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestPreview {
    pub user_id: String,
    pub email: String,
    pub plan: Tier,
    pub overdue_count: usize,
    pub warning_count: usize,
    pub alerts: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped_users: usize,
    pub errors: Vec<String>,
}

struct PlannedAccount {
    account: Account,
    scan: AccountScan,
}

struct RunPlan {
    accounts: Vec<PlannedAccount>,
    read_failures: usize,
    errors: Vec<String>,
}

pub struct DigestEngine {
    accounts: Arc<dyn AccountDirectory>,
    fleet: Arc<dyn FleetRecords>,
    ledger: Arc<dyn NotificationLedger>,
    renderer: DigestRenderer,
}

impl DigestEngine {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        fleet: Arc<dyn FleetRecords>,
        ledger: Arc<dyn NotificationLedger>,
        renderer: DigestRenderer,
    ) -> Self {
        Self { accounts, fleet, ledger, renderer }
    }

    /// Computes what a run at `now` would send. Reads only.
    pub async fn preview(&self, now: DateTime<Utc>) -> Result<PreviewReport, ApplicationError> {
        let correlation_id = new_run_id();
        info!(
            event_name = "digest.preview.start",
            correlation_id = %correlation_id,
            "starting digest preview"
        );

        let plan = self.plan(now, &correlation_id).await?;
        let mut report = PreviewReport {
            skipped_users: plan.read_failures,
            errors: plan.errors,
            ..PreviewReport::default()
        };

        for planned in plan.accounts {
            match Digest::new(&planned.account, planned.scan.alerts) {
                Some(digest) => report.digests.push(DigestPreview {
                    user_id: digest.account_id.0.clone(),
                    email: digest.email.clone(),
                    plan: digest.tier,
                    overdue_count: digest.overdue_count(),
                    warning_count: digest.warning_count(),
                    alerts: digest.summary_lines(),
                }),
                None => report.skipped_users += 1,
            }
        }
        report.emails_to_send = report.digests.len();

        info!(
            event_name = "digest.preview.complete",
            correlation_id = %correlation_id,
            emails_to_send = report.emails_to_send,
            skipped_users = report.skipped_users,
            error_count = report.errors.len(),
            "digest preview complete"
        );
        Ok(report)
    }

    /// Sends every due digest through `mailer` and commits the ledger for
    /// the ones that were delivered.
    pub async fn execute(
        &self,
        mailer: &dyn Mailer,
        now: DateTime<Utc>,
    ) -> Result<ExecuteReport, ApplicationError> {
        let correlation_id = new_run_id();
        info!(
            event_name = "digest.run.start",
            correlation_id = %correlation_id,
            "starting digest run"
        );

        let plan = self.plan(now, &correlation_id).await?;
        let mut report = ExecuteReport {
            skipped_users: plan.read_failures,
            errors: plan.errors,
            ..ExecuteReport::default()
        };

        for planned in plan.accounts {
            let PlannedAccount { account, scan } = planned;
            self.apply_clears(&account, &scan, &correlation_id).await;

            let Some(digest) = Digest::new(&account, scan.alerts) else {
                report.skipped_users += 1;
                continue;
            };
            self.dispatch(mailer, &digest, now, &correlation_id, &mut report).await;
        }

        info!(
            event_name = "digest.run.complete",
            correlation_id = %correlation_id,
            sent = report.sent,
            failed = report.failed,
            skipped_users = report.skipped_users,
            error_count = report.errors.len(),
            "digest run complete"
        );
        Ok(report)
    }

    async fn plan(
        &self,
        now: DateTime<Utc>,
        correlation_id: &str,
    ) -> Result<RunPlan, ApplicationError> {
        let accounts = self.accounts.list_notifiable_accounts().await?;
        let mut plan = RunPlan { accounts: Vec::new(), read_failures: 0, errors: Vec::new() };

        for account in accounts.into_iter().filter(|account| account.notifications_enabled) {
            match self.scan(&account, now).await {
                Ok(scan) => plan.accounts.push(PlannedAccount { account, scan }),
                Err(error) => {
                    warn!(
                        event_name = "digest.account.read_failed",
                        correlation_id = %correlation_id,
                        account_id = %account.id,
                        error = %error,
                        "skipping account after read failure"
                    );
                    plan.read_failures += 1;
                    plan.errors.push(format!("{}: {error}", account.id));
                }
            }
        }

        Ok(plan)
    }

    async fn scan(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> Result<AccountScan, ApplicationError> {
        let vehicles = self.fleet.vehicles_for_account(&account.id).await?;
        let records = self.fleet.service_records_for_account(&account.id).await?;
        let ledger = self.ledger.entries_for_account(&account.id).await?;
        Ok(scan_account(account, &vehicles, &records, &ledger, now))
    }

    async fn apply_clears(&self, account: &Account, scan: &AccountScan, correlation_id: &str) {
        for clear in &scan.clears {
            if let Err(error) =
                self.ledger.clear(&account.id, &clear.vehicle_id, &clear.item_type).await
            {
                warn!(
                    event_name = "digest.ledger.clear_failed",
                    correlation_id = %correlation_id,
                    account_id = %account.id,
                    vehicle_id = %clear.vehicle_id,
                    item_type = %clear.item_type,
                    error = %error,
                    "stale ledger entry could not be cleared"
                );
            }
        }
    }

    async fn dispatch(
        &self,
        mailer: &dyn Mailer,
        digest: &Digest,
        now: DateTime<Utc>,
        correlation_id: &str,
        report: &mut ExecuteReport,
    ) {
        let delivery = match self.renderer.render(digest) {
            Ok(email) => mailer.send(&email).await,
            Err(error) => Err(error),
        };

        if let Err(error) = delivery {
            warn!(
                event_name = "digest.send.failed",
                correlation_id = %correlation_id,
                account_id = %digest.account_id,
                error = %error,
                "digest was not sent; ledger left untouched for retry"
            );
            report.failed += 1;
            report.errors.push(format!("{}: {error}", digest.account_id));
            return;
        }

        report.sent += 1;
        info!(
            event_name = "digest.send.succeeded",
            correlation_id = %correlation_id,
            account_id = %digest.account_id,
            overdue_count = digest.overdue_count(),
            warning_count = digest.warning_count(),
            "digest sent"
        );

        for entry in digest.ledger_entries(now) {
            if let Err(error) = self.ledger.upsert(&entry).await {
                error!(
                    event_name = "digest.ledger.write_failed",
                    correlation_id = %correlation_id,
                    account_id = %digest.account_id,
                    vehicle_id = %entry.key.vehicle_id,
                    item_type = %entry.key.item_type,
                    level = entry.key.level.as_str(),
                    error = %error,
                    "digest sent but ledger write failed; alert will be sent again next run"
                );
                report.errors.push(format!(
                    "{}: ledger write failed for {}/{}: {error}",
                    digest.account_id, entry.key.vehicle_id, entry.key.item_type
                ));
            }
        }

        if let Err(error) = self.accounts.record_notification_sent(&digest.account_id, now).await
        {
            warn!(
                event_name = "digest.account.timestamp_failed",
                correlation_id = %correlation_id,
                account_id = %digest.account_id,
                error = %error,
                "could not update last notification timestamp"
            );
            report.errors.push(format!("{}: {error}", digest.account_id));
        }
    }
}

fn new_run_id() -> String {
    format!("digest-{}", Uuid::new_v4())
}
