//! Alert decision for one (account, vehicle, item type) key.
//!
//! `decide` is a pure function of the current status, the key's ledger rows,
//! the account's effective policy and the evaluation time. The engine executes
//! the returned action; nothing here touches storage.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::account::{NotificationFrequency, NotificationPolicy, Tier};
use crate::maintenance::classifier::MaintenanceStatus;
use crate::notifications::ledger::{AlertLevel, PriorAlerts};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertAction {
    None,
    /// First alert for this level since the key was last cleared.
    Alert(AlertLevel),
    /// Repeat of an overdue alert whose frequency window has elapsed.
    AlertAndRefresh(AlertLevel),
    /// Item is back to good/unknown; drop both ledger rows for the key.
    ClearLedger,
}

impl AlertAction {
    pub fn alert_level(self) -> Option<AlertLevel> {
        match self {
            Self::Alert(level) | Self::AlertAndRefresh(level) => Some(level),
            Self::None | Self::ClearLedger => None,
        }
    }
}

pub fn decide(
    status: MaintenanceStatus,
    prior: &PriorAlerts,
    policy: NotificationPolicy,
    now: DateTime<Utc>,
) -> AlertAction {
    match status {
        MaintenanceStatus::Good | MaintenanceStatus::Unknown => {
            if prior.is_empty() {
                AlertAction::None
            } else {
                AlertAction::ClearLedger
            }
        }
        MaintenanceStatus::Overdue => match prior.overdue {
            None => AlertAction::Alert(AlertLevel::Overdue),
            Some(last_notified_at) => match policy.tier {
                Tier::Free => AlertAction::None,
                Tier::Personal | Tier::Business => {
                    if frequency_elapsed(last_notified_at, policy.frequency, now) {
                        AlertAction::AlertAndRefresh(AlertLevel::Overdue)
                    } else {
                        AlertAction::None
                    }
                }
            },
        },
        MaintenanceStatus::Warning => {
            if !policy.warnings_enabled {
                return AlertAction::None;
            }
            match prior.warning {
                None => AlertAction::Alert(AlertLevel::Warning),
                Some(_) => AlertAction::None,
            }
        }
    }
}

pub fn frequency_elapsed(
    last_notified_at: DateTime<Utc>,
    frequency: NotificationFrequency,
    now: DateTime<Utc>,
) -> bool {
    let elapsed_days = (now - last_notified_at).num_milliseconds() as f64 / MILLIS_PER_DAY;
    elapsed_days >= frequency.days() as f64
}
