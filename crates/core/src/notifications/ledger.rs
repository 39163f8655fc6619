use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;
use crate::domain::vehicle::VehicleId;
use crate::errors::DomainError;

/// The two statuses that produce alerts and therefore ledger rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Warning,
    Overdue,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Overdue => "overdue",
        }
    }
}

impl std::str::FromStr for AlertLevel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "warning" => Ok(Self::Warning),
            "overdue" => Ok(Self::Overdue),
            other => Err(DomainError::UnknownAlertLevel(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerKey {
    pub account_id: AccountId,
    pub vehicle_id: VehicleId,
    pub item_type: String,
    pub level: AlertLevel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: LedgerKey,
    pub last_notified_at: DateTime<Utc>,
}

/// Ledger state for a single (vehicle, item type) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PriorAlerts {
    pub warning: Option<DateTime<Utc>>,
    pub overdue: Option<DateTime<Utc>>,
}

impl PriorAlerts {
    pub fn is_empty(&self) -> bool {
        self.warning.is_none() && self.overdue.is_none()
    }

    pub fn record(&mut self, level: AlertLevel, at: DateTime<Utc>) {
        match level {
            AlertLevel::Warning => self.warning = Some(at),
            AlertLevel::Overdue => self.overdue = Some(at),
        }
    }
}
