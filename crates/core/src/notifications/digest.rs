//! Groups the alerts due for one account into a single digest.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::account::{Account, AccountId, Tier};
use crate::domain::vehicle::VehicleId;
use crate::notifications::ledger::{AlertLevel, LedgerEntry, LedgerKey};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DigestAlert {
    pub vehicle_id: VehicleId,
    pub vehicle_name: String,
    pub item_type: String,
    pub item_label: String,
    pub level: AlertLevel,
    pub detail: String,
    /// Set when this is a frequency-driven repeat of an earlier overdue alert.
    pub repeat: bool,
}

impl DigestAlert {
    pub fn ledger_key(&self, account_id: &AccountId) -> LedgerKey {
        LedgerKey {
            account_id: account_id.clone(),
            vehicle_id: self.vehicle_id.clone(),
            item_type: self.item_type.clone(),
            level: self.level,
        }
    }

    /// One-line form used by the preview report, e.g.
    /// `Civic: Oil Change overdue (30 days overdue)`.
    pub fn summary(&self) -> String {
        let mut line =
            format!("{}: {} {}", self.vehicle_name, self.item_label, self.level.as_str());
        if !self.detail.is_empty() {
            line.push_str(&format!(" ({})", self.detail));
        }
        line
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub account_id: AccountId,
    pub email: String,
    pub display_name: Option<String>,
    pub tier: Tier,
    pub alerts: Vec<DigestAlert>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VehicleGroup<'a> {
    pub vehicle_id: &'a VehicleId,
    pub vehicle_name: &'a str,
    pub alerts: Vec<&'a DigestAlert>,
}

impl Digest {
    /// Accounts with nothing due get no digest at all.
    pub fn new(account: &Account, alerts: Vec<DigestAlert>) -> Option<Self> {
        if alerts.is_empty() {
            return None;
        }

        Some(Self {
            account_id: account.id.clone(),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            tier: account.tier,
            alerts,
        })
    }

    pub fn overdue_count(&self) -> usize {
        self.count(AlertLevel::Overdue)
    }

    pub fn warning_count(&self) -> usize {
        self.count(AlertLevel::Warning)
    }

    fn count(&self, level: AlertLevel) -> usize {
        self.alerts.iter().filter(|alert| alert.level == level).count()
    }

    pub fn subject(&self) -> String {
        let overdue = self.overdue_count();
        let warning = self.warning_count();

        match (overdue, warning) {
            (0, warning) => format!("{} coming due soon", items(warning)),
            (overdue, 0) => format!("{} overdue", items(overdue)),
            (overdue, warning) => {
                format!("{} overdue, {warning} coming due soon", items(overdue))
            }
        }
    }

    /// Alerts grouped per vehicle, vehicles in first-seen order, overdue
    /// items ahead of warnings within a vehicle.
    pub fn vehicles(&self) -> Vec<VehicleGroup<'_>> {
        let mut groups: Vec<VehicleGroup<'_>> = Vec::new();
        for alert in &self.alerts {
            match groups.iter_mut().find(|group| *group.vehicle_id == alert.vehicle_id) {
                Some(group) => group.alerts.push(alert),
                None => groups.push(VehicleGroup {
                    vehicle_id: &alert.vehicle_id,
                    vehicle_name: &alert.vehicle_name,
                    alerts: vec![alert],
                }),
            }
        }

        for group in &mut groups {
            group.alerts.sort_by(|left, right| right.level.cmp(&left.level));
        }
        groups
    }

    /// Ledger rows to upsert once this digest has been delivered.
    pub fn ledger_entries(&self, sent_at: DateTime<Utc>) -> Vec<LedgerEntry> {
        self.alerts
            .iter()
            .map(|alert| LedgerEntry {
                key: alert.ledger_key(&self.account_id),
                last_notified_at: sent_at,
            })
            .collect()
    }

    pub fn shows_upsell(&self) -> bool {
        matches!(self.tier, Tier::Free)
    }

    pub fn summary_lines(&self) -> Vec<String> {
        self.alerts.iter().map(DigestAlert::summary).collect()
    }

    pub fn greeting_name(&self) -> &str {
        self.display_name.as_deref().filter(|name| !name.trim().is_empty()).unwrap_or("there")
    }
}

fn items(count: usize) -> String {
    if count == 1 {
        "1 maintenance item".to_string()
    } else {
        format!("{count} maintenance items")
    }
}
