//! Classifies every (vehicle, item type) pair of one account and runs each
//! through the alert policy.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::account::Account;
use crate::domain::service_record::{latest_record, ServiceRecord};
use crate::domain::vehicle::{Vehicle, VehicleId};
use crate::maintenance::catalog::CATALOG;
use crate::maintenance::classifier::classify;
use crate::notifications::digest::DigestAlert;
use crate::notifications::ledger::{LedgerEntry, PriorAlerts};
use crate::notifications::policy::{decide, AlertAction};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ClearInstruction {
    pub vehicle_id: VehicleId,
    pub item_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AccountScan {
    pub alerts: Vec<DigestAlert>,
    pub clears: Vec<ClearInstruction>,
}

pub fn scan_account(
    account: &Account,
    vehicles: &[Vehicle],
    records: &[ServiceRecord],
    ledger: &[LedgerEntry],
    now: DateTime<Utc>,
) -> AccountScan {
    let mut records_by_key: HashMap<(&str, &str), Vec<&ServiceRecord>> = HashMap::new();
    for record in records {
        records_by_key
            .entry((record.vehicle_id.0.as_str(), record.item_type.as_str()))
            .or_default()
            .push(record);
    }

    let mut priors: HashMap<(&str, &str), PriorAlerts> = HashMap::new();
    for entry in ledger.iter().filter(|entry| entry.key.account_id == account.id) {
        priors
            .entry((entry.key.vehicle_id.0.as_str(), entry.key.item_type.as_str()))
            .or_default()
            .record(entry.key.level, entry.last_notified_at);
    }

    let policy = account.notification_policy();
    let mut scan = AccountScan::default();

    for vehicle in vehicles {
        for item in CATALOG {
            let key = (vehicle.id.0.as_str(), item.key);
            let latest =
                records_by_key.get(&key).and_then(|records| latest_record(records.iter().copied()));
            let classification =
                classify(item, latest, vehicle.current_odometer, account.tier, now);
            let prior = priors.get(&key).copied().unwrap_or_default();
            let action = decide(classification.status, &prior, policy, now);

            match action {
                AlertAction::Alert(level) | AlertAction::AlertAndRefresh(level) => {
                    scan.alerts.push(DigestAlert {
                        vehicle_id: vehicle.id.clone(),
                        vehicle_name: vehicle.name.clone(),
                        item_type: item.key.to_string(),
                        item_label: item.label.to_string(),
                        level,
                        detail: classification.detail,
                        repeat: matches!(action, AlertAction::AlertAndRefresh(_)),
                    });
                }
                AlertAction::ClearLedger => scan.clears.push(ClearInstruction {
                    vehicle_id: vehicle.id.clone(),
                    item_type: item.key.to_string(),
                }),
                AlertAction::None => {}
            }
        }
    }

    scan
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};

    use super::{scan_account, ClearInstruction};
    use crate::domain::account::{Account, AccountId, NotificationFrequency, Tier};
    use crate::domain::service_record::{ServiceRecord, ServiceRecordId};
    use crate::domain::vehicle::{Vehicle, VehicleId};
    use crate::notifications::ledger::{AlertLevel, LedgerEntry, LedgerKey};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).single().expect("valid timestamp")
    }

    fn days_ago(days: u64) -> NaiveDate {
        now().date_naive().checked_sub_days(Days::new(days)).expect("date in range")
    }

    fn account(tier: Tier) -> Account {
        Account {
            id: AccountId("acct-1".to_string()),
            email: "driver@example.com".to_string(),
            display_name: Some("Sam".to_string()),
            tier,
            notifications_enabled: true,
            notification_frequency: NotificationFrequency::Weekly,
            warning_enabled: true,
            last_notification_sent_at: None,
        }
    }

    fn vehicle(id: &str, odometer: Option<u32>) -> Vehicle {
        Vehicle {
            id: VehicleId(id.to_string()),
            account_id: AccountId("acct-1".to_string()),
            name: format!("Vehicle {id}"),
            current_odometer: odometer,
        }
    }

    fn record(
        id: &str,
        vehicle: &str,
        item: &str,
        date: NaiveDate,
        odo: Option<u32>,
    ) -> ServiceRecord {
        ServiceRecord {
            id: ServiceRecordId(id.to_string()),
            vehicle_id: VehicleId(vehicle.to_string()),
            item_type: item.to_string(),
            service_date: date,
            odometer_at_service: odo,
            next_due_date: None,
            next_due_distance: None,
        }
    }

    fn ledger_entry(
        vehicle: &str,
        item: &str,
        level: AlertLevel,
        at: DateTime<Utc>,
    ) -> LedgerEntry {
        LedgerEntry {
            key: LedgerKey {
                account_id: AccountId("acct-1".to_string()),
                vehicle_id: VehicleId(vehicle.to_string()),
                item_type: item.to_string(),
                level,
            },
            last_notified_at: at,
        }
    }

    #[test]
    fn vehicles_without_records_are_unknown_and_quiet() {
        let vehicles = [vehicle("veh-1", Some(10_000)), vehicle("veh-2", None)];
        let scan = scan_account(&account(Tier::Personal), &vehicles, &[], &[], now());

        assert!(scan.alerts.is_empty());
        assert!(scan.clears.is_empty());
    }

    #[test]
    fn only_the_latest_record_drives_the_status() {
        let vehicles = [vehicle("veh-1", None)];
        let records = [
            record("r-old", "veh-1", "battery", days_ago(2_000), None),
            record("r-new", "veh-1", "battery", days_ago(100), None),
        ];
        let scan = scan_account(&account(Tier::Personal), &vehicles, &records, &[], now());

        assert!(scan.alerts.is_empty(), "old battery record must not alert: {:?}", scan.alerts);

        let reversed = [records[1].clone(), records[0].clone()];
        let scan = scan_account(&account(Tier::Personal), &vehicles, &reversed, &[], now());
        assert!(scan.alerts.is_empty());
    }

    #[test]
    fn overdue_items_become_alerts_and_recovered_items_become_clears() {
        let vehicles = [vehicle("veh-1", Some(60_000))];
        let records = [
            record("r-1", "veh-1", "oil_change", days_ago(250), Some(50_000)),
            record("r-2", "veh-1", "tire_rotation", days_ago(10), Some(59_900)),
        ];
        let alerted_at = now() - Duration::days(3);
        let ledger = [ledger_entry("veh-1", "tire_rotation", AlertLevel::Overdue, alerted_at)];

        let scan = scan_account(&account(Tier::Free), &vehicles, &records, &ledger, now());

        assert_eq!(scan.alerts.len(), 1);
        assert_eq!(scan.alerts[0].item_type, "oil_change");
        assert_eq!(scan.alerts[0].level, AlertLevel::Overdue);
        assert!(!scan.alerts[0].repeat);
        assert_eq!(
            scan.clears,
            vec![ClearInstruction {
                vehicle_id: VehicleId("veh-1".to_string()),
                item_type: "tire_rotation".to_string(),
            }]
        );
    }

    #[test]
    fn repeat_alerts_are_flagged() {
        let vehicles = [vehicle("veh-1", None)];
        let records = [record("r-1", "veh-1", "registration", days_ago(500), None)];
        let ledger =
            [ledger_entry("veh-1", "registration", AlertLevel::Overdue, now() - Duration::days(8))];

        let scan = scan_account(&account(Tier::Business), &vehicles, &records, &ledger, now());

        assert_eq!(scan.alerts.len(), 1);
        assert!(scan.alerts[0].repeat);
    }
}
