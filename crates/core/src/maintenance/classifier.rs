//! Derives a maintenance status for one (vehicle, item type) pair.
//!
//! Two independent checks run against the latest service record: a time check
//! (user due date for paid tiers, else the interval in months) and a distance
//! check (user due mileage for paid tiers, else the interval in miles). The more
//! urgent result wins. The distance check needs both the current odometer and
//! the odometer reading on the record; without either it is skipped.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::account::Tier;
use crate::domain::service_record::ServiceRecord;
use crate::maintenance::catalog::MaintenanceItem;

/// Average month length used for all elapsed-month arithmetic. Alert timing
/// depends on this exact value.
pub const AVERAGE_DAYS_PER_MONTH: f64 = 30.44;
pub const DUE_DATE_WARNING_DAYS: i64 = 30;
pub const DUE_DISTANCE_WARNING_MILES: i64 = 500;
pub const DETAIL_SEPARATOR: &str = " · ";

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Variant order is urgency order, so `max()` picks the most urgent status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Unknown,
    Good,
    Warning,
    Overdue,
}

impl MaintenanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Overdue => "overdue",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: MaintenanceStatus,
    pub detail: String,
}

impl Classification {
    fn unknown() -> Self {
        Self { status: MaintenanceStatus::Unknown, detail: String::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct CheckOutcome {
    status: MaintenanceStatus,
    detail: String,
}

pub fn classify(
    item: &MaintenanceItem,
    latest: Option<&ServiceRecord>,
    current_odometer: Option<u32>,
    tier: Tier,
    now: DateTime<Utc>,
) -> Classification {
    if !item.is_classifiable() {
        return Classification::unknown();
    }
    let Some(record) = latest else {
        return Classification::unknown();
    };

    let checks: Vec<CheckOutcome> =
        [time_check(item, record, tier, now), distance_check(item, record, current_odometer, tier)]
            .into_iter()
            .flatten()
            .collect();

    let Some(status) = checks.iter().map(|check| check.status).max() else {
        return Classification::unknown();
    };

    let detail = checks
        .iter()
        .filter(|check| check.status == status)
        .map(|check| check.detail.as_str())
        .collect::<Vec<_>>()
        .join(DETAIL_SEPARATOR);

    Classification { status, detail }
}

fn time_check(
    item: &MaintenanceItem,
    record: &ServiceRecord,
    tier: Tier,
    now: DateTime<Utc>,
) -> Option<CheckOutcome> {
    if let Some(due_date) = record.next_due_date.filter(|_| tier.honors_custom_due_values()) {
        let days_left = (due_date - now.date_naive()).num_days();
        let status = if days_left < 0 {
            MaintenanceStatus::Overdue
        } else if days_left <= DUE_DATE_WARNING_DAYS {
            gate_warning(tier)
        } else {
            MaintenanceStatus::Good
        };
        return Some(CheckOutcome { status, detail: describe_days(days_left) });
    }

    let interval_months = f64::from(item.interval_months?);
    let elapsed_months = elapsed_days(record.service_date, now) / AVERAGE_DAYS_PER_MONTH;
    let progress = elapsed_months / interval_months;
    let remaining_months = interval_months * item.overdue_fraction - elapsed_months;

    Some(CheckOutcome {
        status: progress_status(progress, item, tier),
        detail: describe_months(remaining_months),
    })
}

fn distance_check(
    item: &MaintenanceItem,
    record: &ServiceRecord,
    current_odometer: Option<u32>,
    tier: Tier,
) -> Option<CheckOutcome> {
    let current = i64::from(current_odometer?);
    let at_service = i64::from(record.odometer_at_service?);

    if let Some(due_distance) = record.next_due_distance.filter(|_| tier.honors_custom_due_values())
    {
        let remaining = i64::from(due_distance) - current;
        let status = if remaining < 0 {
            MaintenanceStatus::Overdue
        } else if remaining <= DUE_DISTANCE_WARNING_MILES {
            gate_warning(tier)
        } else {
            MaintenanceStatus::Good
        };
        return Some(CheckOutcome { status, detail: describe_miles(remaining) });
    }

    let interval = f64::from(item.interval_distance?);
    let driven = (current - at_service).max(0) as f64;
    let progress = driven / interval;
    let remaining = (interval * item.overdue_fraction - driven).round() as i64;

    Some(CheckOutcome {
        status: progress_status(progress, item, tier),
        detail: describe_miles(remaining),
    })
}

fn progress_status(progress: f64, item: &MaintenanceItem, tier: Tier) -> MaintenanceStatus {
    if progress >= item.overdue_fraction {
        MaintenanceStatus::Overdue
    } else if progress >= item.warning_fraction {
        gate_warning(tier)
    } else {
        MaintenanceStatus::Good
    }
}

fn gate_warning(tier: Tier) -> MaintenanceStatus {
    if tier.can_see_warnings() {
        MaintenanceStatus::Warning
    } else {
        MaintenanceStatus::Good
    }
}

fn elapsed_days(service_date: NaiveDate, now: DateTime<Utc>) -> f64 {
    let serviced_at = service_date.and_time(NaiveTime::MIN).and_utc();
    (now - serviced_at).num_milliseconds() as f64 / MILLIS_PER_DAY
}

fn describe_days(days_left: i64) -> String {
    if days_left < 0 {
        format!("{} overdue", day_count(-days_left))
    } else {
        format!("{} remaining", day_count(days_left))
    }
}

fn describe_months(remaining_months: f64) -> String {
    if remaining_months < 0.0 {
        let overdue = -remaining_months;
        if overdue < 1.0 {
            let days = (overdue * AVERAGE_DAYS_PER_MONTH).round() as i64;
            return format!("{} overdue", day_count(days));
        }
        return format!("~{} mo overdue", overdue.round() as i64);
    }
    format!("~{} mo remaining", remaining_months.round() as i64)
}

fn describe_miles(remaining: i64) -> String {
    if remaining < 0 {
        format!("{} mi overdue", group_thousands(-remaining))
    } else {
        format!("{} mi remaining", group_thousands(remaining))
    }
}

fn day_count(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
