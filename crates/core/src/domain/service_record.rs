use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::vehicle::VehicleId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceRecordId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: ServiceRecordId,
    pub vehicle_id: VehicleId,
    pub item_type: String,
    pub service_date: NaiveDate,
    pub odometer_at_service: Option<u32>,
    pub next_due_date: Option<NaiveDate>,
    pub next_due_distance: Option<u32>,
}

/// Picks the record with the latest `service_date`. Ties keep the first one seen.
pub fn latest_record<'a, I>(records: I) -> Option<&'a ServiceRecord>
where
    I: IntoIterator<Item = &'a ServiceRecord>,
{
    records.into_iter().fold(None, |latest: Option<&ServiceRecord>, record| match latest {
        Some(current) if current.service_date >= record.service_date => Some(current),
        _ => Some(record),
    })
}
