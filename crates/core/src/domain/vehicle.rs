use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub String);

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub account_id: AccountId,
    pub name: String,
    /// `None` when mileage has never been recorded; distance checks are skipped.
    pub current_odometer: Option<u32>,
}
