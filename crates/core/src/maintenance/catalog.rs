//! Static renewal intervals per maintenance item type.

use serde::Serialize;

pub const DEFAULT_WARNING_FRACTION: f64 = 0.8;
pub const DEFAULT_OVERDUE_FRACTION: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MaintenanceItem {
    pub key: &'static str,
    pub label: &'static str,
    pub interval_months: Option<u32>,
    pub interval_distance: Option<u32>,
    pub warning_fraction: f64,
    pub overdue_fraction: f64,
}

impl MaintenanceItem {
    const fn new(
        key: &'static str,
        label: &'static str,
        interval_months: Option<u32>,
        interval_distance: Option<u32>,
    ) -> Self {
        Self {
            key,
            label,
            interval_months,
            interval_distance,
            warning_fraction: DEFAULT_WARNING_FRACTION,
            overdue_fraction: DEFAULT_OVERDUE_FRACTION,
        }
    }

    /// Types without any interval can only ever classify as `unknown`.
    pub fn is_classifiable(&self) -> bool {
        self.interval_months.is_some() || self.interval_distance.is_some()
    }
}

pub const CATALOG: &[MaintenanceItem] = &[
    MaintenanceItem::new("oil_change", "Oil Change", Some(6), Some(5_000)),
    MaintenanceItem::new("tire_rotation", "Tire Rotation", Some(6), Some(6_000)),
    MaintenanceItem::new("brake_inspection", "Brake Inspection", Some(12), Some(12_000)),
    MaintenanceItem::new("engine_air_filter", "Engine Air Filter", Some(12), Some(15_000)),
    MaintenanceItem::new("cabin_air_filter", "Cabin Air Filter", Some(12), Some(15_000)),
    MaintenanceItem::new("wiper_blades", "Wiper Blades", Some(12), None),
    MaintenanceItem::new("brake_fluid", "Brake Fluid", Some(24), None),
    MaintenanceItem::new("coolant_flush", "Coolant Flush", Some(24), Some(30_000)),
    MaintenanceItem::new("transmission_fluid", "Transmission Fluid", Some(48), Some(60_000)),
    MaintenanceItem::new("spark_plugs", "Spark Plugs", None, Some(60_000)),
    MaintenanceItem::new("battery", "Battery", Some(48), None),
    MaintenanceItem::new("registration", "Registration Renewal", Some(12), None),
    MaintenanceItem::new("safety_inspection", "Safety Inspection", Some(12), None),
    MaintenanceItem::new("other", "Other Service", None, None),
];

pub fn find(key: &str) -> Option<&'static MaintenanceItem> {
    CATALOG.iter().find(|item| item.key == key)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{find, CATALOG};

    #[test]
    fn catalog_keys_are_unique() {
        let keys: HashSet<_> = CATALOG.iter().map(|item| item.key).collect();
        assert_eq!(keys.len(), CATALOG.len());
    }

    #[test]
    fn fractions_are_ordered_within_unit_range() {
        for item in CATALOG {
            assert!(item.warning_fraction > 0.0 && item.warning_fraction < item.overdue_fraction);
            assert!(item.overdue_fraction <= 1.0, "{} overdue fraction", item.key);
        }
    }

    #[test]
    fn only_other_is_unclassifiable() {
        let unclassifiable: Vec<_> =
            CATALOG.iter().filter(|item| !item.is_classifiable()).map(|item| item.key).collect();
        assert_eq!(unclassifiable, vec!["other"]);
        assert_eq!(find("oil_change").and_then(|item| item.interval_distance), Some(5_000));
        assert!(find("hovercraft_skirt").is_none());
    }
}
