//! Interval model and status classification for (vehicle, item type) pairs.

pub mod catalog;
pub mod classifier;

pub use catalog::{MaintenanceItem, CATALOG};
pub use classifier::{classify, Classification, MaintenanceStatus};
