pub mod config;
pub mod domain;
pub mod errors;
pub mod maintenance;
pub mod notifications;

pub use domain::account::{Account, AccountId, NotificationFrequency, NotificationPolicy, Tier};
pub use domain::service_record::{ServiceRecord, ServiceRecordId};
pub use domain::vehicle::{Vehicle, VehicleId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use maintenance::{classify, Classification, MaintenanceStatus};
pub use notifications::{DigestEngine, DigestRenderer, ExecuteReport, PreviewReport};
