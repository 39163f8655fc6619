pub mod digest;
pub mod engine;
pub mod ledger;
pub mod memory;
pub mod policy;
pub mod ports;
pub mod render;
pub mod scanner;

pub use digest::{Digest, DigestAlert};
pub use engine::{DigestEngine, DigestPreview, ExecuteReport, PreviewReport};
pub use ledger::{AlertLevel, LedgerEntry, LedgerKey, PriorAlerts};
pub use policy::{decide, AlertAction};
pub use ports::{AccountDirectory, FleetRecords, Mailer, NotificationLedger, OutboundEmail};
pub use render::DigestRenderer;
pub use scanner::{scan_account, AccountScan};
