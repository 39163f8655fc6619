//! Collaborators the digest engine reads from and writes to.
//!
//! Every port reports failures as [`ApplicationError`]; storage adapters map
//! their own errors into `ApplicationError::Persistence`, mail transports into
//! `ApplicationError::Integration`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::account::{Account, AccountId};
use crate::domain::service_record::ServiceRecord;
use crate::domain::vehicle::{Vehicle, VehicleId};
use crate::errors::ApplicationError;
use crate::notifications::ledger::LedgerEntry;

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Accounts with notifications switched on, in a stable order.
    async fn list_notifiable_accounts(&self) -> Result<Vec<Account>, ApplicationError>;

    async fn record_notification_sent(
        &self,
        account_id: &AccountId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError>;
}

#[async_trait]
pub trait FleetRecords: Send + Sync {
    async fn vehicles_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Vehicle>, ApplicationError>;

    async fn service_records_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<ServiceRecord>, ApplicationError>;
}

#[async_trait]
pub trait NotificationLedger: Send + Sync {
    async fn entries_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<LedgerEntry>, ApplicationError>;

    /// Insert the row or refresh `last_notified_at` when the key exists.
    async fn upsert(&self, entry: &LedgerEntry) -> Result<(), ApplicationError>;

    /// Remove both the warning and the overdue row for the key.
    async fn clear(
        &self,
        account_id: &AccountId,
        vehicle_id: &VehicleId,
        item_type: &str,
    ) -> Result<(), ApplicationError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), ApplicationError>;
}
