//! In-process implementations of the engine ports for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::account::{Account, AccountId};
use crate::domain::service_record::{ServiceRecord, ServiceRecordId};
use crate::domain::vehicle::{Vehicle, VehicleId};
use crate::errors::ApplicationError;
use crate::notifications::ledger::{LedgerEntry, LedgerKey};
use crate::notifications::ports::{
    AccountDirectory, FleetRecords, Mailer, NotificationLedger, OutboundEmail,
};

#[derive(Default)]
pub struct InMemoryFleetStore {
    accounts: RwLock<BTreeMap<AccountId, Account>>,
    vehicles: RwLock<BTreeMap<VehicleId, Vehicle>>,
    records: RwLock<HashMap<String, ServiceRecord>>,
    failing_accounts: RwLock<BTreeSet<AccountId>>,
}

impl InMemoryFleetStore {
    pub async fn insert_account(&self, account: Account) {
        self.accounts.write().await.insert(account.id.clone(), account);
    }

    pub async fn insert_vehicle(&self, vehicle: Vehicle) {
        self.vehicles.write().await.insert(vehicle.id.clone(), vehicle);
    }

    pub async fn insert_record(&self, record: ServiceRecord) {
        self.records.write().await.insert(record.id.0.clone(), record);
    }

    pub async fn remove_record(&self, id: &ServiceRecordId) {
        self.records.write().await.remove(&id.0);
    }

    pub async fn account(&self, id: &AccountId) -> Option<Account> {
        self.accounts.read().await.get(id).cloned()
    }

    /// Makes every fleet read for `account_id` fail with a persistence error.
    pub async fn fail_reads_for(&self, account_id: AccountId) {
        self.failing_accounts.write().await.insert(account_id);
    }

    async fn check_readable(&self, account_id: &AccountId) -> Result<(), ApplicationError> {
        if self.failing_accounts.read().await.contains(account_id) {
            return Err(ApplicationError::Persistence(format!(
                "fleet records unavailable for account {account_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for InMemoryFleetStore {
    async fn list_notifiable_accounts(&self) -> Result<Vec<Account>, ApplicationError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().filter(|account| account.notifications_enabled).cloned().collect())
    }

    async fn record_notification_sent(
        &self,
        account_id: &AccountId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(account_id) {
            Some(account) => {
                account.last_notification_sent_at = Some(sent_at);
                Ok(())
            }
            None => Err(ApplicationError::Persistence(format!("account {account_id} not found"))),
        }
    }
}

#[async_trait]
impl FleetRecords for InMemoryFleetStore {
    async fn vehicles_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Vehicle>, ApplicationError> {
        self.check_readable(account_id).await?;
        let vehicles = self.vehicles.read().await;
        Ok(vehicles.values().filter(|vehicle| &vehicle.account_id == account_id).cloned().collect())
    }

    async fn service_records_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<ServiceRecord>, ApplicationError> {
        self.check_readable(account_id).await?;
        let vehicles = self.vehicles.read().await;
        let records = self.records.read().await;

        let mut owned: Vec<ServiceRecord> = records
            .values()
            .filter(|record| {
                vehicles
                    .get(&record.vehicle_id)
                    .is_some_and(|vehicle| &vehicle.account_id == account_id)
            })
            .cloned()
            .collect();
        owned.sort_by(|left, right| left.id.0.cmp(&right.id.0));
        Ok(owned)
    }
}

#[derive(Default)]
pub struct InMemoryNotificationLedger {
    entries: RwLock<BTreeMap<LedgerKey, DateTime<Utc>>>,
    fail_writes: RwLock<bool>,
    fail_clears: RwLock<bool>,
}

impl InMemoryNotificationLedger {
    pub async fn snapshot(&self) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(key, at)| LedgerEntry { key: key.clone(), last_notified_at: *at })
            .collect()
    }

    pub async fn fail_writes(&self, fail: bool) {
        *self.fail_writes.write().await = fail;
    }

    /// Makes `clear` fail while `upsert` keeps working.
    pub async fn fail_clears(&self, fail: bool) {
        *self.fail_clears.write().await = fail;
    }

    async fn check_writable(&self) -> Result<(), ApplicationError> {
        if *self.fail_writes.read().await {
            return Err(ApplicationError::Persistence("ledger is read-only".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationLedger for InMemoryNotificationLedger {
    async fn entries_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<LedgerEntry>, ApplicationError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, _)| &key.account_id == account_id)
            .map(|(key, at)| LedgerEntry { key: key.clone(), last_notified_at: *at })
            .collect())
    }

    async fn upsert(&self, entry: &LedgerEntry) -> Result<(), ApplicationError> {
        self.check_writable().await?;
        self.entries.write().await.insert(entry.key.clone(), entry.last_notified_at);
        Ok(())
    }

    async fn clear(
        &self,
        account_id: &AccountId,
        vehicle_id: &VehicleId,
        item_type: &str,
    ) -> Result<(), ApplicationError> {
        self.check_writable().await?;
        if *self.fail_clears.read().await {
            return Err(ApplicationError::Persistence("ledger clear rejected".to_string()));
        }
        self.entries.write().await.retain(|key, _| {
            !(&key.account_id == account_id
                && &key.vehicle_id == vehicle_id
                && key.item_type == item_type)
        });
        Ok(())
    }
}

/// Captures outbound mail instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: RwLock<Vec<OutboundEmail>>,
    failing_recipients: BTreeSet<String>,
}

impl RecordingMailer {
    pub fn failing_for<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: RwLock::new(Vec::new()),
            failing_recipients: recipients.into_iter().map(Into::into).collect(),
        }
    }

    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), ApplicationError> {
        if self.failing_recipients.contains(&email.to) {
            return Err(ApplicationError::Integration(format!("mail rejected for {}", email.to)));
        }
        self.sent.write().await.push(email.clone());
        Ok(())
    }
}
