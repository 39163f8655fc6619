use sqlx::{sqlite::SqliteRow, Row};

use fleetpulse_core::domain::account::AccountId;
use fleetpulse_core::domain::vehicle::VehicleId;
use fleetpulse_core::errors::ApplicationError;
use fleetpulse_core::notifications::ledger::{AlertLevel, LedgerEntry, LedgerKey};
use fleetpulse_core::notifications::ports::NotificationLedger;

use super::{parse_timestamp, RepositoryError};
use crate::DbPool;

/// Durable "last notified at" rows keyed by (account, vehicle, item type, status).
pub struct SqlNotificationLedgerRepository {
    pool: DbPool,
}

impl SqlNotificationLedgerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT account_id, vehicle_id, item_type, status, last_notified_at
             FROM notification_ledger
             WHERE account_id = ?
             ORDER BY vehicle_id, item_type, status",
        )
        .bind(&account_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }

    pub async fn save(&self, entry: &LedgerEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO notification_ledger
                (account_id, vehicle_id, item_type, status, last_notified_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(account_id, vehicle_id, item_type, status) DO UPDATE SET
                last_notified_at = excluded.last_notified_at",
        )
        .bind(&entry.key.account_id.0)
        .bind(&entry.key.vehicle_id.0)
        .bind(&entry.key.item_type)
        .bind(entry.key.level.as_str())
        .bind(entry.last_notified_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_key(
        &self,
        account_id: &AccountId,
        vehicle_id: &VehicleId,
        item_type: &str,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM notification_ledger
             WHERE account_id = ? AND vehicle_id = ? AND item_type = ?",
        )
        .bind(&account_id.0)
        .bind(&vehicle_id.0)
        .bind(item_type)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl NotificationLedger for SqlNotificationLedgerRepository {
    async fn entries_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<LedgerEntry>, ApplicationError> {
        Ok(self.list_for_account(account_id).await?)
    }

    async fn upsert(&self, entry: &LedgerEntry) -> Result<(), ApplicationError> {
        Ok(self.save(entry).await?)
    }

    async fn clear(
        &self,
        account_id: &AccountId,
        vehicle_id: &VehicleId,
        item_type: &str,
    ) -> Result<(), ApplicationError> {
        self.delete_key(account_id, vehicle_id, item_type).await?;
        Ok(())
    }
}

fn entry_from_row(row: SqliteRow) -> Result<LedgerEntry, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let level = status_raw
        .parse::<AlertLevel>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(LedgerEntry {
        key: LedgerKey {
            account_id: AccountId(row.try_get("account_id")?),
            vehicle_id: VehicleId(row.try_get("vehicle_id")?),
            item_type: row.try_get("item_type")?,
            level,
        },
        last_notified_at: parse_timestamp("last_notified_at", row.try_get("last_notified_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use fleetpulse_core::domain::account::{Account, AccountId, NotificationFrequency, Tier};
    use fleetpulse_core::domain::vehicle::{Vehicle, VehicleId};
    use fleetpulse_core::notifications::ledger::{AlertLevel, LedgerEntry, LedgerKey};
    use fleetpulse_core::notifications::ports::NotificationLedger;

    use super::SqlNotificationLedgerRepository;
    use crate::migrations;
    use crate::repositories::{SqlAccountRepository, SqlFleetRepository};
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlAccountRepository::new(pool.clone())
            .save(&Account {
                id: AccountId("acct-1".to_string()),
                email: "acct-1@example.com".to_string(),
                display_name: None,
                tier: Tier::Personal,
                notifications_enabled: true,
                notification_frequency: NotificationFrequency::Weekly,
                warning_enabled: true,
                last_notification_sent_at: None,
            })
            .await
            .expect("save account");
        SqlFleetRepository::new(pool.clone())
            .save_vehicle(&Vehicle {
                id: VehicleId("veh-1".to_string()),
                account_id: AccountId("acct-1".to_string()),
                name: "Civic".to_string(),
                current_odometer: Some(30_000),
            })
            .await
            .expect("save vehicle");
        pool
    }

    fn entry(item: &str, level: AlertLevel, at: &str) -> LedgerEntry {
        LedgerEntry {
            key: LedgerKey {
                account_id: AccountId("acct-1".to_string()),
                vehicle_id: VehicleId("veh-1".to_string()),
                item_type: item.to_string(),
                level,
            },
            last_notified_at: parse_ts(at),
        }
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    #[tokio::test]
    async fn upsert_refreshes_timestamp_instead_of_duplicating() {
        let repo = SqlNotificationLedgerRepository::new(setup_pool().await);
        repo.upsert(&entry("battery", AlertLevel::Overdue, "2026-09-01T06:00:00Z"))
            .await
            .expect("first upsert");
        repo.upsert(&entry("battery", AlertLevel::Overdue, "2026-10-01T06:00:00Z"))
            .await
            .expect("second upsert");

        let entries =
            repo.entries_for_account(&AccountId("acct-1".to_string())).await.expect("entries");

        assert_eq!(entries, vec![entry("battery", AlertLevel::Overdue, "2026-10-01T06:00:00Z")]);
    }

    #[tokio::test]
    async fn clear_removes_both_levels_for_one_item_only() {
        let repo = SqlNotificationLedgerRepository::new(setup_pool().await);
        for seeded in [
            entry("battery", AlertLevel::Warning, "2026-09-01T06:00:00Z"),
            entry("battery", AlertLevel::Overdue, "2026-10-01T06:00:00Z"),
            entry("oil_change", AlertLevel::Overdue, "2026-10-01T06:00:00Z"),
        ] {
            repo.upsert(&seeded).await.expect("upsert");
        }

        let removed = repo
            .delete_key(
                &AccountId("acct-1".to_string()),
                &VehicleId("veh-1".to_string()),
                "battery",
            )
            .await
            .expect("clear");
        let remaining =
            repo.entries_for_account(&AccountId("acct-1".to_string())).await.expect("entries");

        assert_eq!(removed, 2);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].key.item_type, "oil_change");
    }

    #[tokio::test]
    async fn clearing_a_missing_key_is_not_an_error() {
        let repo = SqlNotificationLedgerRepository::new(setup_pool().await);

        let cleared = repo
            .clear(&AccountId("acct-1".to_string()), &VehicleId("veh-1".to_string()), "wipers")
            .await;

        assert!(cleared.is_ok());
    }
}
