use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use fleetpulse_core::domain::account::AccountId;
use fleetpulse_core::domain::service_record::{ServiceRecord, ServiceRecordId};
use fleetpulse_core::domain::vehicle::{Vehicle, VehicleId};
use fleetpulse_core::errors::ApplicationError;
use fleetpulse_core::notifications::ports::FleetRecords;

use super::{
    format_date, parse_date, parse_optional_date, parse_optional_u32, RepositoryError,
};
use crate::DbPool;

/// Vehicles and their service history.
pub struct SqlFleetRepository {
    pool: DbPool,
}

impl SqlFleetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save_vehicle(&self, vehicle: &Vehicle) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO vehicle (id, account_id, name, current_odometer, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                account_id = excluded.account_id,
                name = excluded.name,
                current_odometer = excluded.current_odometer,
                updated_at = excluded.updated_at",
        )
        .bind(&vehicle.id.0)
        .bind(&vehicle.account_id.0)
        .bind(&vehicle.name)
        .bind(vehicle.current_odometer.map(i64::from))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_service_record(&self, record: &ServiceRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO service_record (
                id, vehicle_id, item_type, service_date, odometer_at_service,
                next_due_date, next_due_distance, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                vehicle_id = excluded.vehicle_id,
                item_type = excluded.item_type,
                service_date = excluded.service_date,
                odometer_at_service = excluded.odometer_at_service,
                next_due_date = excluded.next_due_date,
                next_due_distance = excluded.next_due_distance",
        )
        .bind(&record.id.0)
        .bind(&record.vehicle_id.0)
        .bind(&record.item_type)
        .bind(format_date(record.service_date))
        .bind(record.odometer_at_service.map(i64::from))
        .bind(record.next_due_date.map(format_date))
        .bind(record.next_due_distance.map(i64::from))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_vehicles(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Vehicle>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, account_id, name, current_odometer
             FROM vehicle
             WHERE account_id = ?
             ORDER BY id",
        )
        .bind(&account_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(vehicle_from_row).collect()
    }

    pub async fn list_service_records(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<ServiceRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT sr.id, sr.vehicle_id, sr.item_type, sr.service_date,
                    sr.odometer_at_service, sr.next_due_date, sr.next_due_distance
             FROM service_record sr
             JOIN vehicle v ON v.id = sr.vehicle_id
             WHERE v.account_id = ?
             ORDER BY sr.vehicle_id, sr.item_type, sr.service_date DESC, sr.id",
        )
        .bind(&account_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(service_record_from_row).collect()
    }
}

#[async_trait::async_trait]
impl FleetRecords for SqlFleetRepository {
    async fn vehicles_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Vehicle>, ApplicationError> {
        Ok(self.list_vehicles(account_id).await?)
    }

    async fn service_records_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<ServiceRecord>, ApplicationError> {
        Ok(self.list_service_records(account_id).await?)
    }
}

fn vehicle_from_row(row: SqliteRow) -> Result<Vehicle, RepositoryError> {
    Ok(Vehicle {
        id: VehicleId(row.try_get("id")?),
        account_id: AccountId(row.try_get("account_id")?),
        name: row.try_get("name")?,
        current_odometer: parse_optional_u32("current_odometer", row.try_get("current_odometer")?)?,
    })
}

fn service_record_from_row(row: SqliteRow) -> Result<ServiceRecord, RepositoryError> {
    Ok(ServiceRecord {
        id: ServiceRecordId(row.try_get("id")?),
        vehicle_id: VehicleId(row.try_get("vehicle_id")?),
        item_type: row.try_get("item_type")?,
        service_date: parse_date("service_date", row.try_get("service_date")?)?,
        odometer_at_service: parse_optional_u32(
            "odometer_at_service",
            row.try_get("odometer_at_service")?,
        )?,
        next_due_date: parse_optional_date("next_due_date", row.try_get("next_due_date")?)?,
        next_due_distance: parse_optional_u32(
            "next_due_distance",
            row.try_get("next_due_distance")?,
        )?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use fleetpulse_core::domain::account::{Account, AccountId, NotificationFrequency, Tier};
    use fleetpulse_core::domain::service_record::{ServiceRecord, ServiceRecordId};
    use fleetpulse_core::domain::vehicle::{Vehicle, VehicleId};
    use fleetpulse_core::notifications::ports::FleetRecords;

    use super::SqlFleetRepository;
    use crate::migrations;
    use crate::repositories::SqlAccountRepository;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let accounts = SqlAccountRepository::new(pool.clone());
        for id in ["acct-1", "acct-2"] {
            accounts
                .save(&Account {
                    id: AccountId(id.to_string()),
                    email: format!("{id}@example.com"),
                    display_name: None,
                    tier: Tier::Personal,
                    notifications_enabled: true,
                    notification_frequency: NotificationFrequency::Weekly,
                    warning_enabled: true,
                    last_notification_sent_at: None,
                })
                .await
                .expect("save account");
        }
        pool
    }

    fn vehicle(id: &str, account: &str, odometer: Option<u32>) -> Vehicle {
        Vehicle {
            id: VehicleId(id.to_string()),
            account_id: AccountId(account.to_string()),
            name: format!("Vehicle {id}"),
            current_odometer: odometer,
        }
    }

    fn record(id: &str, vehicle: &str, date: NaiveDate) -> ServiceRecord {
        ServiceRecord {
            id: ServiceRecordId(id.to_string()),
            vehicle_id: VehicleId(vehicle.to_string()),
            item_type: "oil_change".to_string(),
            service_date: date,
            odometer_at_service: Some(42_000),
            next_due_date: NaiveDate::from_ymd_opt(2027, 1, 15),
            next_due_distance: None,
        }
    }

    #[tokio::test]
    async fn vehicles_and_records_round_trip_per_account() {
        let repo = SqlFleetRepository::new(setup_pool().await);
        let mine = vehicle("veh-1", "acct-1", Some(45_000));
        let theirs = vehicle("veh-2", "acct-2", None);
        repo.save_vehicle(&mine).await.expect("save vehicle");
        repo.save_vehicle(&theirs).await.expect("save vehicle");

        let first = record("rec-1", "veh-1", NaiveDate::from_ymd_opt(2026, 3, 1).expect("date"));
        let other = record("rec-2", "veh-2", NaiveDate::from_ymd_opt(2026, 4, 1).expect("date"));
        repo.save_service_record(&first).await.expect("save record");
        repo.save_service_record(&other).await.expect("save record");

        let account = AccountId("acct-1".to_string());
        let vehicles = repo.vehicles_for_account(&account).await.expect("vehicles");
        let records = repo.service_records_for_account(&account).await.expect("records");

        assert_eq!(vehicles, vec![mine]);
        assert_eq!(records, vec![first]);
    }

    #[tokio::test]
    async fn vehicle_without_mileage_keeps_null_odometer() {
        let repo = SqlFleetRepository::new(setup_pool().await);
        repo.save_vehicle(&vehicle("veh-9", "acct-2", None)).await.expect("save vehicle");

        let vehicles = repo.list_vehicles(&AccountId("acct-2".to_string())).await.expect("list");

        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].current_odometer, None);
    }

    #[tokio::test]
    async fn vehicle_for_unknown_account_violates_foreign_key() {
        let repo = SqlFleetRepository::new(setup_pool().await);
        let result = repo.save_vehicle(&vehicle("veh-x", "acct-missing", None)).await;

        assert!(result.is_err());
    }
}
