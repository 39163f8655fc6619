use chrono::{Days, NaiveDate};

use fleetpulse_core::domain::account::{Account, AccountId, NotificationFrequency, Tier};
use fleetpulse_core::domain::service_record::{ServiceRecord, ServiceRecordId};
use fleetpulse_core::domain::vehicle::{Vehicle, VehicleId};

use crate::connection::DbPool;
use crate::repositories::{RepositoryError, SqlAccountRepository, SqlFleetRepository};

/// Demo accounts covering each tier plus one with notifications switched off.
const SEED_ACCOUNTS: &[SeedAccount] = &[
    SeedAccount {
        id: "acct-demo-free",
        email: "free.driver@fleetpulse.local",
        display_name: "Casey",
        tier: Tier::Free,
        notifications_enabled: true,
        frequency: NotificationFrequency::Weekly,
        warning_enabled: true,
        description: "free tier: one-shot overdue alerts only",
    },
    SeedAccount {
        id: "acct-demo-personal",
        email: "personal.driver@fleetpulse.local",
        display_name: "Avery",
        tier: Tier::Personal,
        notifications_enabled: true,
        frequency: NotificationFrequency::Weekly,
        warning_enabled: true,
        description: "personal tier: warnings and weekly overdue repeats",
    },
    SeedAccount {
        id: "acct-demo-business",
        email: "fleet.manager@fleetpulse.local",
        display_name: "Morgan",
        tier: Tier::Business,
        notifications_enabled: true,
        frequency: NotificationFrequency::Daily,
        warning_enabled: true,
        description: "business tier: two vans, daily overdue repeats",
    },
    SeedAccount {
        id: "acct-demo-muted",
        email: "muted.driver@fleetpulse.local",
        display_name: "Riley",
        tier: Tier::Personal,
        notifications_enabled: false,
        frequency: NotificationFrequency::Monthly,
        warning_enabled: true,
        description: "notifications disabled: never scanned",
    },
];

const SEED_VEHICLES: &[SeedVehicle] = &[
    SeedVehicle {
        id: "veh-demo-civic",
        account_id: "acct-demo-free",
        name: "2014 Honda Civic",
        current_odometer: Some(98_000),
    },
    SeedVehicle {
        id: "veh-demo-outback",
        account_id: "acct-demo-personal",
        name: "2019 Subaru Outback",
        current_odometer: Some(54_000),
    },
    SeedVehicle {
        id: "veh-demo-van-1",
        account_id: "acct-demo-business",
        name: "Transit Van #1",
        current_odometer: Some(120_500),
    },
    SeedVehicle {
        id: "veh-demo-van-2",
        account_id: "acct-demo-business",
        name: "Transit Van #2",
        current_odometer: None,
    },
    SeedVehicle {
        id: "veh-demo-muted",
        account_id: "acct-demo-muted",
        name: "2008 Toyota Corolla",
        current_odometer: Some(180_000),
    },
];

const SEED_RECORDS: &[SeedRecord] = &[
    // 8 months and 6,000 mi since the last oil change.
    SeedRecord {
        id: "rec-demo-civic-oil",
        vehicle_id: "veh-demo-civic",
        item_type: "oil_change",
        days_ago: 244,
        odometer_at_service: Some(92_000),
        next_due_in_days: None,
    },
    SeedRecord {
        id: "rec-demo-civic-tires",
        vehicle_id: "veh-demo-civic",
        item_type: "tire_rotation",
        days_ago: 60,
        odometer_at_service: Some(96_500),
        next_due_in_days: None,
    },
    // About 5 months and 4,000 mi in: warning on both checks.
    SeedRecord {
        id: "rec-demo-outback-oil",
        vehicle_id: "veh-demo-outback",
        item_type: "oil_change",
        days_ago: 152,
        odometer_at_service: Some(50_000),
        next_due_in_days: None,
    },
    SeedRecord {
        id: "rec-demo-outback-registration",
        vehicle_id: "veh-demo-outback",
        item_type: "registration",
        days_ago: 355,
        odometer_at_service: None,
        next_due_in_days: Some(10),
    },
    SeedRecord {
        id: "rec-demo-van-1-brakes",
        vehicle_id: "veh-demo-van-1",
        item_type: "brake_inspection",
        days_ago: 426,
        odometer_at_service: Some(104_000),
        next_due_in_days: None,
    },
    SeedRecord {
        id: "rec-demo-van-2-battery",
        vehicle_id: "veh-demo-van-2",
        item_type: "battery",
        days_ago: 1_520,
        odometer_at_service: None,
        next_due_in_days: None,
    },
    SeedRecord {
        id: "rec-demo-van-2-wipers",
        vehicle_id: "veh-demo-van-2",
        item_type: "wiper_blades",
        days_ago: 30,
        odometer_at_service: None,
        next_due_in_days: None,
    },
    SeedRecord {
        id: "rec-demo-muted-oil",
        vehicle_id: "veh-demo-muted",
        item_type: "oil_change",
        days_ago: 400,
        odometer_at_service: Some(170_000),
        next_due_in_days: None,
    },
];

/// Deterministic demo fleet. Service dates are relative to the `today`
/// passed to [`DemoFleetDataset::load`], so the resulting statuses are stable.
pub struct DemoFleetDataset;

impl DemoFleetDataset {
    pub const ACCOUNT_IDS: [&'static str; 4] =
        ["acct-demo-free", "acct-demo-personal", "acct-demo-business", "acct-demo-muted"];

    /// Upserts every demo row; loading twice leaves the same data behind.
    pub async fn load(pool: &DbPool, today: NaiveDate) -> Result<SeedResult, RepositoryError> {
        let accounts = SqlAccountRepository::new(pool.clone());
        let fleet = SqlFleetRepository::new(pool.clone());

        for seed in SEED_ACCOUNTS {
            accounts.save(&seed.to_account()).await?;
        }
        for seed in SEED_VEHICLES {
            fleet.save_vehicle(&seed.to_vehicle()).await?;
        }
        for seed in SEED_RECORDS {
            fleet.save_service_record(&seed.to_record(today)?).await?;
        }

        Ok(SeedResult {
            accounts_seeded: SEED_ACCOUNTS
                .iter()
                .map(|seed| AccountSeedInfo {
                    account_id: seed.id,
                    tier: seed.tier.as_str(),
                    description: seed.description,
                })
                .collect(),
            vehicles_seeded: SEED_VEHICLES.len(),
            service_records_seeded: SEED_RECORDS.len(),
        })
    }

    /// Verify that every demo row exists.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for seed in SEED_ACCOUNTS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM account WHERE id = ?1 AND tier = ?2)",
            )
            .bind(seed.id)
            .bind(seed.tier.as_str())
            .fetch_one(pool)
            .await?;
            checks.push((seed.id, exists == 1));
        }

        for seed in SEED_VEHICLES {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM vehicle WHERE id = ?1 AND account_id = ?2)",
            )
            .bind(seed.id)
            .bind(seed.account_id)
            .fetch_one(pool)
            .await?;
            checks.push((seed.id, exists == 1));
        }

        for seed in SEED_RECORDS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM service_record WHERE id = ?1 AND item_type = ?2)",
            )
            .bind(seed.id)
            .bind(seed.item_type)
            .fetch_one(pool)
            .await?;
            checks.push((seed.id, exists == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the demo fleet. Vehicles, records and ledger rows cascade.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for account_id in Self::ACCOUNT_IDS {
            sqlx::query("DELETE FROM account WHERE id = ?1")
                .bind(account_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedAccount {
    id: &'static str,
    email: &'static str,
    display_name: &'static str,
    tier: Tier,
    notifications_enabled: bool,
    frequency: NotificationFrequency,
    warning_enabled: bool,
    description: &'static str,
}

impl SeedAccount {
    fn to_account(self) -> Account {
        Account {
            id: AccountId(self.id.to_string()),
            email: self.email.to_string(),
            display_name: Some(self.display_name.to_string()),
            tier: self.tier,
            notifications_enabled: self.notifications_enabled,
            notification_frequency: self.frequency,
            warning_enabled: self.warning_enabled,
            last_notification_sent_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedVehicle {
    id: &'static str,
    account_id: &'static str,
    name: &'static str,
    current_odometer: Option<u32>,
}

impl SeedVehicle {
    fn to_vehicle(self) -> Vehicle {
        Vehicle {
            id: VehicleId(self.id.to_string()),
            account_id: AccountId(self.account_id.to_string()),
            name: self.name.to_string(),
            current_odometer: self.current_odometer,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedRecord {
    id: &'static str,
    vehicle_id: &'static str,
    item_type: &'static str,
    days_ago: u64,
    odometer_at_service: Option<u32>,
    next_due_in_days: Option<u64>,
}

impl SeedRecord {
    fn to_record(self, today: NaiveDate) -> Result<ServiceRecord, RepositoryError> {
        let service_date = today.checked_sub_days(Days::new(self.days_ago)).ok_or_else(|| {
            RepositoryError::Decode(format!("seed date out of range for `{}`", self.id))
        })?;
        let next_due_date = self
            .next_due_in_days
            .map(|days| {
                today.checked_add_days(Days::new(days)).ok_or_else(|| {
                    RepositoryError::Decode(format!("seed due date out of range for `{}`", self.id))
                })
            })
            .transpose()?;

        Ok(ServiceRecord {
            id: ServiceRecordId(self.id.to_string()),
            vehicle_id: VehicleId(self.vehicle_id.to_string()),
            item_type: self.item_type.to_string(),
            service_date,
            odometer_at_service: self.odometer_at_service,
            next_due_date,
            next_due_distance: None,
        })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub accounts_seeded: Vec<AccountSeedInfo>,
    pub vehicles_seeded: usize,
    pub service_records_seeded: usize,
}

#[derive(Debug)]
pub struct AccountSeedInfo {
    pub account_id: &'static str,
    pub tier: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
