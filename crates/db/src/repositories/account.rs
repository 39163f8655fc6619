use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use fleetpulse_core::domain::account::{Account, AccountId, NotificationFrequency, Tier};
use fleetpulse_core::errors::ApplicationError;
use fleetpulse_core::notifications::ports::AccountDirectory;

use super::{parse_optional_timestamp, RepositoryError};
use crate::DbPool;

const ACCOUNT_COLUMNS: &str = "id, email, display_name, tier, notifications_enabled,
    notification_frequency, warning_enabled, last_notification_sent_at";

pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(account_from_row).transpose()
    }

    pub async fn save(&self, account: &Account) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO account (
                id, email, display_name, tier, notifications_enabled,
                notification_frequency, warning_enabled, last_notification_sent_at,
                created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                display_name = excluded.display_name,
                tier = excluded.tier,
                notifications_enabled = excluded.notifications_enabled,
                notification_frequency = excluded.notification_frequency,
                warning_enabled = excluded.warning_enabled,
                last_notification_sent_at = excluded.last_notification_sent_at,
                updated_at = excluded.updated_at",
        )
        .bind(&account.id.0)
        .bind(&account.email)
        .bind(account.display_name.as_deref())
        .bind(account.tier.as_str())
        .bind(account.notifications_enabled)
        .bind(account.notification_frequency.as_str())
        .bind(account.warning_enabled)
        .bind(account.last_notification_sent_at.map(|value| value.to_rfc3339()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_notifiable(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE notifications_enabled = 1 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(account_from_row).collect()
    }

    pub async fn mark_notified(
        &self,
        id: &AccountId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE account SET last_notification_sent_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(sent_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Decode(format!("account `{id}` does not exist")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AccountDirectory for SqlAccountRepository {
    async fn list_notifiable_accounts(&self) -> Result<Vec<Account>, ApplicationError> {
        Ok(self.list_notifiable().await?)
    }

    async fn record_notification_sent(
        &self,
        account_id: &AccountId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        Ok(self.mark_notified(account_id, sent_at).await?)
    }
}

fn account_from_row(row: SqliteRow) -> Result<Account, RepositoryError> {
    let tier_raw = row.try_get::<String, _>("tier")?;
    let tier =
        tier_raw.parse::<Tier>().map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let frequency_raw = row.try_get::<String, _>("notification_frequency")?;
    let notification_frequency = frequency_raw
        .parse::<NotificationFrequency>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(Account {
        id: AccountId(row.try_get("id")?),
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        tier,
        notifications_enabled: row.try_get("notifications_enabled")?,
        notification_frequency,
        warning_enabled: row.try_get("warning_enabled")?,
        last_notification_sent_at: parse_optional_timestamp(
            "last_notification_sent_at",
            row.try_get("last_notification_sent_at")?,
        )?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use fleetpulse_core::domain::account::{Account, AccountId, NotificationFrequency, Tier};
    use fleetpulse_core::notifications::ports::AccountDirectory;

    use super::SqlAccountRepository;
    use crate::migrations;
    use crate::repositories::RepositoryError;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn account(id: &str, enabled: bool) -> Account {
        Account {
            id: AccountId(id.to_string()),
            email: format!("{id}@example.com"),
            display_name: Some("Jordan".to_string()),
            tier: Tier::Business,
            notifications_enabled: enabled,
            notification_frequency: NotificationFrequency::Monthly,
            warning_enabled: false,
            last_notification_sent_at: None,
        }
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let repo = SqlAccountRepository::new(setup_pool().await);
        let saved = account("acct-1", true);

        repo.save(&saved).await.expect("save");
        let found = repo.find_by_id(&saved.id).await.expect("find");

        assert_eq!(found, Some(saved));
    }

    #[tokio::test]
    async fn list_excludes_muted_accounts_and_orders_by_id() {
        let repo = SqlAccountRepository::new(setup_pool().await);
        for (id, enabled) in [("acct-c", true), ("acct-a", true), ("acct-b", false)] {
            repo.save(&account(id, enabled)).await.expect("save");
        }

        let accounts = repo.list_notifiable_accounts().await.expect("list");
        let ids: Vec<_> = accounts.iter().map(|account| account.id.0.as_str()).collect();

        assert_eq!(ids, vec!["acct-a", "acct-c"]);
    }

    #[tokio::test]
    async fn family_tier_rows_decode_as_personal() {
        let pool = setup_pool().await;
        sqlx::query(
            "INSERT INTO account (id, email, tier, notification_frequency, created_at, updated_at)
             VALUES ('acct-fam', 'fam@example.com', 'family', 'daily',
                     '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert");

        let repo = SqlAccountRepository::new(pool);
        let found = repo.find_by_id(&AccountId("acct-fam".to_string())).await.expect("find");

        assert_eq!(found.map(|account| account.tier), Some(Tier::Personal));
    }

    #[tokio::test]
    async fn record_notification_sent_stamps_the_account() {
        let repo = SqlAccountRepository::new(setup_pool().await);
        repo.save(&account("acct-1", true)).await.expect("save");
        let sent_at = parse_ts("2026-10-19T06:00:00Z");

        repo.record_notification_sent(&AccountId("acct-1".to_string()), sent_at)
            .await
            .expect("record");
        let found = repo.find_by_id(&AccountId("acct-1".to_string())).await.expect("find");

        assert_eq!(found.and_then(|account| account.last_notification_sent_at), Some(sent_at));
    }

    #[tokio::test]
    async fn marking_an_unknown_account_fails() {
        let repo = SqlAccountRepository::new(setup_pool().await);
        let error = repo
            .mark_notified(&AccountId("ghost".to_string()), parse_ts("2026-10-19T06:00:00Z"))
            .await;

        assert!(matches!(error, Err(RepositoryError::Decode(_))));
    }
}
