use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use fleetpulse_core::errors::ApplicationError;

pub mod account;
pub mod fleet;
pub mod ledger;

pub use account::SqlAccountRepository;
pub use fleet::SqlFleetRepository;
pub use ledger::SqlNotificationLedgerRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn parse_optional_u32(
    column: &str,
    value: Option<i64>,
) -> Result<Option<u32>, RepositoryError> {
    value.map(|value| parse_u32(column, value)).transpose()
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

pub(crate) fn parse_date(column: &str, value: String) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_optional_date(
    column: &str,
    value: Option<String>,
) -> Result<Option<NaiveDate>, RepositoryError> {
    value.map(|date| parse_date(column, date)).transpose()
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
