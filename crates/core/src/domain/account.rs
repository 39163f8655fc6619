use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subscription level. Gates warning visibility, custom due dates and repeat alerts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Personal,
    Business,
}

impl Tier {
    pub fn is_paid(self) -> bool {
        match self {
            Self::Free => false,
            Self::Personal | Self::Business => true,
        }
    }

    /// Whether user-entered `next_due_date` / `next_due_distance` values are honored.
    pub fn honors_custom_due_values(self) -> bool {
        self.is_paid()
    }

    pub fn can_see_warnings(self) -> bool {
        self.is_paid()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Personal => "personal",
            Self::Business => "business",
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "personal" | "family" => Ok(Self::Personal),
            "business" => Ok(Self::Business),
            other => Err(DomainError::UnknownTier(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl NotificationFrequency {
    pub fn days(self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for NotificationFrequency {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(DomainError::UnknownFrequency(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub display_name: Option<String>,
    pub tier: Tier,
    pub notifications_enabled: bool,
    pub notification_frequency: NotificationFrequency,
    pub warning_enabled: bool,
    pub last_notification_sent_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Preferences as they apply under the account's tier. Paid-only settings
    /// stored on a free account are ignored here rather than trusted.
    pub fn notification_policy(&self) -> NotificationPolicy {
        NotificationPolicy {
            tier: self.tier,
            frequency: self.notification_frequency,
            warnings_enabled: self.tier.can_see_warnings() && self.warning_enabled,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotificationPolicy {
    pub tier: Tier,
    pub frequency: NotificationFrequency,
    pub warnings_enabled: bool,
}
