use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString, TimestampSeconds};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEntity {
    pub account_id: String,
    #[serde(default)]
    pub description: String,
    /// IANA zone id, e.g. `America/Los_Angeles`.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntity {
    pub account_id: String,
    pub user_id: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub time_zone: Option<String>,
    /// Groups this user may report on. Empty means every device of the account.
    #[serde(default)]
    pub authorized_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceEntity {
    pub account_id: String,
    pub device_id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceGroupEntity {
    pub account_id: String,
    pub group_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub device_ids: Vec<String>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub account_id: String,
    pub device_id: String,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status_code: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed_kph: f64,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub altitude: f64,
    #[serde(default)]
    pub odometer_km: f64,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub address: Option<String>,
}

impl EventRecord {
    pub fn is_valid_gps(&self) -> bool {
        self.latitude != 0.0 || self.longitude != 0.0
    }
}

/// Everything the file adapter loads in one go.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetSnapshot {
    #[serde(default)]
    pub accounts: Vec<AccountEntity>,
    #[serde(default)]
    pub users: Vec<UserEntity>,
    #[serde(default)]
    pub devices: Vec<DeviceEntity>,
    #[serde(default)]
    pub groups: Vec<DeviceGroupEntity>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}
