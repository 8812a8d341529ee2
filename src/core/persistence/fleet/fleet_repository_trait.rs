use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::fleet_entity::{AccountEntity, DeviceEntity, DeviceGroupEntity, EventRecord, UserEntity};

/// Read-only access to fleet records, scoped by account.
pub trait FleetRepository: Send + Sync {
    fn get_account(&self, account_id: &str) -> Result<Option<AccountEntity>>;

    fn get_user(&self, account_id: &str, user_id: &str) -> Result<Option<UserEntity>>;

    fn get_device(&self, account_id: &str, device_id: &str) -> Result<Option<DeviceEntity>>;

    fn get_group(&self, account_id: &str, group_id: &str) -> Result<Option<DeviceGroupEntity>>;

    fn list_devices(&self, account_id: &str) -> Result<Vec<DeviceEntity>>;

    /// Most recent event of a device, regardless of GPS validity.
    fn last_event(&self, account_id: &str, device_id: &str) -> Result<Option<EventRecord>>;

    /// Events of a device within `[start, end]`, oldest first.
    fn events_between(
        &self,
        account_id: &str,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>>;

    /// Devices the user may see. A user without group restrictions sees the whole account.
    fn authorized_devices(
        &self,
        account_id: &str,
        user: Option<&UserEntity>,
    ) -> Result<Vec<DeviceEntity>> {
        let devices = self.list_devices(account_id)?;
        let groups = match user {
            Some(u) if !u.authorized_groups.is_empty() => &u.authorized_groups,
            _ => return Ok(devices),
        };

        let mut allowed: HashSet<String> = HashSet::new();
        for group_id in groups {
            if let Some(group) = self.get_group(account_id, group_id)? {
                allowed.extend(group.device_ids);
            }
        }

        Ok(devices
            .into_iter()
            .filter(|d| allowed.contains(&d.device_id))
            .collect())
    }

    fn is_device_authorized(
        &self,
        account_id: &str,
        user: Option<&UserEntity>,
        device_id: &str,
    ) -> Result<bool> {
        Ok(self
            .authorized_devices(account_id, user)?
            .iter()
            .any(|d| d.device_id == device_id))
    }
}
