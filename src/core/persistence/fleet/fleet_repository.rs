use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::fleet_entity::{
    AccountEntity, DeviceEntity, DeviceGroupEntity, EventRecord, FleetSnapshot, UserEntity,
};
use super::fleet_fs_adapter::FleetFsAdapter;
use super::fleet_repository_trait::FleetRepository;

/// Fleet repository over a snapshot held in memory.
pub struct FleetSnapshotRepository {
    snapshot: FleetSnapshot,
}

impl FleetSnapshotRepository {
    pub fn new(mut snapshot: FleetSnapshot) -> Self {
        snapshot.events.sort_by_key(|e| e.timestamp);
        Self { snapshot }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(FleetFsAdapter::read(path)?))
    }

    pub fn snapshot(&self) -> &FleetSnapshot {
        &self.snapshot
    }

    fn device_events<'a>(
        &'a self,
        account_id: &'a str,
        device_id: &'a str,
    ) -> impl Iterator<Item = &'a EventRecord> + 'a {
        self.snapshot
            .events
            .iter()
            .filter(move |e| e.account_id == account_id && e.device_id == device_id)
    }
}

impl FleetRepository for FleetSnapshotRepository {
    fn get_account(&self, account_id: &str) -> Result<Option<AccountEntity>> {
        Ok(self
            .snapshot
            .accounts
            .iter()
            .find(|a| a.account_id == account_id)
            .cloned())
    }

    fn get_user(&self, account_id: &str, user_id: &str) -> Result<Option<UserEntity>> {
        Ok(self
            .snapshot
            .users
            .iter()
            .find(|u| u.account_id == account_id && u.user_id == user_id)
            .cloned())
    }

    fn get_device(&self, account_id: &str, device_id: &str) -> Result<Option<DeviceEntity>> {
        Ok(self
            .snapshot
            .devices
            .iter()
            .find(|d| d.account_id == account_id && d.device_id == device_id)
            .cloned())
    }

    fn get_group(&self, account_id: &str, group_id: &str) -> Result<Option<DeviceGroupEntity>> {
        Ok(self
            .snapshot
            .groups
            .iter()
            .find(|g| g.account_id == account_id && g.group_id == group_id)
            .cloned())
    }

    fn list_devices(&self, account_id: &str) -> Result<Vec<DeviceEntity>> {
        Ok(self
            .snapshot
            .devices
            .iter()
            .filter(|d| d.account_id == account_id)
            .cloned()
            .collect())
    }

    fn last_event(&self, account_id: &str, device_id: &str) -> Result<Option<EventRecord>> {
        Ok(self.device_events(account_id, device_id).last().cloned())
    }

    fn events_between(
        &self,
        account_id: &str,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        Ok(self
            .device_events(account_id, device_id)
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(device: &str, ts: i64) -> EventRecord {
        EventRecord {
            account_id: "demo".into(),
            device_id: device.into(),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            status_code: "InMotion".into(),
            latitude: 1.0,
            longitude: 2.0,
            speed_kph: 0.0,
            heading: 0.0,
            altitude: 0.0,
            odometer_km: 0.0,
            address: None,
        }
    }

    fn device(id: &str) -> DeviceEntity {
        DeviceEntity {
            account_id: "demo".into(),
            device_id: id.into(),
            description: id.to_uppercase(),
        }
    }

    fn repo() -> FleetSnapshotRepository {
        FleetSnapshotRepository::new(FleetSnapshot {
            accounts: vec![],
            users: vec![UserEntity {
                account_id: "demo".into(),
                user_id: "driver".into(),
                time_zone: None,
                authorized_groups: vec!["trucks".into()],
            }],
            devices: vec![device("mobile"), device("truck1"), device("truck2")],
            groups: vec![DeviceGroupEntity {
                account_id: "demo".into(),
                group_id: "trucks".into(),
                description: "Trucks".into(),
                device_ids: vec!["truck1".into(), "truck2".into()],
            }],
            events: vec![event("mobile", 300), event("mobile", 100), event("truck1", 200)],
        })
    }

    #[test]
    fn last_event_uses_latest_timestamp() {
        let repo = repo();
        let last = repo.last_event("demo", "mobile").unwrap().unwrap();
        assert_eq!(last.timestamp.timestamp(), 300);
        assert!(repo.last_event("demo", "truck2").unwrap().is_none());
    }

    #[test]
    fn events_between_is_inclusive_and_ordered() {
        let repo = repo();
        let rows = repo
            .events_between(
                "demo",
                "mobile",
                Utc.timestamp_opt(100, 0).unwrap(),
                Utc.timestamp_opt(300, 0).unwrap(),
            )
            .unwrap();
        let times: Vec<i64> = rows.iter().map(|e| e.timestamp.timestamp()).collect();
        assert_eq!(times, vec![100, 300]);
    }

    #[test]
    fn restricted_user_sees_only_group_devices() {
        let repo = repo();
        let user = repo.get_user("demo", "driver").unwrap();
        let ids: Vec<String> = repo
            .authorized_devices("demo", user.as_ref())
            .unwrap()
            .into_iter()
            .map(|d| d.device_id)
            .collect();
        assert_eq!(ids, vec!["truck1", "truck2"]);
        assert!(!repo.is_device_authorized("demo", user.as_ref(), "mobile").unwrap());
        assert!(repo.is_device_authorized("demo", None, "mobile").unwrap());
    }
}
