//! Shared fixtures for the report service tests.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::config::AppConfig;
use crate::core::mail::mail_sender::{MailMessage, MailSender};
use crate::core::persistence::fleet::fleet_entity::{
    AccountEntity, DeviceEntity, DeviceGroupEntity, EventRecord, FleetSnapshot, UserEntity,
};
use crate::core::persistence::fleet::fleet_repository::FleetSnapshotRepository;
use crate::core::util::uri_args::UriArgs;
use crate::domain::report::request_context::RequestContext;

/// 2024-03-15 18:30:00 UTC
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap()
}

fn device(id: &str, desc: &str) -> DeviceEntity {
    DeviceEntity {
        account_id: "demo".into(),
        device_id: id.into(),
        description: desc.into(),
    }
}

fn event(device: &str, h: u32, m: u32, lat: f64, odo: f64) -> EventRecord {
    EventRecord {
        account_id: "demo".into(),
        device_id: device.into(),
        timestamp: Utc.with_ymd_and_hms(2024, 3, 14, h, m, 0).unwrap(),
        status_code: "InMotion".into(),
        latitude: lat,
        longitude: if lat == 0.0 { 0.0 } else { -121.5 },
        speed_kph: 40.0,
        heading: 180.0,
        altitude: 20.0,
        odometer_km: odo,
        address: Some(format!("{} road", device)),
    }
}

/// Account `demo` with devices `mobile`, `truck1`, `truck2` and group `trucks`.
///
/// Events exist on 2024-03-14 only; `truck2` never reported.
pub fn fleet() -> Arc<FleetSnapshotRepository> {
    Arc::new(FleetSnapshotRepository::new(FleetSnapshot {
        accounts: vec![AccountEntity {
            account_id: "demo".into(),
            description: "Demo Account".into(),
            time_zone: None,
        }],
        users: vec![
            UserEntity {
                account_id: "demo".into(),
                user_id: "admin".into(),
                time_zone: None,
                authorized_groups: vec![],
            },
            UserEntity {
                account_id: "demo".into(),
                user_id: "driver".into(),
                time_zone: None,
                authorized_groups: vec!["trucks".into()],
            },
        ],
        devices: vec![
            device("mobile", "Mobile Unit"),
            device("truck1", "Truck 1"),
            device("truck2", "Truck 2"),
        ],
        groups: vec![DeviceGroupEntity {
            account_id: "demo".into(),
            group_id: "trucks".into(),
            description: "Trucks".into(),
            device_ids: vec!["truck1".into(), "truck2".into()],
        }],
        events: vec![
            event("mobile", 10, 0, 37.1, 100.0),
            event("mobile", 10, 30, 37.2, 110.0),
            event("mobile", 10, 45, 0.0, 112.0),
            event("mobile", 11, 0, 37.3, 120.0),
            event("truck1", 9, 0, 38.1, 500.0),
            event("truck1", 12, 0, 38.4, 530.0),
        ],
    }))
}

pub fn config() -> AppConfig {
    AppConfig {
        report_email_from: Some("reports@example.com".into()),
        ..AppConfig::default()
    }
}

pub fn context(query: &str, user: Option<&str>) -> RequestContext {
    use crate::core::persistence::fleet::fleet_repository_trait::FleetRepository;

    let fleet = fleet();
    let account = fleet.get_account("demo").unwrap().unwrap();
    let user = user.and_then(|u| fleet.get_user("demo", u).unwrap());
    RequestContext::new(account, user, UriArgs::from_parts("/track/report", Some(query)), now())
}

/// Records every message; fails when `fail` is set.
#[derive(Default)]
pub struct RecordingMailSender {
    pub sent: Mutex<Vec<MailMessage>>,
    pub fail: bool,
}

impl RecordingMailSender {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail {
            return Err(anyhow!("relay unavailable"));
        }
        Ok(())
    }
}
