use anyhow::{bail, Result};
use tracing::debug;

use crate::core::persistence::fleet::fleet_entity::EventRecord;
use crate::core::persistence::fleet::fleet_repository_trait::FleetRepository;
use crate::domain::report::model::{ReportConstraints, ReportTarget};
use crate::domain::report::registry::{
    CellValue, ReportColumn, ReportEntry, ReportFactory, ReportInstance, ReportTable,
};

/// `r_opt` value keeping only events with a GPS fix.
pub const OPTION_GPS_ONLY: &str = "gps";

pub struct EventDetailFactory;

impl ReportFactory for EventDetailFactory {
    fn report_type(&self) -> &str {
        "event.detail"
    }

    fn is_group_report(&self) -> bool {
        false
    }

    fn is_sortable(&self) -> bool {
        true
    }

    fn create(
        &self,
        entry: &ReportEntry,
        option: &str,
        target: ReportTarget,
    ) -> Result<Box<dyn ReportInstance>> {
        if target.is_fleet() {
            bail!("report '{}' requires a single device", entry.id);
        }
        Ok(Box::new(EventDetailReport {
            id: entry.id.clone(),
            title: entry.title.clone(),
            gps_only: option.trim().eq_ignore_ascii_case(OPTION_GPS_ONLY),
            target,
            constraints: ReportConstraints::default(),
            events: Vec::new(),
            table: ReportTable::default(),
        }))
    }
}

/// One row per event of the selected device.
pub struct EventDetailReport {
    id: String,
    title: String,
    gps_only: bool,
    target: ReportTarget,
    constraints: ReportConstraints,
    events: Vec<EventRecord>,
    table: ReportTable,
}

impl EventDetailReport {
    fn columns() -> Vec<ReportColumn> {
        vec![
            ReportColumn::new("index", "#"),
            ReportColumn::new("date", "Date"),
            ReportColumn::new("time", "Time"),
            ReportColumn::new("status", "Status"),
            ReportColumn::new("latitude", "Latitude"),
            ReportColumn::new("longitude", "Longitude"),
            ReportColumn::new("speed", "Speed km/h"),
            ReportColumn::new("heading", "Heading"),
            ReportColumn::new("altitude", "Altitude m"),
            ReportColumn::new("odometer", "Odometer km"),
            ReportColumn::new("address", "Address"),
        ]
    }

    fn row(&self, index: usize, ev: &EventRecord) -> Vec<CellValue> {
        let local = ev.timestamp.with_timezone(&self.constraints.time_zone);
        vec![
            CellValue::Integer(index as i64 + 1),
            CellValue::text(local.format("%Y/%m/%d").to_string()),
            CellValue::text(local.format("%H:%M:%S %Z").to_string()),
            CellValue::text(ev.status_code.clone()),
            CellValue::text(format!("{:.5}", ev.latitude)),
            CellValue::text(format!("{:.5}", ev.longitude)),
            CellValue::Number(ev.speed_kph),
            CellValue::Number(ev.heading),
            CellValue::Integer(ev.altitude.round() as i64),
            CellValue::Number(ev.odometer_km),
            CellValue::text(ev.address.clone().unwrap_or_default()),
        ]
    }
}

impl ReportInstance for EventDetailReport {
    fn report_id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn target(&self) -> &ReportTarget {
        &self.target
    }

    fn constraints(&self) -> &ReportConstraints {
        &self.constraints
    }

    fn constraints_mut(&mut self) -> &mut ReportConstraints {
        &mut self.constraints
    }

    fn post_initialize(&mut self, fleet: &dyn FleetRepository) -> Result<()> {
        let ReportTarget::Device(device) = &self.target else {
            bail!("report '{}' is not bound to a device", self.id);
        };

        let mut events = fleet.events_between(
            &device.account_id,
            &device.device_id,
            self.constraints.time_start,
            self.constraints.time_end,
        )?;
        if self.gps_only {
            events.retain(EventRecord::is_valid_gps);
        }
        self.events = self.constraints.limit(events);
        debug!(
            "{} [{}]: {} events",
            self.id,
            device.device_id,
            self.events.len()
        );

        let rows = self
            .events
            .iter()
            .enumerate()
            .map(|(i, ev)| self.row(i, ev))
            .collect();
        self.table = ReportTable {
            columns: Self::columns(),
            rows,
        };
        Ok(())
    }

    fn table(&self) -> &ReportTable {
        &self.table
    }

    fn events(&self) -> &[EventRecord] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::fleet::fleet_entity::{DeviceEntity, FleetSnapshot};
    use crate::core::persistence::fleet::fleet_repository::FleetSnapshotRepository;
    use crate::domain::report::model::LimitType;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn device() -> DeviceEntity {
        DeviceEntity {
            account_id: "demo".into(),
            device_id: "mobile".into(),
            description: "Mobile Unit".into(),
        }
    }

    fn event(ts: i64, lat: f64) -> EventRecord {
        EventRecord {
            account_id: "demo".into(),
            device_id: "mobile".into(),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            status_code: "InMotion".into(),
            latitude: lat,
            longitude: if lat == 0.0 { 0.0 } else { -142.0 },
            speed_kph: 20.0,
            heading: 0.0,
            altitude: 0.0,
            odometer_km: 0.0,
            address: None,
        }
    }

    fn fleet() -> FleetSnapshotRepository {
        FleetSnapshotRepository::new(FleetSnapshot {
            devices: vec![device()],
            events: vec![event(100, 39.0), event(200, 0.0), event(300, 39.1), event(400, 39.2)],
            ..Default::default()
        })
    }

    fn entry() -> ReportEntry {
        ReportEntry::new("EventDetail", "Event Detail", "", Arc::new(EventDetailFactory))
    }

    #[test]
    fn gps_option_drops_invalid_fixes() {
        let mut report = EventDetailFactory
            .create(&entry(), "GPS", ReportTarget::Device(device()))
            .unwrap();
        report.post_initialize(&fleet()).unwrap();

        assert_eq!(report.table().row_count(), 3);
        assert_eq!(report.events().len(), 3);
        assert_eq!(report.table().rows[0][0], CellValue::Integer(1));
    }

    #[test]
    fn constraints_bound_range_and_limit() {
        let mut report = EventDetailFactory
            .create(&entry(), "", ReportTarget::Device(device()))
            .unwrap();
        {
            let c = report.constraints_mut();
            c.time_start = Utc.timestamp_opt(150, 0).unwrap();
            c.time_end = Utc.timestamp_opt(400, 0).unwrap();
            c.selection_limit = Some(2);
            c.limit_type = LimitType::Last;
        }
        report.post_initialize(&fleet()).unwrap();

        let times: Vec<i64> = report.events().iter().map(|e| e.timestamp.timestamp()).collect();
        assert_eq!(times, vec![300, 400]);
    }

    #[test]
    fn rejects_device_sets() {
        let target = ReportTarget::DeviceSet {
            group_id: "all".into(),
            devices: vec![device()],
        };
        assert!(EventDetailFactory.create(&entry(), "", target).is_err());
    }
}
