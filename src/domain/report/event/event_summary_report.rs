use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::core::persistence::fleet::fleet_entity::EventRecord;
use crate::core::persistence::fleet::fleet_repository_trait::FleetRepository;
use crate::domain::report::model::{ReportConstraints, ReportTarget};
use crate::domain::report::registry::{
    CellValue, ReportColumn, ReportEntry, ReportFactory, ReportInstance, ReportTable,
};

pub struct EventSummaryFactory;

impl ReportFactory for EventSummaryFactory {
    fn report_type(&self) -> &str {
        "event.summary"
    }

    fn is_group_report(&self) -> bool {
        true
    }

    fn is_sortable(&self) -> bool {
        true
    }

    fn create(
        &self,
        entry: &ReportEntry,
        _option: &str,
        target: ReportTarget,
    ) -> Result<Box<dyn ReportInstance>> {
        Ok(Box::new(EventSummaryReport {
            id: entry.id.clone(),
            title: entry.title.clone(),
            target,
            constraints: ReportConstraints::default(),
            events: Vec::new(),
            table: ReportTable::default(),
        }))
    }
}

/// One row per device that reported within the range.
pub struct EventSummaryReport {
    id: String,
    title: String,
    target: ReportTarget,
    constraints: ReportConstraints,
    events: Vec<EventRecord>,
    table: ReportTable,
}

fn format_time(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%Y/%m/%d %H:%M:%S").to_string()
}

impl EventSummaryReport {
    fn columns() -> Vec<ReportColumn> {
        vec![
            ReportColumn::new("device", "Device"),
            ReportColumn::new("description", "Description"),
            ReportColumn::new("count", "Events"),
            ReportColumn::new("first", "First Event"),
            ReportColumn::new("last", "Last Event"),
            ReportColumn::new("distance", "Distance km"),
            ReportColumn::new("max_speed", "Max Speed km/h"),
            ReportColumn::new("address", "Last Address"),
        ]
    }

    fn summary_row(&self, events: &[EventRecord]) -> Option<Vec<CellValue>> {
        let first = events.first()?;
        let last = events.last()?;
        let tz = self.constraints.time_zone;
        let distance = (last.odometer_km - first.odometer_km).max(0.0);
        let max_speed = events.iter().map(|e| e.speed_kph).fold(0.0, f64::max);

        Some(vec![
            CellValue::text(first.device_id.clone()),
            CellValue::text(self.device_description(&first.device_id)),
            CellValue::Integer(events.len() as i64),
            CellValue::text(format_time(first.timestamp, tz)),
            CellValue::text(format_time(last.timestamp, tz)),
            CellValue::Number(distance),
            CellValue::Number(max_speed),
            CellValue::text(last.address.clone().unwrap_or_default()),
        ])
    }
}

impl ReportInstance for EventSummaryReport {
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
        if self.target.devices().is_empty() {
            bail!("report '{}' has no devices", self.id);
        }

        let mut all_events = Vec::new();
        let mut rows = Vec::new();
        for device in self.target.devices() {
            let events = fleet.events_between(
                &device.account_id,
                &device.device_id,
                self.constraints.time_start,
                self.constraints.time_end,
            )?;
            let events = self.constraints.limit(events);
            if let Some(row) = self.summary_row(&events) {
                rows.push(row);
            }
            all_events.extend(events);
        }
        debug!(
            "{}: {} devices with events, {} events",
            self.id,
            rows.len(),
            all_events.len()
        );

        self.events = all_events;
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
