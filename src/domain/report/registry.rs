use std::io;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use crate::config::AppConfig;
use crate::core::persistence::fleet::fleet_entity::EventRecord;
use crate::core::persistence::fleet::fleet_repository_trait::FleetRepository;
use crate::domain::report::event::event_detail_report::EventDetailFactory;
use crate::domain::report::event::event_summary_report::EventSummaryFactory;
use crate::domain::report::model::{
    OutputFormat, RenderOutcome, ReportConstraints, ReportTarget, ResolvedDateRange,
};
use crate::domain::report::render::{delimited_writer, html_table, spreadsheet_writer, xml_writer};
use crate::domain::report::sink::RenderSink;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportColumn {
    pub key: String,
    pub title: String,
}

impl ReportColumn {
    pub fn new(key: &str, title: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Integer(n) => n.to_string(),
            CellValue::Number(n) => format!("{:.1}", n),
        }
    }
}

/// Rows produced by a report body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportTable {
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ReportTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub trait ReportFactory: Send + Sync {
    fn report_type(&self) -> &str;

    fn is_group_report(&self) -> bool;

    /// Whether the HTML table gets the sortable-table script.
    fn is_sortable(&self) -> bool {
        false
    }

    fn create(
        &self,
        entry: &ReportEntry,
        option: &str,
        target: ReportTarget,
    ) -> Result<Box<dyn ReportInstance>>;
}

/// A report bound to its target devices.
///
/// Lifecycle: `create` → `set_time_range`/`constraints_mut` →
/// `post_initialize` (loads data) → any number of writes.
pub trait ReportInstance: Send + Sync {
    fn report_id(&self) -> &str;

    fn title(&self) -> &str;

    fn target(&self) -> &ReportTarget;

    fn constraints(&self) -> &ReportConstraints;

    fn constraints_mut(&mut self) -> &mut ReportConstraints;

    fn set_time_range(&mut self, range: &ResolvedDateRange) {
        let c = self.constraints_mut();
        c.time_start = range.from.with_timezone(&Utc);
        c.time_end = range.to.with_timezone(&Utc);
        c.time_zone = range.time_zone;
    }

    fn post_initialize(&mut self, fleet: &dyn FleetRepository) -> Result<()>;

    fn table(&self) -> &ReportTable;

    /// Events backing map and KML output, grouped by device, oldest first.
    fn events(&self) -> &[EventRecord];

    /// Chart image shown by the graph placeholder, if the report has one.
    fn graph_url(&self) -> Option<String> {
        None
    }

    fn device_description(&self, device_id: &str) -> String {
        self.target()
            .devices()
            .into_iter()
            .find(|d| d.device_id == device_id)
            .map(|d| d.description.clone())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| device_id.to_string())
    }

    fn write_style(&self, format: OutputFormat, sink: &mut dyn RenderSink) -> io::Result<()> {
        match format {
            OutputFormat::Html | OutputFormat::EmailHtml => sink.write_str(html_table::TABLE_STYLE),
            _ => Ok(()),
        }
    }

    /// Writes the tabular body in `format`. Non-tabular formats fall back to HTML.
    fn write_report(
        &self,
        format: OutputFormat,
        sink: &mut dyn RenderSink,
        config: &AppConfig,
    ) -> Result<RenderOutcome> {
        let table = self.table();
        match format {
            OutputFormat::Xml => xml_writer::write_table(sink, self.report_id(), self.title(), table),
            OutputFormat::Csv | OutputFormat::Txt => {
                delimited_writer::write_table(sink, self.report_id(), format, table)
            }
            OutputFormat::Xls | OutputFormat::Xlsx => spreadsheet_writer::write_table(
                sink,
                self.report_id(),
                self.title(),
                table,
                config.xlsx_export_empty,
            ),
            _ => html_table::write_table(sink, table),
        }
    }
}

pub struct ReportEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub factory: Arc<dyn ReportFactory>,
}

impl ReportEntry {
    pub fn new(id: &str, title: &str, description: &str, factory: Arc<dyn ReportFactory>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            factory,
        }
    }
}

/// Reports known to the service, in menu order.
#[derive(Default)]
pub struct ReportRegistry {
    entries: Vec<Arc<ReportEntry>>,
}

impl ReportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_reports() -> Self {
        let mut registry = Self::new();
        registry.register(ReportEntry::new(
            "EventDetail",
            "Event Detail",
            "Detail report of the events of one vehicle",
            Arc::new(EventDetailFactory),
        ));
        registry.register(ReportEntry::new(
            "EventSummary",
            "Fleet Summary",
            "One line per vehicle of the selected group",
            Arc::new(EventSummaryFactory),
        ));
        registry
    }

    /// Replaces an entry with the same id.
    pub fn register(&mut self, entry: ReportEntry) {
        self.entries.retain(|e| e.id != entry.id);
        self.entries.push(Arc::new(entry));
    }

    pub fn lookup(&self, report_id: &str) -> Option<Arc<ReportEntry>> {
        self.entries.iter().find(|e| e.id == report_id).cloned()
    }

    pub fn entries(&self) -> &[Arc<ReportEntry>] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_both_shapes() {
        let registry = ReportRegistry::with_builtin_reports();
        let detail = registry.lookup("EventDetail").unwrap();
        assert!(!detail.factory.is_group_report());
        assert!(detail.factory.is_sortable());
        assert!(registry.lookup("EventSummary").unwrap().factory.is_group_report());
        assert!(registry.lookup("NoSuchReport").is_none());
    }

    #[test]
    fn register_replaces_same_id() {
        let mut registry = ReportRegistry::with_builtin_reports();
        registry.register(ReportEntry::new("EventDetail", "Renamed", "", Arc::new(EventDetailFactory)));
        assert_eq!(registry.entries().len(), 2);
        assert_eq!(registry.lookup("EventDetail").unwrap().title, "Renamed");
    }
}
