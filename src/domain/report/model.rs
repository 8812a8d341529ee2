use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::core::persistence::fleet::fleet_entity::DeviceEntity;
use crate::domain::report::registry::{ReportEntry, ReportInstance};

/// Output formats accepted in the `format` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputFormat {
    Html,
    Xml,
    Csv,
    Txt,
    Xls,
    Xlsx,
    Graph,
    Map,
    Kml,
    Schedule,
    EmailHtml,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 11] = [
        OutputFormat::Html,
        OutputFormat::Xml,
        OutputFormat::Csv,
        OutputFormat::Txt,
        OutputFormat::Xls,
        OutputFormat::Xlsx,
        OutputFormat::Graph,
        OutputFormat::Map,
        OutputFormat::Kml,
        OutputFormat::Schedule,
        OutputFormat::EmailHtml,
    ];

    /// Case-insensitive; unknown or blank tokens select `Html`.
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "xml" => OutputFormat::Xml,
            "csv" => OutputFormat::Csv,
            "txt" => OutputFormat::Txt,
            "xls" => OutputFormat::Xls,
            "xlsx" => OutputFormat::Xlsx,
            "graph" => OutputFormat::Graph,
            "map" => OutputFormat::Map,
            "kml" => OutputFormat::Kml,
            "schedule" | "sched" => OutputFormat::Schedule,
            "ehtml" => OutputFormat::EmailHtml,
            _ => OutputFormat::Html,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Xml => "xml",
            OutputFormat::Csv => "csv",
            OutputFormat::Txt => "txt",
            OutputFormat::Xls => "xls",
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Graph => "graph",
            OutputFormat::Map => "map",
            OutputFormat::Kml => "kml",
            OutputFormat::Schedule => "schedule",
            OutputFormat::EmailHtml => "ehtml",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Xml => "text/xml; charset=UTF-8",
            OutputFormat::Csv => "text/csv; charset=UTF-8",
            OutputFormat::Txt => "text/plain; charset=UTF-8",
            // legacy .xls requests are served the OOXML workbook
            OutputFormat::Xls | OutputFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            OutputFormat::Kml => "application/vnd.google-earth.kml+xml",
            OutputFormat::Html
            | OutputFormat::Graph
            | OutputFormat::Map
            | OutputFormat::Schedule
            | OutputFormat::EmailHtml => "text/html; charset=UTF-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Csv => "csv",
            OutputFormat::Txt => "txt",
            OutputFormat::Xls | OutputFormat::Xlsx => "xlsx",
            OutputFormat::Kml => "kml",
            _ => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Report parameters as bound from the request (and session fallbacks).
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub report_id: String,
    pub option: String,
    pub device_id: Option<String>,
    pub group_id: Option<String>,
    pub range_from: String,
    pub range_to: String,
    pub time_zone_id: Option<String>,
    pub limit: Option<usize>,
    pub format: OutputFormat,
    pub email_target: Option<String>,
    pub show_pushpin: Option<u32>,
    pub zoom_pushpin: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDateRange {
    pub from: DateTime<Tz>,
    pub to: DateTime<Tz>,
    pub time_zone: Tz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitType {
    #[default]
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConstraints {
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    /// Zone used to display timestamps.
    pub time_zone: Tz,
    pub selection_limit: Option<usize>,
    pub limit_type: LimitType,
}

impl ReportConstraints {
    /// Applies the selection limit to rows sorted oldest first.
    pub fn limit<T>(&self, mut rows: Vec<T>) -> Vec<T> {
        match (self.selection_limit, self.limit_type) {
            (Some(n), LimitType::First) => {
                rows.truncate(n);
                rows
            }
            (Some(n), LimitType::Last) if rows.len() > n => rows.split_off(rows.len() - n),
            _ => rows,
        }
    }
}

impl Default for ReportConstraints {
    fn default() -> Self {
        Self {
            time_start: DateTime::<Utc>::MIN_UTC,
            time_end: DateTime::<Utc>::MAX_UTC,
            time_zone: chrono_tz::GMT,
            selection_limit: None,
            limit_type: LimitType::First,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxiliaryUrls {
    pub refresh: Option<String>,
    pub auto_report: Option<String>,
    pub graph: Option<String>,
    pub map: Option<String>,
    pub kml: Option<String>,
    pub schedule: Option<String>,
}

/// Devices a report instance is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportTarget {
    Device(DeviceEntity),
    DeviceSet {
        group_id: String,
        devices: Vec<DeviceEntity>,
    },
}

impl ReportTarget {
    pub fn devices(&self) -> Vec<&DeviceEntity> {
        match self {
            ReportTarget::Device(d) => vec![d],
            ReportTarget::DeviceSet { devices, .. } => devices.iter().collect(),
        }
    }

    pub fn is_fleet(&self) -> bool {
        matches!(self, ReportTarget::DeviceSet { .. })
    }
}

/// Result of one writer invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    pub row_count: usize,
    /// The writer produced a complete response body regardless of `row_count`.
    pub committed: bool,
    pub error_message: Option<String>,
}

impl RenderOutcome {
    pub fn rows(row_count: usize) -> Self {
        Self {
            row_count,
            ..Default::default()
        }
    }

    pub fn has_output(&self) -> bool {
        self.row_count > 0 || self.committed
    }
}

/// A bound report for the lifetime of one request.
pub struct ReportContext {
    pub entry: Arc<ReportEntry>,
    pub report: Box<dyn ReportInstance>,
    pub request: ReportRequest,
    pub range: ResolvedDateRange,
    pub urls: AuxiliaryUrls,
}

impl ReportContext {
    pub fn report_id(&self) -> &str {
        &self.entry.id
    }
}
