//! Report catalog DTOs
use serde::Serialize;

use crate::domain::report::model::OutputFormat;
use crate::domain::report::registry::ReportEntry;

#[derive(Debug, Serialize)]
pub struct ReportSummaryDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub report_type: String,
    pub group_report: bool,
    pub sortable: bool,
}

impl From<&ReportEntry> for ReportSummaryDto {
    fn from(entry: &ReportEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            description: entry.description.clone(),
            report_type: entry.factory.report_type().to_string(),
            group_report: entry.factory.is_group_report(),
            sortable: entry.factory.is_sortable(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportCatalogDto {
    pub reports: Vec<ReportSummaryDto>,
    /// Accepted `format` tokens.
    pub formats: Vec<&'static str>,
}

impl ReportCatalogDto {
    pub fn new<'a>(entries: impl IntoIterator<Item = &'a ReportEntry>) -> Self {
        Self {
            reports: entries.into_iter().map(ReportSummaryDto::from).collect(),
            formats: OutputFormat::ALL.iter().map(|f| f.token()).collect(),
        }
    }
}
