//! Built-in event reports

pub mod event_detail_report;
pub mod event_summary_report;
