//! System API DTOs
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SystemStatusDto {
    pub service: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub default_account: String,
    pub report_count: usize,
    pub device_count: usize,
    pub map_enabled: bool,
    pub mail_enabled: bool,
    pub map_data_format: String,
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: String,
    pub fleet_loaded: bool,
}
