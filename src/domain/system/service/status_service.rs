use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::api::dto::system_dto::SystemStatusDto;
use crate::domain::report::service::report_display_service::ReportDisplayService;

pub async fn status(started_at: DateTime<Utc>, reports: &ReportDisplayService) -> Result<SystemStatusDto> {
    let config = &reports.config;
    let device_count = reports.fleet.list_devices(&config.default_account)?.len();

    Ok(SystemStatusDto {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at,
        uptime_secs: (Utc::now() - started_at).num_seconds().max(0),
        default_account: config.default_account.clone(),
        report_count: reports.registry.entries().len(),
        device_count,
        map_enabled: config.map_provider_js.is_some(),
        mail_enabled: reports.mailer.is_some() && config.report_email_from.is_some(),
        map_data_format: config.map_data_format.as_code().to_string(),
    })
}
