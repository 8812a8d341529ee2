use anyhow::Result;

use crate::api::dto::system_dto::HealthDto;
use crate::domain::report::service::report_display_service::ReportDisplayService;

/// Healthy once the default account is readable from the fleet data.
pub async fn health(reports: &ReportDisplayService) -> Result<HealthDto> {
    let account = &reports.config.default_account;
    let fleet_loaded = reports.fleet.get_account(account)?.is_some();

    Ok(HealthDto {
        status: if fleet_loaded { "ok" } else { "degraded" }.to_string(),
        fleet_loaded,
    })
}
