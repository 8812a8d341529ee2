use tracing::{info, warn};

use crate::app_state::AppState;

/// Runs only when in FLEET_DEBUG_MODE
pub async fn run_debug(state: &AppState) {
    info!("🔧 Debug mode: running debug tasks...");

    match serde_json::to_string_pretty(state.config.as_ref()) {
        Ok(cfg) => info!("Configuration:\n{}", cfg),
        Err(e) => warn!("Unable to serialize configuration: {}", e),
    }

    for entry in state.report_service.registry.entries() {
        info!(
            "Report {} ({}): {} [{}]",
            entry.id,
            entry.factory.report_type(),
            entry.title,
            if entry.factory.is_group_report() { "group" } else { "device" }
        );
    }

    let account = &state.config.default_account;
    match state.report_service.fleet.list_devices(account) {
        Ok(devices) => {
            info!("Account {} has {} device(s)", account, devices.len());
            for d in devices {
                let last = state.report_service.fleet.last_event(account, &d.device_id);
                match last {
                    Ok(Some(ev)) => info!("  {} ({}): last event {}", d.device_id, d.description, ev.timestamp),
                    Ok(None) => info!("  {} ({}): no events", d.device_id, d.description),
                    Err(e) => warn!("  {}: last event lookup failed: {}", d.device_id, e),
                }
            }
        }
        Err(e) => warn!("Unable to list devices of {}: {}", account, e),
    }

    info!("Debug tasks completed. Exiting...");
}
