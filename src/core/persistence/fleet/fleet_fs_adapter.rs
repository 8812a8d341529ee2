use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::fleet_entity::FleetSnapshot;

/// FS adapter for the fleet snapshot.
///
/// Reads a single JSON document holding accounts, users, devices, groups
/// and events. A missing file yields an empty snapshot so the service can
/// still start and serve the menu.
pub struct FleetFsAdapter;

impl FleetFsAdapter {
    pub fn read(path: &Path) -> Result<FleetSnapshot> {
        if !path.exists() {
            warn!("Fleet data file {:?} not found, starting with an empty fleet", path);
            return Ok(FleetSnapshot::default());
        }

        let file = File::open(path).with_context(|| format!("Failed to open fleet file {:?}", path))?;
        let snapshot: FleetSnapshot = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse fleet file {:?}", path))?;

        info!(
            "Loaded fleet data: {} accounts, {} devices, {} groups, {} events",
            snapshot.accounts.len(),
            snapshot.devices.len(),
            snapshot.groups.len(),
            snapshot.events.len()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_empty_snapshot() {
        let snap = FleetFsAdapter::read(Path::new("/nonexistent/fleet.json")).unwrap();
        assert!(snap.accounts.is_empty());
        assert!(snap.events.is_empty());
    }

    #[test]
    fn parses_epoch_timestamps_and_blank_optionals() {
        let path = std::env::temp_dir().join(format!("fleet-{}.json", uuid::Uuid::new_v4()));
        let mut f = File::create(&path).unwrap();
        write!(
            f,
            r#"{{
                "accounts": [{{"account_id": "demo", "time_zone": ""}}],
                "events": [{{
                    "account_id": "demo", "device_id": "mobile",
                    "timestamp": 1700000000, "latitude": 39.1, "longitude": -142.2,
                    "address": ""
                }}]
            }}"#
        )
        .unwrap();

        let snap = FleetFsAdapter::read(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(snap.accounts[0].time_zone, None);
        assert_eq!(snap.events[0].timestamp.timestamp(), 1_700_000_000);
        assert_eq!(snap.events[0].address, None);
        assert!(snap.events[0].is_valid_gps());
    }
}
