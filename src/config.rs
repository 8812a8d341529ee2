//! Runtime configuration loaded from `FLEET_*` environment variables.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use validator::Validate;

/// Encoding used for the marker payload embedded in the map page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MapDataFormat {
    Json,
    Xml,
}

impl MapDataFormat {
    pub fn as_code(&self) -> &'static str {
        match self {
            MapDataFormat::Json => "JSON",
            MapDataFormat::Xml => "XML",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "JSON" => Some(MapDataFormat::Json),
            "XML" => Some(MapDataFormat::Xml),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct AppConfig {
    /// Address the HTTP listener binds to.
    pub server_addr: String,
    /// Fleet snapshot (accounts, devices, groups, events) in JSON.
    pub data_path: PathBuf,
    /// Directory for the daily rolling log file.
    pub log_dir: PathBuf,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_level: String,
    pub debug_mode: bool,

    /// Account used when a request carries no `account` argument.
    #[validate(length(min = 1))]
    pub default_account: String,
    /// Zone used when neither the request nor the account names one.
    pub default_time_zone: String,

    pub page_title: String,
    pub copyright: String,

    pub map_data_format: MapDataFormat,
    /// Script implementing the map widget. `None` disables map output.
    pub map_provider_js: Option<String>,

    /// Upper bound applied to `r_limit`.
    #[validate(range(min = 1, max = 100000))]
    pub max_limit: usize,
    /// Write a header-only workbook instead of redisplaying the menu on empty spreadsheets.
    pub xlsx_export_empty: bool,

    /// Replaces scheme/host/path of the web link embedded in emailed reports.
    #[validate(url)]
    pub default_base_url: Option<String>,
    /// Sender address for emailed reports.
    #[validate(email)]
    pub report_email_from: Option<String>,
    /// HTTP relay accepting outbound mail. `None` means no mailer is available.
    #[validate(url)]
    pub mail_relay_url: Option<String>,
    #[serde(skip_serializing)]
    pub mail_relay_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:8080".into(),
            data_path: PathBuf::from("data/fleet.json"),
            log_dir: PathBuf::from("logs"),
            log_level: "info".into(),
            debug_mode: false,
            default_account: "demo".into(),
            default_time_zone: "GMT".into(),
            page_title: "Fleet Tracking".into(),
            copyright: "Copyright (C) Fleet Tracking".into(),
            map_data_format: MapDataFormat::Json,
            map_provider_js: Some("/js/maps/trackmap.js".into()),
            max_limit: 1000,
            xlsx_export_empty: false,
            default_base_url: None,
            report_email_from: None,
            mail_relay_url: None,
            mail_relay_token: None,
        }
    }
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str, dft: bool| -> bool {
            get(key)
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(dft)
        };

        let mut cfg = AppConfig::default();

        if let Some(v) = get("FLEET_SERVER_ADDR") {
            cfg.server_addr = v;
        }
        if let Some(v) = get("FLEET_DATA_PATH") {
            cfg.data_path = PathBuf::from(v);
        }
        if let Some(v) = get("FLEET_LOG_DIR") {
            cfg.log_dir = PathBuf::from(v);
        }
        if let Some(v) = get("FLEET_LOG_LEVEL") {
            cfg.log_level = v;
        }
        cfg.debug_mode = flag("FLEET_DEBUG_MODE", false);
        if let Some(v) = get("FLEET_DEFAULT_ACCOUNT") {
            cfg.default_account = v;
        }
        if let Some(v) = get("FLEET_DEFAULT_TIMEZONE") {
            cfg.default_time_zone = v;
        }
        if let Some(v) = get("FLEET_PAGE_TITLE") {
            cfg.page_title = v;
        }
        if let Some(v) = get("FLEET_COPYRIGHT") {
            cfg.copyright = v;
        }
        if let Some(v) = get("FLEET_MAP_DATA_FORMAT") {
            cfg.map_data_format = MapDataFormat::from_code(&v)
                .ok_or_else(|| anyhow!("FLEET_MAP_DATA_FORMAT must be JSON or XML, got '{}'", v))?;
        }
        if let Some(v) = lookup("FLEET_MAP_PROVIDER_JS") {
            // explicitly blank disables the map output
            let v = v.trim().to_string();
            cfg.map_provider_js = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = get("FLEET_MAX_LIMIT") {
            cfg.max_limit = v
                .parse()
                .with_context(|| format!("FLEET_MAX_LIMIT is not a number: '{}'", v))?;
        }
        cfg.xlsx_export_empty = flag("FLEET_XLSX_EXPORT_EMPTY", false);
        cfg.default_base_url = get("FLEET_DEFAULT_BASE_URL");
        cfg.report_email_from = get("FLEET_REPORT_EMAIL_FROM");
        cfg.mail_relay_url = get("FLEET_MAIL_RELAY_URL");
        cfg.mail_relay_token = get("FLEET_MAIL_RELAY_TOKEN");

        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.default_account, "demo");
        assert_eq!(cfg.map_data_format, MapDataFormat::Json);
        assert_eq!(cfg.max_limit, 1000);
        assert!(cfg.mail_relay_url.is_none());
        assert!(cfg.map_provider_js.is_some());
    }

    #[test]
    fn reads_overrides_and_flags() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("FLEET_MAP_DATA_FORMAT", "xml"),
            ("FLEET_MAX_LIMIT", "250"),
            ("FLEET_XLSX_EXPORT_EMPTY", "true"),
            ("FLEET_REPORT_EMAIL_FROM", "reports@example.com"),
            ("FLEET_MAP_PROVIDER_JS", ""),
        ]))
        .unwrap();

        assert_eq!(cfg.map_data_format, MapDataFormat::Xml);
        assert_eq!(cfg.max_limit, 250);
        assert!(cfg.xlsx_export_empty);
        assert_eq!(cfg.report_email_from.as_deref(), Some("reports@example.com"));
        assert!(cfg.map_provider_js.is_none());
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(AppConfig::from_lookup(lookup(&[("FLEET_MAP_DATA_FORMAT", "yaml")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("FLEET_MAX_LIMIT", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("FLEET_REPORT_EMAIL_FROM", "not-an-address")])).is_err());
    }
}
