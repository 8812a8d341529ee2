use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::api::dto::system_dto::{HealthDto, SystemStatusDto};
use crate::config::AppConfig;
use crate::core::mail::http_relay_sender::HttpRelayMailSender;
use crate::core::mail::mail_sender::MailSender;
use crate::core::persistence::fleet::fleet_repository::FleetSnapshotRepository;
use crate::core::persistence::fleet::fleet_repository_trait::FleetRepository;
use crate::core::state::session::session_store::InMemorySessionStore;
use crate::domain::report::registry::ReportRegistry;
use crate::domain::report::service::report_display_service::ReportDisplayService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub report_service: Arc<ReportDisplayService>,
    pub system_service: Arc<SystemService>,
}

/// Loads the fleet data and wires the services from `config`.
pub fn build_app_state(config: AppConfig) -> Result<AppState> {
    let fleet = FleetSnapshotRepository::load(&config.data_path)?;

    let mailer: Option<Arc<dyn MailSender>> = match &config.mail_relay_url {
        Some(url) => {
            info!("Emailed reports go through relay {}", url);
            Some(Arc::new(HttpRelayMailSender::new(
                url.clone(),
                config.mail_relay_token.clone(),
            )))
        }
        None => {
            warn!("No mail relay configured, emailed reports are disabled");
            None
        }
    };

    Ok(AppState::from_parts(config, Arc::new(fleet), mailer))
}

impl AppState {
    pub fn from_parts(
        config: AppConfig,
        fleet: Arc<dyn FleetRepository>,
        mailer: Option<Arc<dyn MailSender>>,
    ) -> Self {
        let config = Arc::new(config);
        let report_service = Arc::new(ReportDisplayService::new(
            config.clone(),
            Arc::new(ReportRegistry::with_builtin_reports()),
            fleet,
            Arc::new(InMemorySessionStore::new()),
            mailer,
        ));
        AppState {
            config,
            system_service: Arc::new(SystemService::new(report_service.clone())),
            report_service,
        }
    }
}

#[derive(Clone)]
pub struct SystemService {
    started_at: DateTime<Utc>,
    reports: Arc<ReportDisplayService>,
}

impl SystemService {
    pub fn new(reports: Arc<ReportDisplayService>) -> Self {
        Self {
            started_at: Utc::now(),
            reports,
        }
    }

    pub async fn status(&self) -> Result<SystemStatusDto> {
        crate::domain::system::service::status_service::status(self.started_at, &self.reports).await
    }

    pub async fn health(&self) -> Result<HealthDto> {
        crate::domain::system::service::health_service::health(&self.reports).await
    }
}
