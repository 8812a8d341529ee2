//! System controller: connects routes to system usecases

use axum::extract::State;
use axum::Json;

use crate::api::dto::system_dto::{HealthDto, SystemStatusDto};
use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::errors::AppError;

pub struct SystemController;

impl SystemController {
    pub async fn status(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<SystemStatusDto>>, AppError> {
        to_json(state.system_service.status().await)
    }

    pub async fn health(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<HealthDto>>, AppError> {
        to_json(state.system_service.health().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::persistence::fleet::fleet_entity::FleetSnapshot;
    use crate::core::persistence::fleet::fleet_repository::FleetSnapshotRepository;
    use crate::domain::report::service::test_fixtures::{config, fleet};

    #[tokio::test]
    async fn status_reports_fleet_and_registry() {
        let state = AppState::from_parts(config(), fleet(), None);
        let Json(response) = SystemController::status(State(state)).await.unwrap();
        let status = response.data.unwrap();
        assert_eq!(status.default_account, "demo");
        assert_eq!(status.report_count, 2);
        assert_eq!(status.device_count, 3);
        assert!(!status.mail_enabled);
    }

    #[tokio::test]
    async fn health_is_degraded_without_fleet_data() {
        let empty = Arc::new(FleetSnapshotRepository::new(FleetSnapshot::default()));
        let state = AppState::from_parts(config(), empty, None);
        let Json(response) = SystemController::health(State(state)).await.unwrap();
        let health = response.data.unwrap();
        assert_eq!(health.status, "degraded");
        assert!(!health.fleet_loaded);
    }
}
