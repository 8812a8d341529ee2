//! Report routes: HTML pages under /track and the catalog under /api/v1/reports

use axum::{routing::get, Router};
use crate::api::controller::report::ReportController;
use crate::app_state::AppState;

pub fn track_routes() -> Router<AppState> {
    Router::new()
        .route("/report", get(ReportController::display))
        // KML links carry the extension so viewers pick the right handler
        .route("/report.kml", get(ReportController::display))
        .route("/menu", get(ReportController::menu))
}

pub fn report_api_routes() -> Router<AppState> {
    Router::new().route("/", get(ReportController::list_reports))
}
