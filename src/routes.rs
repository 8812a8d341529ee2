use axum::{
    extract::OriginalUri,
    response::Redirect,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::routes::{report_routes, system_routes};
use crate::app_state::AppState;
use crate::domain::report::request_context::MENU_PATH;
use crate::errors::AppError;

/// Build the main application router
pub fn app_router() -> Router<AppState> {
    let api_v1 = Router::new()
        .nest("/reports", report_routes::report_api_routes())
        .nest("/system", system_routes::system_routes());

    Router::new()
        // Landing on the site opens the report menu
        .route("/", get(root))
        // Liveness probe
        .route("/health", get(health_check))
        // HTML report pages
        .nest("/track", report_routes::track_routes())
        .nest("/api/v1", api_v1)
        .fallback(handler_404)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
}

async fn root() -> Redirect {
    Redirect::to(MENU_PATH)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn handler_404(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn root_redirects_to_menu() {
        let response = root().await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], MENU_PATH);
    }

    #[tokio::test]
    async fn unknown_path_is_json_not_found() {
        let uri = "/nope".parse().unwrap();
        let response = handler_404(OriginalUri(uri)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Not found: /nope");
    }
}
