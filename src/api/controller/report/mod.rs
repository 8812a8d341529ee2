//! Report controller: report display page, menu and report catalog

use axum::extract::{OriginalUri, State};
use axum::Json;
use chrono::Utc;

use crate::api::dto::report_dto::ReportCatalogDto;
use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::core::util::uri_args::UriArgs;
use crate::domain::report::request_context::RequestContext;
use crate::domain::report::sink::ClientSink;
use crate::errors::{AppError, ReportError};

pub const ACCOUNT_ARG: &str = "account";
pub const USER_ARG: &str = "user";

pub struct ReportController;

impl ReportController {
    /// `GET /track/report`: renders the requested report in the requested format.
    pub async fn display(
        State(state): State<AppState>,
        OriginalUri(uri): OriginalUri,
    ) -> Result<ClientSink, ReportError> {
        let ctx = Self::request_context(&state, UriArgs::from_parts(uri.path(), uri.query()))?;
        state.report_service.display(&ctx).await
    }

    /// `GET /track/menu`
    pub async fn menu(
        State(state): State<AppState>,
        OriginalUri(uri): OriginalUri,
    ) -> Result<ClientSink, ReportError> {
        let ctx = Self::request_context(&state, UriArgs::from_parts(uri.path(), uri.query()))?;
        Ok(state.report_service.menu_page(&ctx, None))
    }

    pub async fn list_reports(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<ReportCatalogDto>>, AppError> {
        let registry = &state.report_service.registry;
        to_json(Ok(ReportCatalogDto::new(
            registry.entries().iter().map(|e| e.as_ref()),
        )))
    }

    fn request_context(state: &AppState, mut url: UriArgs) -> Result<RequestContext, ReportError> {
        url.expand_rtp();
        let account = url.arg_value(&[ACCOUNT_ARG]).map(str::to_string);
        let user = url.arg_value(&[USER_ARG]).map(str::to_string);
        state
            .report_service
            .request_context(account.as_deref(), user.as_deref(), url, Utc::now())
    }
}
