use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::report::page::error_page::render_error_page;

/// Errors of the JSON API.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Helper for mapping any unknown error into internal error
pub fn internal_error<E: ToString>(err: E) -> AppError {
    AppError::InternalServerError(err.to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = Json(json!({
            "message": self.to_string()
        }));

        (status, body).into_response()
    }
}

/// Failures that end a report request with an HTML error page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("No report requested")]
    MissingReport,

    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Report: {0}\nDevice '{1}' not found.")]
    DeviceNotFound(String, String),

    #[error("Report: {0}\nNo Device selected.")]
    NoDeviceSelected(String),

    #[error("Report: {0}\nGroup '{1}' not found.")]
    GroupNotFound(String, String),

    #[error("Report: {0}\nNo Group selected.")]
    NoGroupSelected(String),

    #[error("Report: {0}\nError generating report")]
    ReportGeneration(String),

    /// Writer failure; carries the user-visible message.
    #[error("{0}")]
    Render(String),
}

impl ReportError {
    pub fn status(&self) -> StatusCode {
        match self {
            ReportError::MissingReport
            | ReportError::NoDeviceSelected(_)
            | ReportError::NoGroupSelected(_) => StatusCode::BAD_REQUEST,
            ReportError::ReportNotFound(_)
            | ReportError::AccountNotFound(_)
            | ReportError::DeviceNotFound(..)
            | ReportError::GroupNotFound(..) => StatusCode::NOT_FOUND,
            ReportError::ReportGeneration(_) | ReportError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let page = render_error_page(&self.to_string());
        (
            status,
            [(header::CACHE_CONTROL, "no-cache")],
            Html(page),
        )
            .into_response()
    }
}
