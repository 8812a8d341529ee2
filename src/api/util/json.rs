use anyhow::Result;
use axum::Json;
use tracing::warn;

use crate::api::dto::ApiResponse;
use crate::errors::{internal_error, AppError};

/// Wraps a use-case result in the API envelope. Failures become 500s carrying the error chain.
pub fn to_json<T: serde::Serialize>(result: Result<T>) -> Result<Json<ApiResponse<T>>, AppError> {
    result.map(|value| Json(ApiResponse::ok(value))).map_err(|err| {
        warn!("API request failed: {:#}", err);
        internal_error(format!("{:#}", err))
    })
}
