//! Service status and health usecases

pub mod health_service;
pub mod status_service;
