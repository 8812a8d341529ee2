//! Controllers: connect routes to domain usecases

pub mod report;
pub mod system;
