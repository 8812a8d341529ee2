//! Route declarations (`/track/*`, `/api/v1/*`)

pub mod report_routes;
pub mod system_routes;
