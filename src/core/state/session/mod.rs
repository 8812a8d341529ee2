//! Per-session attribute storage (last-used report filters)

pub mod session_store;
