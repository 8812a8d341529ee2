//! Shared helpers: URL arguments, date arguments, HTML escaping

pub mod date_arg;
pub mod html;
pub mod uri_args;
