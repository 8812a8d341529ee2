//! Request handling of the report display page: binding, date ranges,
//! derived URLs and output-format dispatch.

pub mod date_range_resolver;
pub mod email_renderer;
pub mod format_dispatcher;
pub mod report_display_service;
pub mod request_binder;
pub mod url_rewriter;

#[cfg(test)]
pub mod test_fixtures;
