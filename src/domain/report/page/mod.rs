//! HTML pages: common frame, report menu, error page

pub mod error_page;
pub mod page_frame;
pub mod report_menu;
