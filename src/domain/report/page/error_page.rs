use crate::domain::report::page::page_frame::PageFrame;

pub const ERROR_PAGE_TITLE: &str = "Report Error";

/// Minimal page for failures raised before the request is bound to an account.
pub fn render_error_page(message: &str) -> String {
    let frame = PageFrame {
        content: "<p><a href='/track/menu'>Reports</a></p>\n".to_string(),
        ..PageFrame::new(ERROR_PAGE_TITLE, "")
    }
    .with_message(Some(message));
    frame.render()
}
