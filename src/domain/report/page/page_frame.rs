use std::io;

use crate::core::util::html::{escape_html, escape_js};
use crate::domain::report::sink::RenderSink;

/// Shared HTML document around every report page.
#[derive(Debug, Clone, Default)]
pub struct PageFrame {
    pub page_title: String,
    pub copyright: String,
    pub style: String,
    /// Inline script bodies.
    pub scripts: Vec<String>,
    pub onload_alert: Option<String>,
    /// Status banner above the content. Newlines become line breaks.
    pub message: Option<String>,
    pub web_link: Option<String>,
    pub content: String,
}

impl PageFrame {
    pub fn new(page_title: &str, copyright: &str) -> Self {
        Self {
            page_title: page_title.to_string(),
            copyright: copyright.to_string(),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: Option<&str>) -> Self {
        self.message = message.filter(|m| !m.trim().is_empty()).map(str::to_string);
        self
    }

    pub fn render(&self) -> String {
        let mut html = String::with_capacity(self.content.len() + 2048);
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("  <meta http-equiv='content-type' content='text/html; charset=UTF-8'/>\n");
        html.push_str("  <meta http-equiv='cache-control' content='no-cache'/>\n");
        html.push_str("  <meta http-equiv='expires' content='0'/>\n");
        html.push_str(&format!(
            "  <meta name='copyright' content='{}'/>\n",
            escape_html(&self.copyright)
        ));
        html.push_str("  <meta name='robots' content='none'/>\n");
        html.push_str(&format!("  <title>{}</title>\n", escape_html(&self.page_title)));
        html.push_str("<style type='text/css'>\n");
        html.push_str("body { font-family: Arial, Helvetica, sans-serif; }\n");
        html.push_str(".pageMessage { color: #AA0000; margin: 8px 0; }\n");
        html.push_str(".webLink { font-size: 8pt; margin: 8px 0; }\n");
        html.push_str(&self.style);
        html.push_str("</style>\n");
        for script in &self.scripts {
            html.push_str("<script type='text/javascript'>\n");
            html.push_str(script);
            html.push_str("</script>\n");
        }
        html.push_str("</head>\n\n");

        match &self.onload_alert {
            Some(alert) => html.push_str(&format!(
                "<body onload=\"javascript:alert('{}');\">\n",
                escape_html(&escape_js(alert))
            )),
            None => html.push_str("<body>\n"),
        }
        html.push_str(&format!("<h1>{}</h1>\n", escape_html(&self.page_title)));
        if let Some(msg) = &self.message {
            html.push_str(&format!(
                "<div class='pageMessage'>{}</div>\n",
                escape_html(msg).replace('\n', "<br/>\n")
            ));
        }
        if let Some(link) = &self.web_link {
            html.push_str(&format!(
                "<div class='webLink'><a href='{0}'>{0}</a></div>\n",
                escape_html(link)
            ));
        }
        html.push_str(&self.content);
        html.push_str(&format!(
            "\n<hr/>\n<div class='copyright'>{}</div>\n</body>\n</html>\n",
            escape_html(&self.copyright)
        ));
        html
    }

    pub fn write(&self, sink: &mut dyn RenderSink) -> io::Result<()> {
        sink.set_content_type("text/html; charset=UTF-8");
        sink.write_str(&self.render())
    }
}
