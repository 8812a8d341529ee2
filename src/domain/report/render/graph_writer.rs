use anyhow::Result;

use crate::core::util::html::escape_html;
use crate::domain::report::model::{OutputFormat, RenderOutcome};
use crate::domain::report::sink::RenderSink;

/// Charts are rendered elsewhere: this page carries the error text and,
/// when the report has one, a link to the chart image.
pub fn write_graph(
    sink: &mut dyn RenderSink,
    page_title: &str,
    copyright: &str,
    error_text: &str,
    graph_url: Option<&str>,
) -> Result<RenderOutcome> {
    sink.set_content_type(OutputFormat::Graph.content_type());

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("  <meta http-equiv='content-type' content='text/html; charset=UTF-8'/>\n");
    html.push_str("  <meta http-equiv='cache-control' content='no-cache'/>\n");
    html.push_str(&format!("  <meta name='copyright' content='{}'/>\n", escape_html(copyright)));
    html.push_str("  <meta name='robots' content='none'/>\n");
    html.push_str(&format!("  <title>{}</title>\n", escape_html(page_title)));
    html.push_str("</head>\n\n<body>\n");
    html.push_str(&format!("<p class='rptError'>{}</p>\n", escape_html(error_text)));
    if let Some(url) = graph_url.filter(|u| !u.trim().is_empty()) {
        html.push_str(&format!("<img src='{}'/>\n", escape_html(url)));
    }
    html.push_str("</body>\n</html>\n");
    sink.write_str(&html)?;

    Ok(RenderOutcome {
        row_count: 0,
        committed: true,
        error_message: Some(error_text.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::sink::BufferSink;

    #[test]
    fn image_only_when_url_present() {
        let mut sink = BufferSink::new();
        write_graph(&mut sink, "Fleet", "(c)", "Graph not available", Some("/charts/a.png?x=1&y=2")).unwrap();
        let html = sink.as_text();
        assert!(html.contains("Graph not available"));
        assert!(html.contains("<img src='/charts/a.png?x=1&amp;y=2'/>"));

        let mut sink = BufferSink::new();
        let outcome = write_graph(&mut sink, "Fleet", "(c)", "Graph not available", None).unwrap();
        assert!(!sink.as_text().contains("<img"));
        assert_eq!(outcome.error_message.as_deref(), Some("Graph not available"));
    }
}
