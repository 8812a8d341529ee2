use anyhow::anyhow;
use tracing::{error, info};

use crate::core::util::html::escape_html;
use crate::domain::report::model::{AuxiliaryUrls, OutputFormat, ReportContext};
use crate::domain::report::page::page_frame::PageFrame;
use crate::domain::report::render::html_table::SORTABLE_SCRIPT;
use crate::domain::report::render::map_writer::MapPage;
use crate::domain::report::render::{graph_writer, kml_writer, map_writer};
use crate::domain::report::request_context::RequestContext;
use crate::domain::report::service::email_renderer::{EmailOutcome, EmailRenderer};
use crate::domain::report::service::report_display_service::ReportDisplayService;
use crate::domain::report::service::url_rewriter::UrlRewriter;
use crate::domain::report::sink::{BufferSink, ClientSink};
use crate::errors::ReportError;

pub const MSG_NO_DATA: &str = "The selected Date/Time range contains no data.";
const MSG_NO_GRAPH: &str = "This report does not provide a graph.";

/// Routes a bound report to the writer of its output format.
pub struct FormatDispatcher<'a> {
    service: &'a ReportDisplayService,
}

impl<'a> FormatDispatcher<'a> {
    pub fn new(service: &'a ReportDisplayService) -> Self {
        Self { service }
    }

    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        rc: &ReportContext,
    ) -> Result<ClientSink, ReportError> {
        match rc.request.format {
            OutputFormat::Html => self.html(ctx, rc),
            OutputFormat::Xml => self.tabular(ctx, rc, OutputFormat::Xml),
            OutputFormat::Csv => self.tabular(ctx, rc, OutputFormat::Csv),
            OutputFormat::Txt => self.tabular(ctx, rc, OutputFormat::Txt),
            OutputFormat::Xls => self.tabular(ctx, rc, OutputFormat::Xls),
            OutputFormat::Xlsx => self.tabular(ctx, rc, OutputFormat::Xlsx),
            OutputFormat::Graph => self.graph(rc),
            OutputFormat::Map => self.map(rc),
            OutputFormat::Kml => self.kml(rc),
            OutputFormat::Schedule => Ok(self.schedule(ctx)),
            OutputFormat::EmailHtml => self.email(ctx, rc).await,
        }
    }

    /// Buffers the body so an empty result can still become the menu page.
    fn tabular(
        &self,
        ctx: &RequestContext,
        rc: &ReportContext,
        format: OutputFormat,
    ) -> Result<ClientSink, ReportError> {
        let label = format.token().to_ascii_uppercase();
        let mut buffer = BufferSink::new();
        let outcome = rc
            .report
            .write_report(format, &mut buffer, &self.service.config)
            .map_err(|e| render_failed(rc, &label, e))?;

        if !outcome.has_output() {
            info!("Report {} has no rows for {}", rc.report_id(), format);
            let message = format!("{}\nReport: {}", MSG_NO_DATA, rc.report.title());
            return Ok(self.service.menu_page(ctx, Some(&message)));
        }

        let mut client = ClientSink::new();
        client
            .absorb(buffer)
            .map_err(|e| render_failed(rc, &label, e.into()))?;
        Ok(client)
    }

    fn html(&self, ctx: &RequestContext, rc: &ReportContext) -> Result<ClientSink, ReportError> {
        let frame = self.report_frame(ctx, rc, OutputFormat::Html)?;
        let mut client = ClientSink::new();
        frame
            .write(&mut client)
            .map_err(|e| render_failed(rc, "HTML", e.into()))?;
        Ok(client)
    }

    fn graph(&self, rc: &ReportContext) -> Result<ClientSink, ReportError> {
        let config = &self.service.config;
        let graph_url = rc.report.graph_url();
        let text = match &graph_url {
            Some(_) => format!("Report: {}", rc.report.title()),
            None => format!("{}\nReport: {}", MSG_NO_GRAPH, rc.report.title()),
        };

        let mut client = ClientSink::new();
        graph_writer::write_graph(
            &mut client,
            &config.page_title,
            &config.copyright,
            &text,
            graph_url.as_deref(),
        )
        .map_err(|e| render_failed(rc, "graph", e))?;
        Ok(client)
    }

    fn map(&self, rc: &ReportContext) -> Result<ClientSink, ReportError> {
        let config = &self.service.config;
        let Some(provider_js) = config.map_provider_js.as_deref() else {
            return Err(render_failed(rc, "map", anyhow!("no map provider configured")));
        };
        let page = MapPage {
            page_title: &config.page_title,
            copyright: &config.copyright,
            provider_js,
            data_format: config.map_data_format,
            time_zone: rc.range.time_zone,
            show_pushpin: rc.request.show_pushpin,
            zoom_pushpin: rc.request.zoom_pushpin,
        };

        let mut client = ClientSink::new();
        map_writer::write_map(&mut client, &page, rc.report.as_ref())
            .map_err(|e| render_failed(rc, "map", e))?;
        Ok(client)
    }

    fn kml(&self, rc: &ReportContext) -> Result<ClientSink, ReportError> {
        let mut client = ClientSink::new();
        kml_writer::write_kml(&mut client, rc.report.as_ref(), rc.range.time_zone)
            .map_err(|e| render_failed(rc, "KML", e))?;
        Ok(client)
    }

    fn schedule(&self, ctx: &RequestContext) -> ClientSink {
        let url = UrlRewriter::schedule_url(&ctx.url, ctx.now);
        info!("Report URL: {}", url);
        self.service
            .menu_page(ctx, Some(&format!("Report URL: {}", url)))
    }

    async fn email(&self, ctx: &RequestContext, rc: &ReportContext) -> Result<ClientSink, ReportError> {
        let frame = self.report_frame(ctx, rc, OutputFormat::EmailHtml)?;
        let renderer = EmailRenderer {
            config: &self.service.config,
            mailer: self.service.mailer.as_deref(),
        };
        let buffer = renderer
            .render(frame, &ctx.url)
            .map_err(|e| render_failed(rc, "HTML", e.into()))?;

        match renderer
            .deliver(rc.report.as_ref(), rc.request.email_target.as_deref(), buffer)
            .await
        {
            EmailOutcome::Inline(buffer) => {
                let mut client = ClientSink::new();
                client
                    .absorb(buffer)
                    .map_err(|e| render_failed(rc, "HTML", e.into()))?;
                Ok(client)
            }
            EmailOutcome::Status(message) => Ok(self.service.menu_page(ctx, Some(&message))),
        }
    }

    /// Page frame holding the title, range, links and HTML table of the report.
    fn report_frame(
        &self,
        ctx: &RequestContext,
        rc: &ReportContext,
        format: OutputFormat,
    ) -> Result<PageFrame, ReportError> {
        let config = &self.service.config;
        let mut style = BufferSink::new();
        rc.report
            .write_style(format, &mut style)
            .map_err(|e| render_failed(rc, "HTML", e.into()))?;
        let mut body = BufferSink::new();
        rc.report
            .write_report(format, &mut body, config)
            .map_err(|e| render_failed(rc, "HTML", e))?;

        let mut content = String::new();
        content.push_str(&format!(
            "<h2 class='rptTitle'>{}</h2>\n",
            escape_html(rc.report.title())
        ));
        content.push_str(&format!(
            "<div class='rptRange'>{} - {} ({})</div>\n",
            rc.range.from.format("%Y/%m/%d %H:%M:%S"),
            rc.range.to.format("%Y/%m/%d %H:%M:%S"),
            escape_html(rc.range.time_zone.name())
        ));
        if format == OutputFormat::Html {
            content.push_str(&links(&rc.urls, &ctx.menu_path));
        }
        content.push_str(&body.as_text());

        let mut scripts = Vec::new();
        if rc.entry.factory.is_sortable() {
            scripts.push(SORTABLE_SCRIPT.to_string());
        }
        Ok(PageFrame {
            style: style.as_text(),
            scripts,
            content,
            ..PageFrame::new(&config.page_title, &config.copyright)
        })
    }
}

fn links(urls: &AuxiliaryUrls, menu_path: &str) -> String {
    let entries = [
        ("Menu", Some(menu_path)),
        ("Refresh", urls.refresh.as_deref()),
        ("Auto-Report", urls.auto_report.as_deref()),
        ("Graph", urls.graph.as_deref()),
        ("Map", urls.map.as_deref()),
        ("Google Earth", urls.kml.as_deref()),
    ];
    let anchors: Vec<String> = entries
        .iter()
        .filter_map(|(label, url)| {
            url.map(|u| format!("<a href='{}'>{}</a>", escape_html(u), label))
        })
        .collect();
    format!("<div class='rptLinks'>{}</div>\n", anchors.join(" | "))
}

fn render_failed(rc: &ReportContext, label: &str, err: anyhow::Error) -> ReportError {
    error!("Error generating {} for report {}: {:#}", label, rc.report_id(), err);
    ReportError::Render(format!("Error generating {}: {}", label, rc.report_id()))
}
