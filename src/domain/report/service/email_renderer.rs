use tracing::{error, info, warn};
use validator::ValidateEmail;

use crate::config::AppConfig;
use crate::core::mail::mail_sender::{MailAttachment, MailMessage, MailSender};
use crate::core::util::uri_args::{UriArgs, RTP_ARG};
use crate::domain::report::model::OutputFormat;
use crate::domain::report::page::page_frame::PageFrame;
use crate::domain::report::registry::ReportInstance;
use crate::domain::report::sink::{BufferSink, RenderSink};
use crate::domain::report::service::request_binder::EMAIL_KEYS;
use crate::domain::report::service::url_rewriter::{FORMAT_KEYS, PASSWORD_KEYS};

/// Recipient asking for the rendered page itself instead of a mail.
pub const EMAIL_INLINE: &str = "INLINE";

pub const MSG_NO_FROM: &str = "The 'From' email address has not been configured";
pub const MSG_NO_TO: &str = "No recipient email address has been specified";
pub const MSG_SENT: &str = "The selected report has been emailed";
pub const MSG_SEND_FAILED: &str = "An error occurred while attempting to send email";

/// Where an emailed report ended up.
#[derive(Debug)]
pub enum EmailOutcome {
    /// Rendered page to be returned to the client as is.
    Inline(BufferSink),
    /// Status shown on the redisplayed menu.
    Status(String),
}

pub struct EmailRenderer<'a> {
    pub config: &'a AppConfig,
    pub mailer: Option<&'a dyn MailSender>,
}

impl EmailRenderer<'_> {
    /// Link back to the HTML version of the report, carried as a single `rtp_` argument.
    pub fn web_link(&self, url: &UriArgs) -> String {
        let mut link = url.clone();
        link.remove_arg(&EMAIL_KEYS);
        link.remove_arg(&PASSWORD_KEYS);
        link.remove_blank_values();
        link.set_arg_value(&FORMAT_KEYS, OutputFormat::Html.token());
        if let Some(base) = self.config.default_base_url.as_deref() {
            link.set_uri(base);
        }

        let mut out = UriArgs::new(link.uri());
        out.add_arg(RTP_ARG, link.encode_rtp());
        out.to_string()
    }

    /// Renders `frame` (plus the web link) into memory.
    pub fn render(&self, frame: PageFrame, url: &UriArgs) -> std::io::Result<BufferSink> {
        let frame = PageFrame {
            web_link: Some(self.web_link(url)),
            ..frame
        };
        let mut buffer = BufferSink::new();
        frame.write(&mut buffer)?;
        buffer.set_content_type(OutputFormat::EmailHtml.content_type());
        Ok(buffer)
    }

    /// Returns the page inline or mails it as an attachment. Never fails.
    pub async fn deliver(
        &self,
        report: &dyn ReportInstance,
        target: Option<&str>,
        buffer: BufferSink,
    ) -> EmailOutcome {
        let target = target.map(str::trim).unwrap_or("");
        if target == EMAIL_INLINE {
            return EmailOutcome::Inline(buffer);
        }

        let Some(from) = self
            .config
            .report_email_from
            .as_deref()
            .filter(|f| !f.trim().is_empty())
        else {
            warn!("Report {} not emailed: no sender configured", report.report_id());
            return EmailOutcome::Status(MSG_NO_FROM.to_string());
        };

        if !valid_recipients(target) {
            warn!("Report {} not emailed: invalid recipient '{}'", report.report_id(), target);
            return EmailOutcome::Status(MSG_NO_TO.to_string());
        }

        let Some(mailer) = self.mailer else {
            error!("Report {} not emailed: no mail transport configured", report.report_id());
            return EmailOutcome::Status(MSG_SEND_FAILED.to_string());
        };

        let subject = format!("Report: {}", report.title());
        let message = MailMessage {
            from: from.to_string(),
            to: target.to_string(),
            body: subject.clone(),
            subject,
            attachment: Some(MailAttachment {
                file_name: format!("{}.html", report.report_id()),
                content_type: "text/html".to_string(),
                data: buffer.into_bytes(),
            }),
        };

        match mailer.send(&message).await {
            Ok(()) => {
                info!("Report {} emailed to {}", report.report_id(), target);
                EmailOutcome::Status(MSG_SENT.to_string())
            }
            Err(e) => {
                error!("Unable to email report {}: {}", report.report_id(), e);
                EmailOutcome::Status(MSG_SEND_FAILED.to_string())
            }
        }
    }
}

/// Comma separated list with at least one address, all valid.
fn valid_recipients(to: &str) -> bool {
    let addrs: Vec<&str> = to.split(',').map(str::trim).filter(|a| !a.is_empty()).collect();
    !addrs.is_empty() && addrs.iter().all(|a| a.to_string().validate_email())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::fleet::fleet_entity::DeviceEntity;
    use crate::domain::report::model::ReportTarget;
    use crate::domain::report::registry::ReportRegistry;
    use crate::domain::report::service::test_fixtures::{config, RecordingMailSender};

    fn report() -> Box<dyn ReportInstance> {
        let registry = ReportRegistry::with_builtin_reports();
        let entry = registry.lookup("EventDetail").unwrap();
        let target = ReportTarget::Device(DeviceEntity {
            account_id: "demo".into(),
            device_id: "mobile".into(),
            description: "Mobile Unit".into(),
        });
        entry.factory.create(&entry, "", target).unwrap()
    }

    fn page() -> BufferSink {
        let mut sink = BufferSink::new();
        sink.write_str("<html>report</html>").unwrap();
        sink
    }

    #[test]
    fn web_link_hides_mail_and_password_args() {
        let mut cfg = config();
        cfg.default_base_url = Some("https://fleet.example.com/track/report".into());
        let renderer = EmailRenderer { config: &cfg, mailer: None };
        let url = UriArgs::parse(
            "/track/report?r_report=EventDetail&device=mobile&format=ehtml&email=a@example.com&password=pw",
        );

        let link = UriArgs::parse(&renderer.web_link(&url));
        assert_eq!(link.uri(), "https://fleet.example.com/track/report");
        assert_eq!(link.args().len(), 1);

        let mut expanded = link.clone();
        assert!(expanded.expand_rtp());
        assert_eq!(expanded.arg_value(&["format"]), Some("html"));
        assert_eq!(expanded.arg_value(&["device"]), Some("mobile"));
        assert!(!expanded.has_arg(&["email", "password"]));
    }

    #[tokio::test]
    async fn inline_returns_the_buffer_without_mailing() {
        let cfg = config();
        let mailer = RecordingMailSender::default();
        let renderer = EmailRenderer { config: &cfg, mailer: Some(&mailer) };
        let report = report();

        match renderer.deliver(report.as_ref(), Some("INLINE"), page()).await {
            EmailOutcome::Inline(buf) => assert_eq!(buf.as_text(), "<html>report</html>"),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn inline_keyword_is_case_sensitive() {
        let cfg = config();
        let mailer = RecordingMailSender::default();
        let renderer = EmailRenderer { config: &cfg, mailer: Some(&mailer) };
        let report = report();

        let outcome = renderer.deliver(report.as_ref(), Some("inline"), page()).await;
        assert!(matches!(outcome, EmailOutcome::Status(ref m) if m == MSG_NO_TO));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn sends_one_mail_with_html_attachment() {
        let cfg = config();
        let mailer = RecordingMailSender::default();
        let renderer = EmailRenderer { config: &cfg, mailer: Some(&mailer) };
        let report = report();

        let outcome = renderer.deliver(report.as_ref(), Some("ops@example.com"), page()).await;
        assert!(matches!(outcome, EmailOutcome::Status(ref m) if m == MSG_SENT));

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Report: Event Detail");
        assert_eq!(sent[0].from, "reports@example.com");
        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.file_name, "EventDetail.html");
        assert_eq!(attachment.data, b"<html>report</html>".to_vec());
    }

    #[tokio::test]
    async fn status_messages_for_each_failure() {
        let report = report();
        let mailer = RecordingMailSender::default();

        let mut no_from = config();
        no_from.report_email_from = None;
        let outcome = EmailRenderer { config: &no_from, mailer: Some(&mailer) }
            .deliver(report.as_ref(), Some("ops@example.com"), page())
            .await;
        assert!(matches!(outcome, EmailOutcome::Status(ref m) if m == MSG_NO_FROM));

        let cfg = config();
        for to in [None, Some(""), Some("not-an-address"), Some("ops@example.com, nope")] {
            let outcome = EmailRenderer { config: &cfg, mailer: Some(&mailer) }
                .deliver(report.as_ref(), to, page())
                .await;
            assert!(matches!(outcome, EmailOutcome::Status(ref m) if m == MSG_NO_TO), "to {:?}", to);
        }

        let outcome = EmailRenderer { config: &cfg, mailer: None }
            .deliver(report.as_ref(), Some("ops@example.com"), page())
            .await;
        assert!(matches!(outcome, EmailOutcome::Status(ref m) if m == MSG_SEND_FAILED));
        assert!(mailer.sent().is_empty());

        let failing = RecordingMailSender::failing();
        let outcome = EmailRenderer { config: &cfg, mailer: Some(&failing) }
            .deliver(report.as_ref(), Some("ops@example.com"), page())
            .await;
        assert!(matches!(outcome, EmailOutcome::Status(ref m) if m == MSG_SEND_FAILED));
        assert_eq!(failing.sent().len(), 1);
    }
}
