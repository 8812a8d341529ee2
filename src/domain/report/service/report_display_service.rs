use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::mail::mail_sender::MailSender;
use crate::core::persistence::fleet::fleet_repository_trait::FleetRepository;
use crate::core::state::session::session_store::SessionStore;
use crate::core::util::uri_args::UriArgs;
use crate::domain::report::model::{AuxiliaryUrls, OutputFormat, ReportContext};
use crate::domain::report::page::page_frame::PageFrame;
use crate::domain::report::page::report_menu::{MenuFilters, ReportMenu};
use crate::domain::report::registry::ReportRegistry;
use crate::domain::report::request_context::{RequestContext, REPORT_PATH};
use crate::domain::report::service::date_range_resolver::{
    DateRangeResolver, ARG_DATE_FROM, ARG_DATE_TO, ARG_TIME_ZONE,
};
use crate::domain::report::service::format_dispatcher::FormatDispatcher;
use crate::domain::report::service::request_binder::{
    ReportRequestBinder, DEVICE_KEYS, GROUP_KEYS, LIMIT_KEYS, REPORT_KEYS,
};
use crate::domain::report::service::url_rewriter::UrlRewriter;
use crate::domain::report::sink::ClientSink;
use crate::errors::ReportError;

/// Entry point of the report display page.
pub struct ReportDisplayService {
    pub config: Arc<AppConfig>,
    pub registry: Arc<ReportRegistry>,
    pub fleet: Arc<dyn FleetRepository>,
    pub session: Arc<dyn SessionStore>,
    pub mailer: Option<Arc<dyn MailSender>>,
}

impl ReportDisplayService {
    pub fn new(
        config: Arc<AppConfig>,
        registry: Arc<ReportRegistry>,
        fleet: Arc<dyn FleetRepository>,
        session: Arc<dyn SessionStore>,
        mailer: Option<Arc<dyn MailSender>>,
    ) -> Self {
        Self {
            config,
            registry,
            fleet,
            session,
            mailer,
        }
    }

    /// Resolves account and user for a request. Unknown users are treated as anonymous.
    pub fn request_context(
        &self,
        account_id: Option<&str>,
        user_id: Option<&str>,
        url: UriArgs,
        now: DateTime<Utc>,
    ) -> Result<RequestContext, ReportError> {
        let account_id = account_id
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(&self.config.default_account);
        let account = self
            .fleet
            .get_account(account_id)
            .map_err(|e| {
                error!("Account lookup failed for {}: {}", account_id, e);
                ReportError::AccountNotFound(account_id.to_string())
            })?
            .ok_or_else(|| ReportError::AccountNotFound(account_id.to_string()))?;

        let user = match user_id.map(str::trim).filter(|u| !u.is_empty()) {
            Some(user_id) => match self.fleet.get_user(account_id, user_id) {
                Ok(Some(user)) => Some(user),
                Ok(None) => {
                    warn!("Unknown user '{}' for account {}", user_id, account_id);
                    None
                }
                Err(e) => {
                    warn!("User lookup failed for {}/{}: {}", account_id, user_id, e);
                    None
                }
            },
            None => None,
        };

        Ok(RequestContext::new(account, user, url, now))
    }

    /// Binds the request and loads the report data.
    pub fn build_context(&self, ctx: &RequestContext) -> Result<ReportContext, ReportError> {
        let binder = ReportRequestBinder {
            registry: &self.registry,
            fleet: self.fleet.as_ref(),
            session: self.session.as_ref(),
            max_limit: self.config.max_limit,
        };
        let bound = binder.bind(ctx)?;
        let request = bound.request;
        let mut report = bound.report;

        let tz = DateRangeResolver::resolve_time_zone(
            request.time_zone_id.as_deref(),
            ctx.preferred_time_zone(),
            &self.config.default_time_zone,
        );
        let range = DateRangeResolver::resolve(
            &request.range_from,
            &request.range_to,
            tz,
            || match request.device_id.as_deref() {
                Some(device_id) => Ok(self
                    .fleet
                    .last_event(ctx.account_id(), device_id)?
                    .map(|e| e.timestamp)),
                None => Ok(None),
            },
            ctx.now,
        );
        DateRangeResolver::persist(&range, self.session.as_ref(), &ctx.session_key);
        debug!(
            "Report {} range {} .. {} ({})",
            bound.entry.id,
            range.from,
            range.to,
            range.time_zone.name()
        );

        report.set_time_range(&range);
        report.post_initialize(self.fleet.as_ref()).map_err(|e| {
            error!("Unable to load report {}: {}", bound.entry.id, e);
            ReportError::ReportGeneration(bound.entry.id.clone())
        })?;

        let urls = match request.format {
            OutputFormat::Html => UrlRewriter::derive(&ctx.url, ctx.now),
            _ => AuxiliaryUrls::default(),
        };

        Ok(ReportContext {
            entry: bound.entry,
            report,
            request,
            range,
            urls,
        })
    }

    /// Handles one report request end to end.
    pub async fn display(&self, ctx: &RequestContext) -> Result<ClientSink, ReportError> {
        let span = info_span!(
            "report",
            request_id = %Uuid::new_v4(),
            session = %ctx.session_key
        );
        async move {
            let rc = self.build_context(ctx)?;
            info!(
                "Displaying report {} as {}",
                rc.report_id(),
                rc.request.format
            );
            FormatDispatcher::new(self).dispatch(ctx, &rc).await
        }
        .instrument(span)
        .await
    }

    /// Report selection page prefilled with the session's last-used filters.
    pub fn menu_page(&self, ctx: &RequestContext, message: Option<&str>) -> ClientSink {
        let get = |name: &str| self.session.get_attribute(&ctx.session_key, name);
        let filters = MenuFilters {
            report_id: get(REPORT_KEYS[0]),
            device_id: get(DEVICE_KEYS[0]),
            group_id: get(GROUP_KEYS[0]),
            date_from: get(ARG_DATE_FROM),
            date_to: get(ARG_DATE_TO),
            time_zone: get(ARG_TIME_ZONE),
            limit: get(LIMIT_KEYS[0]),
        };
        let devices = self
            .fleet
            .authorized_devices(ctx.account_id(), ctx.user.as_ref())
            .unwrap_or_else(|e| {
                warn!("Unable to list devices for {}: {}", ctx.session_key, e);
                Vec::new()
            });

        let content = ReportMenu {
            action: REPORT_PATH,
            account_id: ctx.account_id(),
            user_id: ctx.user_id(),
            registry: &self.registry,
            devices: &devices,
            filters: &filters,
        }
        .content();
        let frame = PageFrame {
            content,
            ..PageFrame::new(&self.config.page_title, &self.config.copyright)
        }
        .with_message(message);

        let mut sink = ClientSink::new();
        if let Err(e) = frame.write(&mut sink) {
            error!("Unable to write menu page: {}", e);
        }
        sink
    }
}
