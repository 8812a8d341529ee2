use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::core::persistence::fleet::fleet_entity::DeviceEntity;
use crate::core::persistence::fleet::fleet_repository_trait::FleetRepository;
use crate::core::state::session::session_store::SessionStore;
use crate::domain::report::model::{LimitType, OutputFormat, ReportRequest, ReportTarget};
use crate::domain::report::registry::{ReportEntry, ReportInstance, ReportRegistry};
use crate::domain::report::request_context::RequestContext;
use crate::domain::report::service::url_rewriter::{
    DATE_FROM_KEYS, DATE_TO_KEYS, FORMAT_KEYS, TIME_ZONE_KEYS,
};
use crate::errors::ReportError;

pub const REPORT_KEYS: [&str; 2] = ["r_report", "rpt"];
pub const OPTION_KEYS: [&str; 1] = ["r_opt"];
pub const DEVICE_KEYS: [&str; 1] = ["device"];
pub const GROUP_KEYS: [&str; 1] = ["group"];
pub const LIMIT_KEYS: [&str; 2] = ["r_limit", "lim"];
pub const EMAIL_KEYS: [&str; 2] = ["email", "r_emailAddr"];
pub const SHOW_PUSHPIN_KEYS: [&str; 1] = ["showpp"];
pub const ZOOM_PUSHPIN_KEYS: [&str; 1] = ["zoompp"];

/// Group id selecting every device the user may see.
pub const GROUP_ALL: &str = "all";
/// Report used when a device is given without a report id.
pub const DEFAULT_DEVICE_REPORT: &str = "EventDetail";

/// A created report, limits applied, not yet loaded.
pub struct BoundReport {
    pub entry: Arc<ReportEntry>,
    pub report: Box<dyn ReportInstance>,
    pub request: ReportRequest,
}

pub struct ReportRequestBinder<'a> {
    pub registry: &'a ReportRegistry,
    pub fleet: &'a dyn FleetRepository,
    pub session: &'a dyn SessionStore,
    pub max_limit: usize,
}

impl ReportRequestBinder<'_> {
    /// Request argument, or the session's last-used value when absent.
    fn param(&self, ctx: &RequestContext, keys: &[&str]) -> Option<String> {
        match ctx.url.arg_value(keys) {
            Some(v) => Some(v.trim().to_string()),
            None => self.session.get_attribute(&ctx.session_key, keys[0]),
        }
    }

    /// Reads the raw report parameters. Format and email never come from the session.
    pub fn read_request(&self, ctx: &RequestContext) -> ReportRequest {
        let non_blank = |v: Option<String>| v.filter(|s| !s.is_empty());
        let number = |keys: &[&str]| -> Option<u32> {
            ctx.url.arg_value(keys).and_then(|v| v.trim().parse().ok())
        };

        let limit = non_blank(self.param(ctx, &LIMIT_KEYS)).and_then(|v| match v.parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("Ignoring invalid limit '{}'", v);
                None
            }
        });

        ReportRequest {
            report_id: self.param(ctx, &REPORT_KEYS).unwrap_or_default(),
            option: ctx.url.arg_value(&OPTION_KEYS).unwrap_or("").trim().to_string(),
            device_id: non_blank(self.param(ctx, &DEVICE_KEYS)),
            group_id: non_blank(self.param(ctx, &GROUP_KEYS)),
            range_from: self.param(ctx, &DATE_FROM_KEYS).unwrap_or_default(),
            range_to: self.param(ctx, &DATE_TO_KEYS).unwrap_or_default(),
            time_zone_id: non_blank(self.param(ctx, &TIME_ZONE_KEYS)),
            limit,
            format: OutputFormat::parse(ctx.url.arg_value(&FORMAT_KEYS).unwrap_or("")),
            email_target: ctx
                .url
                .arg_value(&EMAIL_KEYS)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            show_pushpin: number(&SHOW_PUSHPIN_KEYS[..]),
            zoom_pushpin: number(&ZOOM_PUSHPIN_KEYS[..]),
        }
    }

    /// Looks up the report, resolves its target devices and creates the instance.
    pub fn bind(&self, ctx: &RequestContext) -> Result<BoundReport, ReportError> {
        let mut request = self.read_request(ctx);

        if request.report_id.is_empty() {
            if request.device_id.is_none() {
                return Err(ReportError::MissingReport);
            }
            request.report_id = DEFAULT_DEVICE_REPORT.to_string();
        }

        let entry = self.registry.lookup(&request.report_id).ok_or_else(|| {
            warn!("Report not found: {}", request.report_id);
            ReportError::ReportNotFound(request.report_id.clone())
        })?;

        let target = if entry.factory.is_group_report() {
            self.group_target(ctx, &entry, request.group_id.as_deref())?
        } else {
            self.device_target(ctx, &entry, request.device_id.as_deref())?
        };
        debug!(
            "Binding report {} to {} device(s)",
            entry.id,
            target.devices().len()
        );

        let mut report = entry
            .factory
            .create(&entry, &request.option, target)
            .map_err(|e| {
                error!("Unable to create report {}: {}", entry.id, e);
                ReportError::ReportGeneration(entry.id.clone())
            })?;

        let constraints = report.constraints_mut();
        match request.limit.filter(|n| *n > 0) {
            Some(n) => {
                constraints.selection_limit = Some(n.min(self.max_limit));
                constraints.limit_type = LimitType::Last;
            }
            None => {
                constraints.selection_limit = Some(self.max_limit);
                constraints.limit_type = LimitType::First;
            }
        }

        self.persist(ctx, &entry, &request);
        Ok(BoundReport {
            entry,
            report,
            request,
        })
    }

    fn device_target(
        &self,
        ctx: &RequestContext,
        entry: &ReportEntry,
        device_id: Option<&str>,
    ) -> Result<ReportTarget, ReportError> {
        let device_id = device_id.ok_or_else(|| ReportError::NoDeviceSelected(entry.id.clone()))?;
        let not_found = || ReportError::DeviceNotFound(entry.id.clone(), device_id.to_string());

        let device = self
            .fleet
            .get_device(ctx.account_id(), device_id)
            .map_err(|e| self.lookup_failed(entry, e))?
            .ok_or_else(not_found)?;
        let authorized = self
            .fleet
            .is_device_authorized(ctx.account_id(), ctx.user.as_ref(), device_id)
            .map_err(|e| self.lookup_failed(entry, e))?;
        if !authorized {
            warn!("Device '{}' is not authorized for {}", device_id, ctx.session_key);
            return Err(not_found());
        }
        Ok(ReportTarget::Device(device))
    }

    fn group_target(
        &self,
        ctx: &RequestContext,
        entry: &ReportEntry,
        group_id: Option<&str>,
    ) -> Result<ReportTarget, ReportError> {
        let group_id = group_id.ok_or_else(|| ReportError::NoGroupSelected(entry.id.clone()))?;
        let authorized = self
            .fleet
            .authorized_devices(ctx.account_id(), ctx.user.as_ref())
            .map_err(|e| self.lookup_failed(entry, e))?;

        if group_id.eq_ignore_ascii_case(GROUP_ALL) {
            return Ok(ReportTarget::DeviceSet {
                group_id: GROUP_ALL.to_string(),
                devices: authorized,
            });
        }

        let not_found = || ReportError::GroupNotFound(entry.id.clone(), group_id.to_string());
        let group = self
            .fleet
            .get_group(ctx.account_id(), group_id)
            .map_err(|e| self.lookup_failed(entry, e))?
            .ok_or_else(not_found)?;
        if let Some(user) = &ctx.user {
            if !user.authorized_groups.is_empty() && !user.authorized_groups.contains(&group.group_id) {
                warn!("Group '{}' is not authorized for {}", group_id, ctx.session_key);
                return Err(not_found());
            }
        }

        let members: HashSet<&str> = group.device_ids.iter().map(String::as_str).collect();
        let devices: Vec<DeviceEntity> = authorized
            .into_iter()
            .filter(|d| members.contains(d.device_id.as_str()))
            .collect();
        Ok(ReportTarget::DeviceSet {
            group_id: group.group_id,
            devices,
        })
    }

    fn lookup_failed(&self, entry: &ReportEntry, err: anyhow::Error) -> ReportError {
        error!("Fleet lookup failed for report {}: {}", entry.id, err);
        ReportError::ReportGeneration(entry.id.clone())
    }

    fn persist(&self, ctx: &RequestContext, entry: &ReportEntry, request: &ReportRequest) {
        let key = &ctx.session_key;
        self.session.set_attribute(key, REPORT_KEYS[0], &entry.id);
        if let Some(device) = &request.device_id {
            self.session.set_attribute(key, DEVICE_KEYS[0], device);
        }
        if let Some(group) = &request.group_id {
            self.session.set_attribute(key, GROUP_KEYS[0], group);
        }
        if let Some(limit) = request.limit {
            self.session.set_attribute(key, LIMIT_KEYS[0], &limit.to_string());
        }
    }
}
