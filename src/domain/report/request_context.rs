use chrono::{DateTime, Utc};

use crate::core::persistence::fleet::fleet_entity::{AccountEntity, UserEntity};
use crate::core::util::uri_args::UriArgs;

pub const REPORT_PATH: &str = "/track/report";
pub const MENU_PATH: &str = "/track/menu";
/// Overrides the menu page linked from report pages.
pub const MENU_ARG: &str = "r_menu";

/// Per-request values shared by every report component. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub account: AccountEntity,
    pub user: Option<UserEntity>,
    /// Request path plus ordered arguments, `rtp_` already expanded.
    pub url: UriArgs,
    pub session_key: String,
    pub now: DateTime<Utc>,
    pub menu_path: String,
}

impl RequestContext {
    pub fn new(
        account: AccountEntity,
        user: Option<UserEntity>,
        mut url: UriArgs,
        now: DateTime<Utc>,
    ) -> Self {
        url.expand_rtp();
        let session_key = format!(
            "{}/{}",
            account.account_id,
            user.as_ref().map(|u| u.user_id.as_str()).unwrap_or("")
        );
        let menu_path = url
            .arg_value(&[MENU_ARG])
            .map(str::trim)
            .filter(|p| p.starts_with('/'))
            .unwrap_or(MENU_PATH)
            .to_string();
        Self {
            account,
            user,
            url,
            session_key,
            now,
            menu_path,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account.account_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.user_id.as_str())
    }

    /// User zone, then account zone.
    pub fn preferred_time_zone(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.time_zone.as_deref())
            .or(self.account.time_zone.as_deref())
            .filter(|tz| !tz.trim().is_empty())
    }
}
