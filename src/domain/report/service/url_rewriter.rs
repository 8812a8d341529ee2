use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{error, warn};

use crate::core::util::date_arg::{
    current_day_end, current_day_start, format_day_offset, parse_arg_date, time_zone_or_gmt, DefaultTime,
};
use crate::core::util::uri_args::UriArgs;
use crate::domain::report::model::{AuxiliaryUrls, OutputFormat};

pub const FORMAT_KEYS: [&str; 3] = ["format", "r_format", "fmt"];
pub const DATE_FROM_KEYS: [&str; 2] = ["date_fr", "fr"];
pub const DATE_TO_KEYS: [&str; 2] = ["date_to", "to"];
pub const TIME_ZONE_KEYS: [&str; 2] = ["date_tz", "tz"];
pub const PASSWORD_KEYS: [&str; 2] = ["password", "encpass"];

/// Range keywords that are already relative and pass through untouched.
const RELATIVE_KEYWORDS: [&str; 2] = ["last", "from"];

/// Derives the links shown next to an HTML report. Every link works on its own copy of `url`.
pub struct UrlRewriter;

impl UrlRewriter {
    pub fn derive(url: &UriArgs, now: DateTime<Utc>) -> AuxiliaryUrls {
        let mut refresh = url.clone();
        refresh.remove_blank_values();

        AuxiliaryUrls {
            refresh: Some(refresh.to_string()),
            auto_report: Self::auto_report_url(url, now),
            graph: Some(Self::with_format(url, OutputFormat::Graph).to_string()),
            map: Some(Self::with_format(url, OutputFormat::Map).to_string()),
            kml: Some(
                Self::with_format(url, OutputFormat::Kml)
                    .add_extension(".kml")
                    .to_string(),
            ),
            schedule: None,
        }
    }

    /// Same report with dates relative to "now" (`±Nd,HH:MM`). `None` when a date does not parse.
    pub fn auto_report_url(url: &UriArgs, now: DateTime<Utc>) -> Option<String> {
        let mut auto = url.clone();
        auto.remove_blank_values();
        let tz = Self::url_time_zone(url);

        for (keys, dft) in [
            (&DATE_FROM_KEYS[..], DefaultTime::DayStart),
            (&DATE_TO_KEYS[..], DefaultTime::DayEnd),
        ] {
            let raw = auto.arg_value(keys).unwrap_or("").trim().to_string();
            if RELATIVE_KEYWORDS.iter().any(|k| raw.eq_ignore_ascii_case(k)) {
                continue;
            }
            let dt = if raw.is_empty() {
                match dft {
                    DefaultTime::DayStart => current_day_start(tz, now),
                    DefaultTime::DayEnd => current_day_end(tz, now),
                }
            } else {
                match parse_arg_date(&raw, tz, dft, now) {
                    Ok(dt) => dt.with_timezone(&tz),
                    Err(e) => {
                        warn!("Auto-report URL skipped, invalid date '{}': {}", raw, e);
                        return None;
                    }
                }
            };
            auto.set_arg_value(keys, format_day_offset(&dt, now, false));
        }
        Some(auto.to_string())
    }

    /// URL for scheduled execution: no password, no blanks, HTML, dates as `±Nd,HH:MM:SS`.
    ///
    /// Dates that fail to parse are left as given.
    pub fn schedule_url(url: &UriArgs, now: DateTime<Utc>) -> String {
        let mut sched = url.clone();
        sched.remove_arg(&PASSWORD_KEYS);
        sched.remove_blank_values();
        sched.set_arg_value(&FORMAT_KEYS, OutputFormat::Html.token());
        let tz = Self::url_time_zone(&sched);

        let from = sched.arg_value(&DATE_FROM_KEYS).map(str::to_string);
        let to = sched.arg_value(&DATE_TO_KEYS).map(str::to_string);
        let parsed = |raw: &Option<String>, dft: DefaultTime| match raw {
            Some(raw) => parse_arg_date(raw, tz, dft, now).map(|dt| Some(dt.with_timezone(&tz))),
            None => Ok(None),
        };
        match (parsed(&from, DefaultTime::DayStart), parsed(&to, DefaultTime::DayEnd)) {
            (Ok(from), Ok(to)) => {
                if let Some(dt) = from {
                    sched.set_arg_value(&DATE_FROM_KEYS, format_day_offset(&dt, now, true));
                }
                if let Some(dt) = to {
                    sched.set_arg_value(&DATE_TO_KEYS, format_day_offset(&dt, now, true));
                }
            }
            (Err(e), _) | (_, Err(e)) => error!("Unable to rewrite schedule dates: {}", e),
        }
        sched.to_string()
    }

    fn with_format(url: &UriArgs, format: OutputFormat) -> UriArgs {
        let mut out = url.clone();
        out.set_arg_value(&FORMAT_KEYS, format.token());
        out
    }

    fn url_time_zone(url: &UriArgs) -> Tz {
        time_zone_or_gmt(url.arg_value(&TIME_ZONE_KEYS).unwrap_or(""))
    }
}
