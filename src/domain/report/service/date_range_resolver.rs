use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::core::state::session::session_store::SessionStore;
use crate::core::util::date_arg::{
    current_day_end, current_day_start, day_end, day_start, format_arg_date_time, parse_arg_date,
    parse_time_zone, DefaultTime,
};
use crate::domain::report::model::ResolvedDateRange;

pub const ARG_DATE_FROM: &str = "date_fr";
pub const ARG_DATE_TO: &str = "date_to";
pub const ARG_TIME_ZONE: &str = "date_tz";

const RANGE_LAST: &str = "last";
const RANGE_FROM: &str = "from";

pub struct DateRangeResolver;

impl DateRangeResolver {
    /// Request zone, then user/account zone, then the configured default. Invalid ids become GMT.
    pub fn resolve_time_zone(requested: Option<&str>, preferred: Option<&str>, fallback: &str) -> Tz {
        let id = [requested, preferred, Some(fallback)]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|id| !id.is_empty())
            .unwrap_or("");
        match parse_time_zone(id) {
            Some(tz) => tz,
            None => {
                if !id.is_empty() {
                    warn!("Invalid time zone '{}', using GMT", id);
                }
                chrono_tz::GMT
            }
        }
    }

    /// Resolves `raw_from`/`raw_to` in `tz`. Unusable input falls back to the current day.
    ///
    /// `last_event` is invoked at most once, and only when either bound is `last`.
    pub fn resolve<F>(raw_from: &str, raw_to: &str, tz: Tz, last_event: F, now: DateTime<Utc>) -> ResolvedDateRange
    where
        F: FnOnce() -> Result<Option<DateTime<Utc>>>,
    {
        let raw_from = raw_from.trim();
        let raw_to = raw_to.trim();
        let from_last = raw_from.eq_ignore_ascii_case(RANGE_LAST);
        let to_last = raw_to.eq_ignore_ascii_case(RANGE_LAST);

        let last_ts = if from_last || to_last {
            match last_event() {
                Ok(ts) => ts,
                Err(e) => {
                    warn!("Last event lookup failed: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let last_day = last_ts.map(|ts| ts.with_timezone(&tz).date_naive());

        let from = if from_last {
            match last_day {
                Some(day) => day_start(day, tz),
                None => {
                    debug!("No last event, 'from' is the start of today");
                    current_day_start(tz, now)
                }
            }
        } else if !raw_from.is_empty() {
            match parse_arg_date(raw_from, tz, DefaultTime::DayStart, now) {
                Ok(dt) => dt.with_timezone(&tz),
                Err(e) => {
                    warn!("Unable to parse 'from' date '{}': {}", raw_from, e);
                    current_day_start(tz, now)
                }
            }
        } else {
            current_day_start(tz, now)
        };

        let to = if to_last {
            match last_day {
                Some(day) => day_end(day, tz),
                None => current_day_end(tz, now),
            }
        } else if raw_to.eq_ignore_ascii_case(RANGE_FROM) {
            day_end(from.date_naive(), tz)
        } else if !raw_to.is_empty() {
            match parse_arg_date(raw_to, tz, DefaultTime::DayEnd, now) {
                Ok(dt) => dt.with_timezone(&tz),
                Err(e) => {
                    warn!("Unable to parse 'to' date '{}': {}", raw_to, e);
                    current_day_end(tz, now)
                }
            }
        } else {
            current_day_end(tz, now)
        };

        ResolvedDateRange { from, to, time_zone: tz }
    }

    /// Stores the resolved range as the session's last-used dates.
    pub fn persist(range: &ResolvedDateRange, session: &dyn SessionStore, session_key: &str) {
        session.set_attribute(session_key, ARG_DATE_FROM, &format_arg_date_time(&range.from));
        session.set_attribute(session_key, ARG_DATE_TO, &format_arg_date_time(&range.to));
        session.set_attribute(session_key, ARG_TIME_ZONE, range.time_zone.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::session::session_store::InMemorySessionStore;
    use anyhow::anyhow;
    use chrono::{NaiveDate, TimeZone};
    use std::cell::Cell;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap()
    }

    fn no_lookup() -> Result<Option<DateTime<Utc>>> {
        panic!("last event lookup not expected")
    }

    fn today_bounds(tz: Tz) -> (DateTime<Tz>, DateTime<Tz>) {
        (current_day_start(tz, now()), current_day_end(tz, now()))
    }

    #[test]
    fn blank_bounds_are_the_current_day() {
        for tz in [chrono_tz::GMT, chrono_tz::US::Pacific, chrono_tz::Asia::Tokyo] {
            let range = DateRangeResolver::resolve("", "  ", tz, no_lookup, now());
            let (start, end) = today_bounds(tz);
            assert_eq!(range.from, start);
            assert_eq!(range.to, end);
            assert_eq!(range.time_zone, tz);
        }
        let tokyo = DateRangeResolver::resolve("", "", chrono_tz::Asia::Tokyo, no_lookup, now());
        assert_eq!(tokyo.from.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 16).unwrap());
    }

    #[test]
    fn malformed_dates_fall_back_to_the_current_day() {
        let tz = chrono_tz::US::Pacific;
        for (from, to) in [
            ("garbage", "2024/13/45"),
            ("1/2/3/4/5/6/7", "x,y,z,w"),
            ("+d", "-Qd"),
            ("+999999999999999d", "-9223372036854775807"),
            ("-9223372036854775807", "+999999999999999d"),
        ] {
            let range = DateRangeResolver::resolve(from, to, tz, no_lookup, now());
            let (start, end) = today_bounds(tz);
            assert_eq!(range.from, start, "from {:?}", from);
            assert_eq!(range.to, end, "to {:?}", to);
        }
    }

    #[test]
    fn last_uses_the_day_of_the_last_event() {
        let tz = chrono_tz::GMT;
        let t = Utc.with_ymd_and_hms(2024, 2, 10, 13, 5, 0).unwrap();
        let calls = Cell::new(0);
        let range = DateRangeResolver::resolve(
            "LAST",
            "last",
            tz,
            || {
                calls.set(calls.get() + 1);
                Ok(Some(t))
            },
            now(),
        );
        let day = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(range.from, day_start(day, tz));
        assert_eq!(range.to, day_end(day, tz));

        let open_end = DateRangeResolver::resolve("last", "", tz, || Ok(Some(t)), now());
        assert_eq!(open_end.from, day_start(day, tz));
        assert_eq!(open_end.to, current_day_end(tz, now()));
    }

    #[test]
    fn last_without_event_or_with_lookup_error_is_today() {
        let tz = chrono_tz::GMT;
        let (start, end) = today_bounds(tz);
        let none = DateRangeResolver::resolve("last", "last", tz, || Ok(None), now());
        assert_eq!((none.from, none.to), (start, end));
        let failed = DateRangeResolver::resolve("last", "last", tz, || Err(anyhow!("db down")), now());
        assert_eq!((failed.from, failed.to), (start, end));
    }

    #[test]
    fn to_from_ends_the_day_of_from() {
        let tz = chrono_tz::GMT;
        let range = DateRangeResolver::resolve("2024/01/05/08:00", "from", tz, no_lookup, now());
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(range.from, tz.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap());
        assert_eq!(range.to, day_end(day, tz));
    }

    #[test]
    fn explicit_dates_use_day_defaults() {
        let tz = chrono_tz::GMT;
        let range = DateRangeResolver::resolve("2024/01/05", "2024/01/07", tz, no_lookup, now());
        assert_eq!(range.from, tz.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
        assert_eq!(range.to, tz.with_ymd_and_hms(2024, 1, 7, 23, 59, 59).unwrap());
    }

    #[test]
    fn inverted_range_is_kept() {
        let tz = chrono_tz::GMT;
        let range = DateRangeResolver::resolve("2024/02/01", "2024/01/01", tz, no_lookup, now());
        assert!(range.to < range.from);
    }

    #[test]
    fn time_zone_chain_and_gmt_fallback() {
        assert_eq!(
            DateRangeResolver::resolve_time_zone(Some("Europe/Paris"), Some("US/Pacific"), "GMT"),
            chrono_tz::Europe::Paris
        );
        assert_eq!(
            DateRangeResolver::resolve_time_zone(Some(" "), Some("US/Pacific"), "GMT"),
            chrono_tz::US::Pacific
        );
        assert_eq!(
            DateRangeResolver::resolve_time_zone(None, None, "Asia/Tokyo"),
            chrono_tz::Asia::Tokyo
        );
        assert_eq!(
            DateRangeResolver::resolve_time_zone(Some("Mars/Olympus"), None, "Asia/Tokyo"),
            chrono_tz::GMT
        );
    }

    #[test]
    fn persist_writes_last_used_dates() {
        let store = InMemorySessionStore::new();
        let range = DateRangeResolver::resolve("2024/01/05", "2024/01/07", chrono_tz::US::Pacific, no_lookup, now());
        DateRangeResolver::persist(&range, &store, "demo/");
        assert_eq!(store.get_attribute("demo/", ARG_DATE_FROM).as_deref(), Some("2024/01/05/00:00:00"));
        assert_eq!(store.get_attribute("demo/", ARG_DATE_TO).as_deref(), Some("2024/01/07/23:59:59"));
        assert_eq!(store.get_attribute("demo/", ARG_TIME_ZONE).as_deref(), Some("US/Pacific"));
    }
}
