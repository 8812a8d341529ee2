//! Date/time arguments as they appear in report URLs.
//!
//! Accepted forms:
//! - `YYYY-MM-DDThh:mm:ssZ`
//! - `YYYY/MM[/DD[/hh[:mm[:ss]]]][,ZONE]`
//! - `YYYY/MM/DD,hh[:mm[:ss]][,ZONE]`
//! - `EEEEEEEEEE[,ZONE]` (epoch seconds)
//! - `-Nd[,hh[:mm[:ss]]][,ZONE]` / `+Nd...` (days relative to today)
//! - `-N` / `+N` (seconds relative to now, date part only)
//!
//! Groups are separated by `,`, space or `|`.

use chrono::{DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultTime {
    DayStart,
    DayEnd,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateParseError {
    #[error("date argument is blank")]
    Blank,
    #[error("invalid number of date/time groups: {0}")]
    GroupCount(String),
    #[error("invalid time zone in: {0}")]
    TimeZone(String),
    #[error("invalid delta time: {0}")]
    Delta(String),
    #[error("invalid date fields: {0}")]
    Fields(String),
    #[error("date out of range: {0}")]
    Range(String),
}

/// Parses an IANA zone id, `None` when unknown.
pub fn parse_time_zone(id: &str) -> Option<Tz> {
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    id.parse::<Tz>().ok()
}

pub fn time_zone_or_gmt(id: &str) -> Tz {
    parse_time_zone(id).unwrap_or(chrono_tz::GMT)
}

pub fn day_start(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    to_zoned(tz, date.and_time(chrono::NaiveTime::MIN), false)
}

pub fn day_end(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    let end = date.and_hms_opt(23, 59, 59).unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
    to_zoned(tz, end, true)
}

pub fn current_day_start(tz: Tz, now: DateTime<Utc>) -> DateTime<Tz> {
    day_start(now.with_timezone(&tz).date_naive(), tz)
}

pub fn current_day_end(tz: Tz, now: DateTime<Utc>) -> DateTime<Tz> {
    day_end(now.with_timezone(&tz).date_naive(), tz)
}

/// `YYYY/MM/DD/hh:mm:ss`, the form stored in the session.
pub fn format_arg_date_time(dt: &DateTime<Tz>) -> String {
    dt.format("%Y/%m/%d/%H:%M:%S").to_string()
}

/// `±Nd,HH:MM[:SS]`: days between `now` and `dt` (both in `dt`'s zone) plus time of day.
pub fn format_day_offset(dt: &DateTime<Tz>, now: DateTime<Utc>, with_seconds: bool) -> String {
    let today = now.with_timezone(&dt.timezone()).date_naive();
    let delta = dt.date_naive().signed_duration_since(today).num_days();
    let sign = if delta >= 0 { "+" } else { "" };
    let time = if with_seconds {
        dt.format("%H:%M:%S")
    } else {
        dt.format("%H:%M")
    };
    format!("{}{}d,{}", sign, delta, time)
}

/// Resolves a local wall-clock time; DST gaps move forward, folds pick the earlier (or later) instant.
fn to_zoned(tz: Tz, local: NaiveDateTime, prefer_latest: bool) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(a, b) => {
            if prefer_latest {
                a.max(b)
            } else {
                a.min(b)
            }
        }
        LocalResult::None => local
            .checked_add_signed(TimeDelta::hours(1))
            .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
            .unwrap_or_else(|| tz.from_utc_datetime(&local)),
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    (28..=31)
        .rev()
        .find(|d| NaiveDate::from_ymd_opt(year, month, *d).is_some())
        .unwrap_or(28)
}

fn parse_int(s: &str, whole: &str) -> Result<i64, DateParseError> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| DateParseError::Fields(whole.to_string()))
}

fn split_fields(s: &str) -> Vec<&str> {
    s.split(|c| c == '/' || c == ':' || c == '-')
        .filter(|f| !f.is_empty())
        .collect()
}

/// `±N[d]` relative to `now` in `tz`, reduced to `[year, month, day]`.
fn delta_date(group: &str, tz: Tz, now: DateTime<Utc>, require_days: bool, whole: &str) -> Result<Vec<i64>, DateParseError> {
    let lower = group.to_ascii_lowercase();
    let (num, is_days) = match lower.strip_suffix('d') {
        Some(n) => (n, true),
        None => (lower.as_str(), false),
    };
    if require_days && !is_days {
        return Err(DateParseError::Delta(whole.to_string()));
    }
    let delta: i64 = num
        .parse()
        .map_err(|_| DateParseError::Delta(whole.to_string()))?;

    let now_tz = now.with_timezone(&tz);
    let date = if is_days {
        TimeDelta::try_days(delta).and_then(|d| now_tz.date_naive().checked_add_signed(d))
    } else {
        TimeDelta::try_seconds(delta)
            .and_then(|d| now_tz.checked_add_signed(d))
            .map(|dt| dt.date_naive())
    }
    .ok_or_else(|| DateParseError::Range(whole.to_string()))?;

    Ok(vec![date.year() as i64, date.month() as i64, date.day() as i64])
}

/// Parses a date argument. Missing fields default per `dft` (day start or day end).
pub fn parse_arg_date(
    input: &str,
    default_tz: Tz,
    dft: DefaultTime,
    now: DateTime<Utc>,
) -> Result<DateTime<Tz>, DateParseError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DateParseError::Blank);
    }

    let mut groups: Vec<&str> = s
        .split(|c| c == ',' || c == ' ' || c == '|')
        .filter(|g| !g.is_empty())
        .collect();
    if groups.len() == 1 && s.len() == 20 && s.as_bytes()[10] == b'T' {
        groups = vec![&s[..10], &s[11..]];
    }
    if groups.is_empty() || groups.len() > 3 {
        return Err(DateParseError::GroupCount(s.to_string()));
    }

    let mut tz = default_tz;
    let mut grp_len = groups.len();
    let last = groups[grp_len - 1];
    if last.chars().next().is_some_and(|c| c.is_alphabetic()) {
        tz = parse_time_zone(last).ok_or_else(|| DateParseError::TimeZone(s.to_string()))?;
        grp_len -= 1;
    } else if groups.len() == 2 && last.ends_with('Z') {
        tz = chrono_tz::GMT;
        groups[1] = &last[..last.len() - 1];
    }
    if grp_len == 0 {
        return Err(DateParseError::GroupCount(s.to_string()));
    }

    let first = groups[0];
    let is_delta = first.starts_with('+') || first.starts_with('-');
    let fields: Vec<i64> = match grp_len {
        1 if is_delta => delta_date(first, tz, now, false, s)?,
        1 => {
            let d = split_fields(first);
            if d.is_empty() || d.len() > 6 {
                return Err(DateParseError::Fields(s.to_string()));
            }
            if d.len() == 1 {
                let epoch = parse_int(d[0], s)?;
                return tz
                    .timestamp_opt(epoch, 0)
                    .single()
                    .ok_or_else(|| DateParseError::Range(s.to_string()));
            }
            d.iter().map(|f| parse_int(f, s)).collect::<Result<_, _>>()?
        }
        2 => {
            let mut date = if is_delta {
                delta_date(first, tz, now, true, s)?
            } else {
                let d = split_fields(first);
                if d.len() != 3 {
                    return Err(DateParseError::Fields(s.to_string()));
                }
                d.iter().map(|f| parse_int(f, s)).collect::<Result<Vec<_>, _>>()?
            };
            let t = split_fields(groups[1]);
            if t.is_empty() || t.len() > 3 {
                return Err(DateParseError::Fields(s.to_string()));
            }
            for f in t {
                date.push(parse_int(f, s)?);
            }
            date
        }
        _ => return Err(DateParseError::GroupCount(s.to_string())),
    };

    let year = i32::try_from(fields[0]).map_err(|_| DateParseError::Range(s.to_string()))?;
    let month = u32::try_from(fields[1])
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| DateParseError::Range(s.to_string()))?;
    let max_day = days_in_month(year, month) as i64;

    let (mut hh, mut mm, mut ss) = match dft {
        DefaultTime::DayStart => (0, 0, 0),
        DefaultTime::DayEnd => (23, 59, 59),
    };
    let day = if fields.len() >= 3 {
        if let Some(v) = fields.get(3) {
            hh = *v;
        }
        if let Some(v) = fields.get(4) {
            mm = *v;
        }
        if let Some(v) = fields.get(5) {
            ss = *v;
        }
        fields[2].clamp(1, max_day)
    } else if dft == DefaultTime::DayEnd {
        max_day
    } else {
        1
    };

    let date = NaiveDate::from_ymd_opt(year, month, day as u32)
        .ok_or_else(|| DateParseError::Range(s.to_string()))?;
    let time = chrono::NaiveTime::from_hms_opt(
        u32::try_from(hh).unwrap_or(u32::MAX),
        u32::try_from(mm).unwrap_or(u32::MAX),
        u32::try_from(ss).unwrap_or(u32::MAX),
    )
    .ok_or_else(|| DateParseError::Range(s.to_string()))?;

    Ok(to_zoned(tz, date.and_time(time), dft == DefaultTime::DayEnd))
}

/// Seconds since midnight, used by tests and the schedule log line.
pub fn seconds_of_day(dt: &DateTime<Tz>) -> u32 {
    dt.num_seconds_from_midnight()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()
    }

    fn gmt(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> DateTime<Tz> {
        chrono_tz::GMT.with_ymd_and_hms(y, m, d, hh, mm, ss).unwrap()
    }

    #[test]
    fn absolute_dates_use_defaults_for_missing_fields() {
        let tz = chrono_tz::GMT;
        assert_eq!(
            parse_arg_date("2024/02", tz, DefaultTime::DayEnd, now()).unwrap(),
            gmt(2024, 2, 29, 23, 59, 59)
        );
        assert_eq!(
            parse_arg_date("2024/02", tz, DefaultTime::DayStart, now()).unwrap(),
            gmt(2024, 2, 1, 0, 0, 0)
        );
        assert_eq!(
            parse_arg_date("2024/04/31/08:15", tz, DefaultTime::DayStart, now()).unwrap(),
            gmt(2024, 4, 30, 8, 15, 0)
        );
        assert_eq!(
            parse_arg_date("2024/01/05,12:57:32", tz, DefaultTime::DayEnd, now()).unwrap(),
            gmt(2024, 1, 5, 12, 57, 32)
        );
    }

    #[test]
    fn relative_days_and_epoch() {
        let tz = chrono_tz::GMT;
        assert_eq!(
            parse_arg_date("-3d,06:00", tz, DefaultTime::DayStart, now()).unwrap(),
            gmt(2024, 3, 12, 6, 0, 0)
        );
        assert_eq!(
            parse_arg_date("+0d", tz, DefaultTime::DayEnd, now()).unwrap(),
            gmt(2024, 3, 15, 23, 59, 59)
        );
        assert_eq!(
            parse_arg_date("1700000000", tz, DefaultTime::DayStart, now())
                .unwrap()
                .timestamp(),
            1_700_000_000
        );
        assert!(matches!(
            parse_arg_date("-3,06:00", tz, DefaultTime::DayStart, now()),
            Err(DateParseError::Delta(_))
        ));
    }

    #[test]
    fn zone_suffix_and_gpx_form() {
        let dt = parse_arg_date("2024/07/04,12:00,America/Los_Angeles", chrono_tz::GMT, DefaultTime::DayStart, now()).unwrap();
        assert_eq!(dt.timezone(), chrono_tz::America::Los_Angeles);
        assert_eq!(dt.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 7, 4, 19, 0, 0).unwrap());

        let gpx = parse_arg_date("2024-07-04T12:30:00Z", chrono_tz::Europe::Paris, DefaultTime::DayStart, now()).unwrap();
        assert_eq!(gpx.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 7, 4, 12, 30, 0).unwrap());
    }

    #[test]
    fn malformed_input_is_an_error() {
        let tz = chrono_tz::GMT;
        for bad in ["", "yesterday", "2024/13/01", "2024/01/01,25:00", "1/2/3/4/5/6/7", "a,b,c,d"] {
            assert!(parse_arg_date(bad, tz, DefaultTime::DayStart, now()).is_err(), "{bad}");
        }
    }

    #[test]
    fn out_of_range_values_are_errors() {
        let tz = chrono_tz::GMT;
        for bad in [
            "+999999999999999d",
            "+99999999999d",
            "-9223372036854775807",
            "9223372036854775807",
            "2147483647/12/01",
            "-999999999999999d,08:00",
        ] {
            assert!(
                matches!(
                    parse_arg_date(bad, tz, DefaultTime::DayStart, now()),
                    Err(DateParseError::Range(_)) | Err(DateParseError::Delta(_))
                ),
                "{bad}"
            );
        }
        // last representable day, pushed across a zone offset
        let _ = parse_arg_date("262143/12/31", chrono_tz::US::Pacific, DefaultTime::DayEnd, now());
    }

    #[test]
    fn day_offsets_are_signed() {
        let from = gmt(2024, 3, 12, 0, 0, 0);
        let to = gmt(2024, 3, 16, 23, 59, 59);
        assert_eq!(format_day_offset(&from, now(), false), "-3d,00:00");
        assert_eq!(format_day_offset(&to, now(), true), "+1d,23:59:59");
        assert_eq!(format_day_offset(&gmt(2024, 3, 15, 8, 5, 0), now(), true), "+0d,08:05:00");
    }

    #[test]
    fn invalid_zone_falls_back_to_gmt() {
        assert_eq!(time_zone_or_gmt("Mars/Olympus"), chrono_tz::GMT);
        assert_eq!(time_zone_or_gmt("US/Pacific"), chrono_tz::US::Pacific);
        assert_eq!(seconds_of_day(&day_end(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), chrono_tz::GMT)), 86_399);
    }
}
