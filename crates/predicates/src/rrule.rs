//! Recurrence predicate implementing a pragmatic RFC-5545 subset.
//!
//! `config.rrule` holds a semicolon-delimited `KEY=VALUE` list. Supported
//! keys: `FREQ` (required), `INTERVAL`, `DTSTART`, `UNTIL`, `BYMONTH`,
//! `BYMONTHDAY`, `BYDAY`, `BYHOUR`, `BYMINUTE`, `BYSECOND`. `BYWEEKNO` and
//! `BYYEARDAY` are recognized but not enforced. Unknown keys are ignored;
//! malformed pairs are skipped. `config.tz` re-displays the moment in
//! another zone for this predicate only.

use avail_core::moment::{parse_zone, LocalMoment};
use avail_core::predicate::{Predicate, PredicateError};
use avail_core::subject::Subject;
use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
    Weekday,
};
use chrono_tz::Tz;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Matches when the moment lands on an occurrence of the recurrence rule
/// in `config.rrule`. Any malformed or unsupported input yields `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RRuleEvaluator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freq {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Predicate for RRuleEvaluator {
    fn matches(
        &self,
        config: &Map<String, Value>,
        moment: &LocalMoment,
        _subject: &dyn Subject,
    ) -> Result<bool, PredicateError> {
        let Some(rrule) = config.get("rrule").and_then(Value::as_str) else {
            return Ok(false);
        };
        let local = match config.get("tz") {
            None | Some(Value::Null) => *moment,
            Some(Value::String(name)) => match parse_zone(name) {
                Some(zone) => moment.with_timezone(&zone),
                None => return Ok(false),
            },
            Some(_) => return Ok(false),
        };
        Ok(occurs_at(rrule, &local))
    }
}

/// Split the rule into upper-cased `KEY -> VALUE` pairs. Pairs without `=`
/// or with an empty key are skipped; a repeated key keeps the last value.
fn split_pairs(rrule: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    for part in rrule.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_uppercase();
        if key.is_empty() {
            continue;
        }
        pairs.insert(key, value.trim().to_string());
    }
    pairs
}

fn parse_freq(raw: &str) -> Option<Freq> {
    match raw.to_ascii_uppercase().as_str() {
        "DAILY" => Some(Freq::Daily),
        "WEEKLY" => Some(Freq::Weekly),
        "MONTHLY" => Some(Freq::Monthly),
        "YEARLY" => Some(Freq::Yearly),
        _ => None,
    }
}

fn parse_weekday(code: &str) -> Option<Weekday> {
    match code {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

/// `[±N]WEEKDAY`, e.g. `MO`, `2MO`, `-1FR`.
fn parse_byday_item(raw: &str) -> Option<(Option<i32>, Weekday)> {
    let item = raw.trim().to_ascii_uppercase();
    if !item.is_ascii() || item.len() < 2 {
        return None;
    }
    let (ordinal_part, code) = item.split_at(item.len() - 2);
    let weekday = parse_weekday(code)?;
    if ordinal_part.is_empty() {
        return Some((None, weekday));
    }
    let ordinal: i32 = ordinal_part.parse().ok()?;
    if ordinal == 0 {
        return None;
    }
    Some((Some(ordinal), weekday))
}

fn int_list<T: std::str::FromStr + Copy>(raw: &str, keep: impl Fn(T) -> bool) -> Vec<T> {
    raw.split(',').filter_map(|p| p.trim().parse::<T>().ok()).filter(|v| keep(*v)).collect()
}

/// Try the supported date-time layouts in order, most specific first, then
/// a short permissive tail. Bare dates resolve to local start of day.
fn parse_datetime(raw: &str, zone: Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    let local = |naive: NaiveDateTime| zone.from_local_datetime(&naive).earliest();
    let day_start = |date: NaiveDate| local(date.and_time(NaiveTime::MIN));

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%SZ") {
        return Some(Utc.from_utc_datetime(&naive).with_timezone(&zone));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S") {
        return local(naive);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y%m%d") {
        return day_start(date);
    }
    if let Ok(fixed) = DateTime::parse_from_rfc3339(raw) {
        return Some(fixed.with_timezone(&zone));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return local(naive);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return day_start(date);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return local(naive);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y/%m/%d") {
        return day_start(date);
    }
    None
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}

fn days_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 31).map_or(365, |d| d.ordinal())
}

/// Monday of the ISO week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn interval_aligned(freq: Freq, start: &DateTime<Tz>, moment: &LocalMoment, interval: i64) -> bool {
    match freq {
        Freq::Daily => {
            let days = (moment.date_naive() - start.date_naive()).num_days();
            days % interval == 0
        }
        Freq::Weekly => {
            let weeks =
                (week_start(moment.date_naive()) - week_start(start.date_naive())).num_days() / 7;
            weeks % interval == 0
        }
        Freq::Monthly => {
            let months = (i64::from(moment.year()) * 12 + i64::from(moment.month()))
                - (i64::from(start.year()) * 12 + i64::from(start.month()));
            months % interval == 0
        }
        Freq::Yearly => {
            let years = i64::from(moment.year()) - i64::from(start.year());
            years % interval == 0
        }
    }
}

/// Ordinal of this weekday occurrence within its month, counted from the
/// start (`2` = second) or, for a negative wanted ordinal, from the end.
fn month_ordinal_matches(wanted: i32, moment: &LocalMoment) -> bool {
    if wanted > 0 {
        let nth = (moment.day() - 1) / 7 + 1;
        nth == wanted as u32
    } else {
        let from_end = (days_in_month(moment.year(), moment.month()) - moment.day()) / 7 + 1;
        from_end == wanted.unsigned_abs()
    }
}

fn year_ordinal_matches(wanted: i32, moment: &LocalMoment) -> bool {
    if wanted > 0 {
        let nth = (moment.ordinal() - 1) / 7 + 1;
        nth == wanted as u32
    } else {
        let from_end = (days_in_year(moment.year()) - moment.ordinal()) / 7 + 1;
        from_end == wanted.unsigned_abs()
    }
}

#[allow(clippy::too_many_lines)]
fn occurs_at(rrule: &str, moment: &LocalMoment) -> bool {
    let pairs = split_pairs(rrule);
    let zone = moment.timezone();

    let Some(freq) = pairs.get("FREQ").and_then(|raw| parse_freq(raw)) else {
        return false;
    };
    let interval = match pairs.get("INTERVAL") {
        None => 1,
        Some(raw) => match raw.parse::<i64>() {
            Ok(i) if i >= 1 => i,
            _ => return false,
        },
    };
    let until = match pairs.get("UNTIL") {
        None => None,
        Some(raw) => match parse_datetime(raw, zone) {
            Some(dt) => Some(dt),
            None => return false,
        },
    };
    let dtstart = match pairs.get("DTSTART") {
        None => None,
        Some(raw) => match parse_datetime(raw, zone) {
            Some(dt) => Some(dt),
            None => return false,
        },
    };

    // A present BY* key whose entries all fail validation is an impossible
    // constraint, not an absent one.
    let by_month = match pairs.get("BYMONTH") {
        None => None,
        Some(raw) => {
            let list = int_list::<u32>(raw, |m| (1..=12).contains(&m));
            if list.is_empty() {
                return false;
            }
            Some(list)
        }
    };
    let by_month_day = match pairs.get("BYMONTHDAY") {
        None => None,
        Some(raw) => {
            let list = int_list::<i32>(raw, |d| d != 0 && (-31..=31).contains(&d));
            if list.is_empty() {
                return false;
            }
            Some(list)
        }
    };
    let by_day = match pairs.get("BYDAY") {
        None => None,
        Some(raw) => {
            let list: Vec<(Option<i32>, Weekday)> =
                raw.split(',').filter_map(parse_byday_item).collect();
            if list.is_empty() {
                return false;
            }
            Some(list)
        }
    };
    let by_hour = match pairs.get("BYHOUR") {
        None => None,
        Some(raw) => {
            let list = int_list::<u32>(raw, |h| h <= 23);
            if list.is_empty() {
                return false;
            }
            Some(list)
        }
    };
    let by_minute = match pairs.get("BYMINUTE") {
        None => None,
        Some(raw) => {
            let list = int_list::<u32>(raw, |m| m <= 59);
            if list.is_empty() {
                return false;
            }
            Some(list)
        }
    };
    let by_second = match pairs.get("BYSECOND") {
        None => None,
        Some(raw) => {
            let list = int_list::<u32>(raw, |s| s <= 59);
            if list.is_empty() {
                return false;
            }
            Some(list)
        }
    };
    let has_by_week_no = pairs.contains_key("BYWEEKNO");
    let has_by_year_day = pairs.contains_key("BYYEARDAY");

    // DTSTART anchors interval math and the monthly/yearly closing check.
    let needs_dtstart = interval > 1
        || (freq == Freq::Monthly && by_month_day.is_none() && by_day.is_none())
        || (freq == Freq::Yearly
            && by_month.is_none()
            && !has_by_week_no
            && !has_by_year_day
            && by_day.is_none());
    if needs_dtstart && dtstart.is_none() {
        return false;
    }

    // 1) Inclusive upper bound.
    if let Some(until) = until {
        if *moment > until {
            return false;
        }
    }

    // 2) Interval alignment from the anchor.
    if interval > 1 {
        let Some(start) = dtstart.as_ref() else {
            return false;
        };
        if *moment < *start || !interval_aligned(freq, start, moment, interval) {
            return false;
        }
    }

    // 3..6) BY* constraints.
    if let Some(months) = &by_month {
        if !months.contains(&moment.month()) {
            return false;
        }
    }
    if let Some(month_days) = &by_month_day {
        let day = moment.day() as i32;
        let last = days_in_month(moment.year(), moment.month()) as i32;
        let hit = month_days.iter().any(|&d| if d > 0 { day == d } else { day == last + d + 1 });
        if !hit {
            return false;
        }
    }
    if let Some(day_specs) = &by_day {
        let hit = day_specs.iter().any(|&(ordinal, weekday)| {
            if weekday != moment.weekday() {
                return false;
            }
            match (ordinal, freq) {
                (Some(n), Freq::Monthly) => month_ordinal_matches(n, moment),
                (Some(n), Freq::Yearly) => year_ordinal_matches(n, moment),
                // DAILY/WEEKLY ignore the ordinal.
                _ => true,
            }
        });
        if !hit {
            return false;
        }
    }
    if let Some(hours) = &by_hour {
        if !hours.contains(&moment.hour()) {
            return false;
        }
    }
    if let Some(minutes) = &by_minute {
        if !minutes.contains(&moment.minute()) {
            return false;
        }
    }
    if let Some(seconds) = &by_second {
        if !seconds.contains(&moment.second()) {
            return false;
        }
    }

    // 7) Frequency-specific closing check.
    match freq {
        Freq::Daily | Freq::Weekly => true,
        Freq::Monthly => {
            if by_month_day.is_some() || by_day.is_some() {
                true
            } else {
                dtstart.as_ref().is_some_and(|s| moment.day() == s.day())
            }
        }
        Freq::Yearly => {
            if by_month.is_some() || has_by_week_no || has_by_year_day || by_day.is_some() {
                true
            } else {
                dtstart
                    .as_ref()
                    .is_some_and(|s| moment.month() == s.month() && moment.day() == s.day())
            }
        }
    }
}
