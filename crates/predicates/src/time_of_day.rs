//! Time-of-day window predicate.

use avail_core::moment::LocalMoment;
use avail_core::predicate::{Predicate, PredicateError};
use avail_core::subject::Subject;
use chrono::Timelike;
use serde_json::{Map, Value};

/// Matches when the moment's second-of-day falls inside the window
/// `config.from ..= config.to` (24-hour `HH:MM` or `HH:MM:SS`).
///
/// Equal boundaries cover the whole day. A `from` later than `to` wraps
/// overnight; both endpoints stay inclusive, so `22:00 -> 06:00` matches
/// `06:00:00` exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeOfDayEvaluator;

fn parse_second_of_day(raw: &str) -> Option<u32> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return None;
    }
    let hour: u32 = parts[0].parse().ok()?;
    let minute: u32 = parts[1].parse().ok()?;
    let second: u32 = if parts.len() == 3 { parts[2].parse().ok()? } else { 0 };
    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    Some(hour * 3600 + minute * 60 + second)
}

impl Predicate for TimeOfDayEvaluator {
    fn matches(
        &self,
        config: &Map<String, Value>,
        moment: &LocalMoment,
        _subject: &dyn Subject,
    ) -> Result<bool, PredicateError> {
        let Some(from) = config.get("from").and_then(Value::as_str).and_then(parse_second_of_day)
        else {
            return Ok(false);
        };
        let Some(to) = config.get("to").and_then(Value::as_str).and_then(parse_second_of_day)
        else {
            return Ok(false);
        };
        let s = moment.num_seconds_from_midnight();
        let inside = if from == to {
            true
        } else if from < to {
            from <= s && s <= to
        } else {
            s >= from || s <= to
        };
        Ok(inside)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{utc, TestSubject};
    use serde_json::json;

    fn at(h: u32, m: u32, s: u32) -> LocalMoment {
        utc(2025, 6, 4, h, m, s)
    }

    fn eval(config: serde_json::Value, moment: &LocalMoment) -> bool {
        let config = serde_json::from_value(config).unwrap();
        TimeOfDayEvaluator.matches(&config, moment, &TestSubject::default()).unwrap()
    }

    #[test]
    fn forward_window_inclusive_both_ends() {
        let config = json!({"from": "09:00", "to": "17:00"});
        assert!(eval(config.clone(), &at(9, 0, 0)));
        assert!(eval(config.clone(), &at(13, 0, 0)));
        assert!(eval(config.clone(), &at(17, 0, 0)));
        assert!(!eval(config.clone(), &at(8, 59, 59)));
        assert!(!eval(config, &at(17, 0, 1)));
    }

    #[test]
    fn overnight_window_wraps() {
        let config = json!({"from": "22:00", "to": "06:00"});
        assert!(eval(config.clone(), &at(23, 30, 0)));
        assert!(eval(config.clone(), &at(5, 30, 0)));
        assert!(eval(config.clone(), &at(6, 0, 0)));
        assert!(eval(config.clone(), &at(22, 0, 0)));
        assert!(!eval(config.clone(), &at(14, 0, 0)));
        assert!(!eval(config, &at(6, 0, 1)));
    }

    #[test]
    fn equal_boundaries_cover_the_day() {
        let config = json!({"from": "12:00", "to": "12:00"});
        assert!(eval(config.clone(), &at(0, 0, 0)));
        assert!(eval(config.clone(), &at(12, 0, 0)));
        assert!(eval(config, &at(23, 59, 59)));
    }

    #[test]
    fn seconds_precision_accepted() {
        let config = json!({"from": "09:00:30", "to": "09:00:45"});
        assert!(eval(config.clone(), &at(9, 0, 30)));
        assert!(eval(config.clone(), &at(9, 0, 45)));
        assert!(!eval(config, &at(9, 0, 29)));
    }

    #[test]
    fn invalid_boundaries_never_match() {
        for config in [
            json!({}),
            json!({"from": "09:00"}),
            json!({"from": "24:00", "to": "10:00"}),
            json!({"from": "09:60", "to": "10:00"}),
            json!({"from": "09:00:60", "to": "10:00"}),
            json!({"from": "nine", "to": "ten"}),
            json!({"from": 900, "to": 1700}),
        ] {
            assert!(!eval(config, &at(9, 30, 0)));
        }
    }
}
