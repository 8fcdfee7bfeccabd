//! Absolute and yearly date-range predicate.

use avail_core::moment::LocalMoment;
use avail_core::predicate::{Predicate, PredicateError};
use avail_core::subject::Subject;
use chrono::{Datelike, NaiveDate};
use serde_json::{Map, Value};

/// Matches when the moment's local calendar date lies inside the range
/// described by `config.from` / `config.to`.
///
/// `config.kind` selects the flavor: `absolute` (default for anything
/// else) compares full `YYYY-MM-DD` dates inclusively, reordering swapped
/// bounds; `yearly` compares `MM-DD` boundaries year-independently and
/// wraps across the year end when `from` is after `to`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRangeEvaluator;

fn month_day_key(raw: &str) -> Option<u32> {
    let (m, d) = raw.split_once('-')?;
    let month: u32 = m.parse().ok()?;
    let day: u32 = d.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(month * 100 + day)
}

fn date_field(config: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    config
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

impl Predicate for DateRangeEvaluator {
    fn matches(
        &self,
        config: &Map<String, Value>,
        moment: &LocalMoment,
        _subject: &dyn Subject,
    ) -> Result<bool, PredicateError> {
        let yearly = config.get("kind").and_then(Value::as_str) == Some("yearly");
        if yearly {
            let Some(from) = config.get("from").and_then(Value::as_str).and_then(month_day_key)
            else {
                return Ok(false);
            };
            let Some(to) = config.get("to").and_then(Value::as_str).and_then(month_day_key)
            else {
                return Ok(false);
            };
            let key = moment.month() * 100 + moment.day();
            let inside =
                if from <= to { from <= key && key <= to } else { key >= from || key <= to };
            return Ok(inside);
        }

        let (Some(mut from), Some(mut to)) = (date_field(config, "from"), date_field(config, "to"))
        else {
            return Ok(false);
        };
        if from > to {
            std::mem::swap(&mut from, &mut to);
        }
        let date = moment.date_naive();
        Ok(from <= date && date <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{utc, TestSubject};
    use serde_json::json;

    fn eval(config: serde_json::Value, moment: &LocalMoment) -> bool {
        let config = serde_json::from_value(config).unwrap();
        DateRangeEvaluator.matches(&config, moment, &TestSubject::default()).unwrap()
    }

    #[test]
    fn absolute_range_inclusive_whole_days() {
        let config = json!({"kind": "absolute", "from": "2025-06-01", "to": "2025-06-30"});
        assert!(eval(config.clone(), &utc(2025, 6, 1, 0, 0, 0)));
        assert!(eval(config.clone(), &utc(2025, 6, 30, 23, 59, 59)));
        assert!(!eval(config.clone(), &utc(2025, 5, 31, 23, 59, 59)));
        assert!(!eval(config, &utc(2025, 7, 1, 0, 0, 0)));
    }

    #[test]
    fn absolute_swaps_reversed_bounds() {
        let config = json!({"from": "2025-06-30", "to": "2025-06-01"});
        assert!(eval(config, &utc(2025, 6, 15, 12, 0, 0)));
    }

    #[test]
    fn unknown_kind_defaults_to_absolute() {
        let config = json!({"kind": 7, "from": "2025-06-01", "to": "2025-06-30"});
        assert!(eval(config, &utc(2025, 6, 15, 12, 0, 0)));
    }

    #[test]
    fn yearly_range_ignores_year() {
        let config = json!({"kind": "yearly", "from": "06-01", "to": "08-31"});
        assert!(eval(config.clone(), &utc(1999, 7, 4, 12, 0, 0)));
        assert!(eval(config.clone(), &utc(2042, 7, 4, 12, 0, 0)));
        assert!(!eval(config, &utc(2025, 9, 1, 0, 0, 0)));
    }

    #[test]
    fn yearly_range_wraps_year_end() {
        let config = json!({"kind": "yearly", "from": "11-01", "to": "02-28"});
        assert!(eval(config.clone(), &utc(2024, 12, 15, 12, 0, 0)));
        assert!(eval(config.clone(), &utc(2025, 1, 15, 12, 0, 0)));
        assert!(!eval(config, &utc(2025, 3, 1, 0, 0, 0)));
    }

    #[test]
    fn unparseable_bounds_never_match() {
        for config in [
            json!({}),
            json!({"from": "2025-06-01"}),
            json!({"from": "junk", "to": "2025-06-30"}),
            json!({"kind": "yearly", "from": "13-01", "to": "02-28"}),
            json!({"kind": "yearly", "from": "11-01", "to": "2025-02-28"}),
        ] {
            assert!(!eval(config, &utc(2025, 6, 15, 12, 0, 0)));
        }
    }
}
