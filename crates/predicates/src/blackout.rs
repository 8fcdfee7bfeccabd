//! Blackout-date predicate.

use avail_core::moment::LocalMoment;
use avail_core::predicate::{Predicate, PredicateError};
use avail_core::subject::Subject;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Matches when the moment's local calendar date equals one of the
/// `YYYY-MM-DD` entries in `config.dates`. Time of day is ignored.
/// Non-strings, empty strings, and unparseable entries are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackoutDateEvaluator;

impl Predicate for BlackoutDateEvaluator {
    fn matches(
        &self,
        config: &Map<String, Value>,
        moment: &LocalMoment,
        _subject: &dyn Subject,
    ) -> Result<bool, PredicateError> {
        let dates: HashSet<NaiveDate> = config
            .get("dates")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .filter_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(dates.contains(&moment.date_naive()))
    }
}
