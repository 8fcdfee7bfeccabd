//! Weekday membership predicate.

use crate::convert::int_entries;
use avail_core::moment::LocalMoment;
use avail_core::predicate::{Predicate, PredicateError};
use avail_core::subject::Subject;
use chrono::Datelike;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Matches when the moment's ISO weekday (1 = Monday .. 7 = Sunday) is in
/// `config.days`. Entries outside `1..=7` and non-numeric entries are
/// dropped; an empty effective set never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekdaysEvaluator;

impl Predicate for WeekdaysEvaluator {
    fn matches(
        &self,
        config: &Map<String, Value>,
        moment: &LocalMoment,
        _subject: &dyn Subject,
    ) -> Result<bool, PredicateError> {
        let days: HashSet<i64> =
            int_entries(config, "days").into_iter().filter(|d| (1..=7).contains(d)).collect();
        if days.is_empty() {
            return Ok(false);
        }
        let weekday = i64::from(moment.weekday().number_from_monday());
        Ok(days.contains(&weekday))
    }
}
