//! Month-of-year membership predicate.

use crate::convert::int_entries;
use avail_core::moment::LocalMoment;
use avail_core::predicate::{Predicate, PredicateError};
use avail_core::subject::Subject;
use chrono::Datelike;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Matches when the moment's month (1 = January .. 12 = December) is in
/// `config.months`. Non-numeric entries are dropped; out-of-range entries
/// are kept but can never equal a real month, so they simply never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthsOfYearEvaluator;

impl Predicate for MonthsOfYearEvaluator {
    fn matches(
        &self,
        config: &Map<String, Value>,
        moment: &LocalMoment,
        _subject: &dyn Subject,
    ) -> Result<bool, PredicateError> {
        let months: HashSet<i64> = int_entries(config, "months").into_iter().collect();
        if months.is_empty() {
            return Ok(false);
        }
        Ok(months.contains(&i64::from(moment.month())))
    }
}
