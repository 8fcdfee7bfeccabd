//! Temporal and inventory predicate evaluators.
//!
//! Each evaluator implements [`avail_core::predicate::Predicate`]: a function
//! from `(config, moment, subject)` to `bool`, where `moment` is already
//! displayed in the subject's zone. Six evaluators are pure; the inventory
//! gate is the single predicate allowed to consult external state, through
//! the resolver adapter in [`inventory`].
//!
//! Evaluators are total with respect to malformed configuration: missing
//! keys, wrong types, unparseable strings, and out-of-range numbers yield
//! `false` rather than an error, so a broken rule can never flip an effect
//! or break the evaluation pipeline.

#![deny(unsafe_code)]

mod blackout;
mod convert;
mod date_range;
pub mod inventory;
mod months;
mod rrule;
mod time_of_day;
mod weekdays;

pub use blackout::BlackoutDateEvaluator;
pub use date_range::DateRangeEvaluator;
pub use inventory::{
    InventoryGateEvaluator, InventoryResolvers, ResolverCatalog, ResolverDef, ResolverFn,
};
pub use months::MonthsOfYearEvaluator;
pub use rrule::RRuleEvaluator;
pub use time_of_day::TimeOfDayEvaluator;
pub use weekdays::WeekdaysEvaluator;

#[cfg(test)]
pub(crate) mod testutil {
    use avail_core::effect::Effect;
    use avail_core::moment::LocalMoment;
    use avail_core::rule::Rule;
    use avail_core::subject::Subject;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    pub struct TestSubject {
        pub kind: String,
    }

    impl Default for TestSubject {
        fn default() -> Self {
            Self { kind: "test".to_string() }
        }
    }

    impl Subject for TestSubject {
        fn subject_type(&self) -> &str {
            &self.kind
        }

        fn availability_rules(&self) -> Vec<Rule> {
            Vec::new()
        }

        fn default_effect(&self) -> Option<Effect> {
            Some(Effect::Deny)
        }
    }

    pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> LocalMoment {
        chrono_tz::UTC.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    pub fn in_zone(zone: Tz, y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> LocalMoment {
        zone.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }
}
