use avail_core::effect::Effect;
use avail_core::rule::Rule;
use avail_core::subject::Subject;
use chrono::TimeZone;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engine::Engine;
use serde_json::json;

struct Venue {
    rules: Vec<Rule>,
}

impl Subject for Venue {
    fn subject_type(&self) -> &str {
        "venue"
    }

    fn availability_rules(&self) -> Vec<Rule> {
        self.rules.clone()
    }

    fn default_effect(&self) -> Option<Effect> {
        Some(Effect::Deny)
    }

    fn timezone(&self) -> Option<String> {
        Some("America/New_York".to_string())
    }
}

fn bench_is_available(c: &mut Criterion) {
    let engine = Engine::default();
    let venue = Venue {
        rules: vec![
            Rule::new("time_of_day", Effect::Allow)
                .with_config(json!({"from": "09:00", "to": "17:00"}))
                .with_priority(10),
            Rule::new("weekdays", Effect::Deny)
                .with_config(json!({"days": [6, 7]}))
                .with_priority(20),
            Rule::new("rrule", Effect::Deny)
                .with_config(json!({"rrule": "FREQ=MONTHLY;BYDAY=2MO"}))
                .with_priority(50),
            Rule::new("blackout_dates", Effect::Deny)
                .with_config(json!({"dates": ["2025-12-25", "2025-01-01"]}))
                .with_priority(80),
        ],
    };
    let moment = chrono::Utc.with_ymd_and_hms(2025, 6, 4, 17, 0, 0).unwrap();

    c.bench_function("is_available_four_rules", |b| {
        b.iter(|| black_box(engine.is_available(&venue, &moment).unwrap()))
    });
}

criterion_group!(benches, bench_is_available);
criterion_main!(benches);
