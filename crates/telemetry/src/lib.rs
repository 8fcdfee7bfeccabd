//! Logging bootstrap and the tracing bridge for availability decisions.

#![deny(unsafe_code)]

use engine::{Decision, DecisionObserver};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Output format for the logging bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line with span context; for shipped logs.
    #[default]
    Json,
    /// Compact human-readable lines; for local runs.
    Text,
}

/// Initialize logging in the requested format with env filter and wire
/// availability decisions into the log stream: when this call installs
/// the subscriber, it also installs [`TracingDecisionObserver`] as the
/// engine's decision observer, so every evaluation shows up as a
/// structured event. Set RUST_LOG, e.g., "info,engine=debug".
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = match format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer().json().with_current_span(true).with_span_list(true);
            let subscriber = Registry::default().with(filter).with(fmt_layer);
            tracing::subscriber::set_global_default(subscriber).is_ok()
        }
        LogFormat::Text => {
            let fmt_layer = fmt::layer().compact();
            let subscriber = Registry::default().with(filter).with(fmt_layer);
            tracing::subscriber::set_global_default(subscriber).is_ok()
        }
    };
    // A lost set_global_default race means another bootstrap owns the
    // observer slot as well; leave it untouched.
    if installed {
        engine::set_observer(Some(Box::new(TracingDecisionObserver)));
    }
}

/// Initialize JSON logging and decision capture (the production default).
pub fn init_json_logging() {
    init_logging(LogFormat::Json);
}

/// Decision observer emitting one structured `tracing` event per
/// evaluation. Installed by [`init_logging`]; hosts composing their own
/// subscriber can install it directly via `engine::set_observer`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDecisionObserver;

impl DecisionObserver for TracingDecisionObserver {
    fn on_decision(&self, subject_type: &str, decision: &Decision) {
        tracing::info!(
            subject_type,
            allowed = decision.allowed,
            matched_kind = decision.matched_kind.as_deref().unwrap_or(""),
            rules_evaluated = decision.rules_evaluated,
            "availability decision"
        );
    }
}
