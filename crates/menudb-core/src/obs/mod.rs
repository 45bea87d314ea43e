//! Observability: runtime counters and the sink boundary that feeds them.
//!
//! Structured logs go through `tracing`; counters go through `sink`.

pub(crate) mod metrics;
pub(crate) mod sink;

pub use metrics::{EntityCounters, EventOps, EventReport, EventState};
pub use sink::{
    ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink,
};
