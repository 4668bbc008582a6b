//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters, gauges and histograms the migration pipeline reports.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    core::Collector,
};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Bucket boundaries (seconds) for stage durations; stages range from
/// sub-second link passes to multi-hour slicer runs.
const STAGE_DURATION_BUCKETS: &[f64] = &[
    0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 1_800.0, 3_600.0, 7_200.0, 14_400.0,
];

/// Prometheus-backed metrics registry shared across the pipeline.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    stage_runs_total: IntCounterVec,
    stage_duration_seconds: HistogramVec,
    tapes_total: IntCounterVec,
    links_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    active_tapes: IntGauge,
}

/// Snapshot of selected gauges and counters for the end-of-run summary.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Tapes currently being processed.
    pub active_tapes: i64,
    /// Tapes that reached the finished state.
    pub tapes_finished: u64,
    /// Tapes that reached the failed state.
    pub tapes_failed: u64,
    /// Links created successfully.
    pub links_created: u64,
    /// Link attempts that failed.
    pub links_failed: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let stage_runs_total = IntCounterVec::new(
            Opts::new(
                "tapemig_stage_runs_total",
                "Pipeline stages executed by terminal status",
            ),
            &["stage", "status"],
        )
        .map_err(collector_error("tapemig_stage_runs_total"))?;
        let stage_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tapemig_stage_duration_seconds",
                "Wall-clock duration of pipeline stages",
            )
            .buckets(STAGE_DURATION_BUCKETS.to_vec()),
            &["stage"],
        )
        .map_err(collector_error("tapemig_stage_duration_seconds"))?;
        let tapes_total = IntCounterVec::new(
            Opts::new("tapemig_tapes_total", "Tapes that reached a terminal status"),
            &["status"],
        )
        .map_err(collector_error("tapemig_tapes_total"))?;
        let links_total = IntCounterVec::new(
            Opts::new("tapemig_links_total", "Link attempts by outcome"),
            &["outcome"],
        )
        .map_err(collector_error("tapemig_links_total"))?;
        let events_emitted_total = IntCounterVec::new(
            Opts::new("tapemig_events_emitted_total", "Domain events emitted by type"),
            &["type"],
        )
        .map_err(collector_error("tapemig_events_emitted_total"))?;
        let active_tapes = IntGauge::with_opts(Opts::new(
            "tapemig_active_tapes",
            "Tapes currently inside the pipeline",
        ))
        .map_err(collector_error("tapemig_active_tapes"))?;

        register(&registry, "tapemig_stage_runs_total", &stage_runs_total)?;
        register(
            &registry,
            "tapemig_stage_duration_seconds",
            &stage_duration_seconds,
        )?;
        register(&registry, "tapemig_tapes_total", &tapes_total)?;
        register(&registry, "tapemig_links_total", &links_total)?;
        register(&registry, "tapemig_events_emitted_total", &events_emitted_total)?;
        register(&registry, "tapemig_active_tapes", &active_tapes)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                stage_runs_total,
                stage_duration_seconds,
                tapes_total,
                links_total,
                events_emitted_total,
                active_tapes,
            }),
        })
    }

    /// Increment the stage counter for the given stage and status.
    pub fn inc_stage(&self, stage: &str, status: &str) {
        self.inner
            .stage_runs_total
            .with_label_values(&[stage, status])
            .inc();
    }

    /// Record how long a stage took.
    pub fn observe_stage_duration(&self, stage: &str, duration: Duration) {
        self.inner
            .stage_duration_seconds
            .with_label_values(&[stage])
            .observe(duration.as_secs_f64());
    }

    /// Increment the terminal tape counter.
    pub fn inc_tape(&self, status: &str) {
        self.inner.tapes_total.with_label_values(&[status]).inc();
    }

    /// Add link outcomes for one link pass.
    pub fn add_links(&self, created: u64, failed: u64) {
        self.inner
            .links_total
            .with_label_values(&["created"])
            .inc_by(created);
        self.inner
            .links_total
            .with_label_values(&["failed"])
            .inc_by(failed);
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Mark a tape as entering the pipeline.
    pub fn tape_entered(&self) {
        self.inner.active_tapes.inc();
    }

    /// Mark a tape as leaving the pipeline.
    pub fn tape_left(&self) {
        self.inner.active_tapes.dec();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_tapes: self.inner.active_tapes.get(),
            tapes_finished: self.inner.tapes_total.with_label_values(&["finished"]).get(),
            tapes_failed: self.inner.tapes_total.with_label_values(&["failed"]).get(),
            links_created: self.inner.links_total.with_label_values(&["created"]).get(),
            links_failed: self.inner.links_total.with_label_values(&["failed"]).get(),
        }
    }
}

fn collector_error(name: &'static str) -> impl FnOnce(prometheus::Error) -> TelemetryError {
    move |source| TelemetryError::MetricsCollector { name, source }
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_stage("slice", "completed");
        metrics.observe_stage_duration("slice", Duration::from_secs(42));
        metrics.inc_tape("finished");
        metrics.inc_tape("failed");
        metrics.inc_tape("failed");
        metrics.add_links(7, 2);
        metrics.inc_event("tape_started");
        metrics.tape_entered();
        metrics.tape_entered();
        metrics.tape_left();

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot,
            MetricsSnapshot {
                active_tapes: 1,
                tapes_finished: 1,
                tapes_failed: 2,
                links_created: 7,
                links_failed: 2,
            }
        );

        let rendered = metrics.render()?;
        assert!(rendered.contains("tapemig_stage_runs_total"));
        assert!(rendered.contains("tapemig_stage_duration_seconds_bucket"));
        assert!(rendered.contains("tapemig_links_total"));
        Ok(())
    }

    #[test]
    fn registries_are_independent_per_handle() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_tape("finished");
        assert_eq!(second.snapshot().tapes_finished, 0);
        Ok(())
    }
}
