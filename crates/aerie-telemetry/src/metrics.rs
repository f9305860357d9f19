//! Prometheus metrics for the processing pipeline.
//!
//! All metrics follow the naming convention: `aerie_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: bags fetched, completed, filtered; loop terminations
//! - **CounterVec**: module errors by module instance
//! - **HistogramVec**: `process()` duration by module instance

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // MAIN LOOP METRICS
    // =========================================================================

    /// Bags pulled from a source by any main loop
    pub static ref BAGS_FETCHED: IntCounter = IntCounter::new(
        "aerie_pipeline_bags_fetched_total",
        "Total number of bags fetched from sources"
    ).expect("metric creation failed");

    /// Bags that went through every module of their chain
    pub static ref BAGS_COMPLETED: IntCounter = IntCounter::new(
        "aerie_pipeline_bags_completed_total",
        "Total number of bags processed by the full module chain"
    ).expect("metric creation failed");

    /// Bags dropped by a module returning Filter
    pub static ref BAGS_FILTERED: IntCounter = IntCounter::new(
        "aerie_pipeline_bags_filtered_total",
        "Total number of bags filtered out by a module"
    ).expect("metric creation failed");

    /// Main loops stopped early by a module returning Terminate
    pub static ref LOOP_TERMINATIONS: IntCounter = IntCounter::new(
        "aerie_pipeline_loop_terminations_total",
        "Total number of main loops ended by a Terminate result"
    ).expect("metric creation failed");

    // =========================================================================
    // MODULE METRICS
    // =========================================================================

    /// Module failures by instance name
    pub static ref MODULE_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("aerie_module_errors_total", "Errors returned by module process()"),
        &["module"]
    ).expect("metric creation failed");

    /// Time spent in `process()` by instance name
    pub static ref MODULE_PROCESS_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "aerie_module_process_duration_seconds",
            "Time spent in module process()"
        ).buckets(exponential_buckets(0.000_001, 4.0, 12).expect("valid buckets")),
        &["module"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Calling it twice is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BAGS_FETCHED.clone()),
        Box::new(BAGS_COMPLETED.clone()),
        Box::new(BAGS_FILTERED.clone()),
        Box::new(LOOP_TERMINATIONS.clone()),
        Box::new(MODULE_ERRORS.clone()),
        Box::new(MODULE_PROCESS_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard observing the elapsed time into a histogram on drop.
pub struct HistogramTimer {
    histogram: prometheus::Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &prometheus::Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }

    /// Start a timer for one module instance's `process()` call.
    pub fn module(module: &str) -> Self {
        Self::new(&MODULE_PROCESS_DURATION.with_label_values(&[module]))
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_twice() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[test]
    fn test_counter_increment() {
        let before = BAGS_FETCHED.get();
        BAGS_FETCHED.inc();
        assert!(BAGS_FETCHED.get() > before);
    }

    #[test]
    fn test_module_timer_observes() {
        let histogram = MODULE_PROCESS_DURATION.with_label_values(&["timer-test"]);
        let before = histogram.get_sample_count();
        {
            let _timer = HistogramTimer::module("timer-test");
        }
        assert_eq!(histogram.get_sample_count(), before + 1);
    }

    #[test]
    fn test_encode_contains_names() {
        register_metrics().unwrap();
        MODULE_ERRORS.with_label_values(&["encode-test"]).inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("aerie_module_errors_total"));
        assert!(text.contains("aerie_pipeline_bags_fetched_total"));
    }
}
