//! Metrics collection using Prometheus
//!
//! Tracks queue depth, per-mode outcomes and processing time. The registry is the
//! prometheus default one; the HTTP API exposes it at `/metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge, HistogramVec,
    TextEncoder,
};

use crate::processing::Mode;
use strum::IntoEnumIterator;

/// Number of items currently waiting in the work queue
pub static QUEUE_DEPTH: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("retouch_queue_depth", "Number of work items waiting in the queue").unwrap()
});

/// Number of workers currently busy with an item
pub static WORKERS_BUSY: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("retouch_workers_busy", "Number of workers processing an item").unwrap()
});

/// Finished items by mode and outcome
/// Labels: mode, outcome (success/timeout/processor/source)
pub static ITEMS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "retouch_items_total",
        "Total number of processed work items by mode and outcome",
        &["mode", "outcome"]
    )
    .unwrap()
});

/// Rejected submissions by reason
/// Labels: reason (unknown_mode/queue_full/closed)
pub static REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "retouch_rejected_total",
        "Total number of submissions rejected at intake",
        &["reason"]
    )
    .unwrap()
});

/// Time spent inside the processor, by mode
pub static PROCESSING_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "retouch_processing_duration_seconds",
        "Time spent processing a work item by mode",
        &["mode"],
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .unwrap()
});

/// Time between submission and the moment a worker claims the item
pub static QUEUE_WAIT_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "retouch_queue_wait_seconds",
        "Time work items spend waiting in the queue",
        &["mode"],
        vec![0.1, 1.0, 5.0, 30.0, 60.0, 300.0, 900.0]
    )
    .unwrap()
});

/// Initialize metrics (call this at startup to register all metrics)
pub fn init_metrics() {
    log::info!("Initializing metrics registry...");

    let _ = &*QUEUE_DEPTH;
    let _ = &*WORKERS_BUSY;
    let _ = &*PROCESSING_DURATION_SECONDS;
    let _ = &*QUEUE_WAIT_SECONDS;

    // Pre-create label combinations so they show up in /metrics with 0 values
    for mode in Mode::iter() {
        for outcome in ["success", "timeout", "processor", "source"] {
            ITEMS_TOTAL.with_label_values(&[mode.as_ref(), outcome]);
        }
    }
    for reason in ["unknown_mode", "queue_full", "closed"] {
        REJECTED_TOTAL.with_label_values(&[reason]);
    }
}

pub fn update_queue_depth(depth: usize) {
    QUEUE_DEPTH.set(depth as f64);
}

pub fn update_workers_busy(busy: usize) {
    WORKERS_BUSY.set(busy as f64);
}

pub fn record_outcome(mode: Mode, outcome: &str) {
    ITEMS_TOTAL.with_label_values(&[mode.as_ref(), outcome]).inc();
}

pub fn record_rejection(reason: &str) {
    REJECTED_TOTAL.with_label_values(&[reason]).inc();
}

pub fn observe_processing(mode: Mode, seconds: f64) {
    PROCESSING_DURATION_SECONDS
        .with_label_values(&[mode.as_ref()])
        .observe(seconds);
}

pub fn observe_queue_wait(mode: Mode, seconds: f64) {
    QUEUE_WAIT_SECONDS.with_label_values(&[mode.as_ref()]).observe(seconds);
}

/// Renders the default registry in the Prometheus text exposition format.
///
/// Returns the content type alongside the body.
pub fn render() -> Result<(String, Vec<u8>), prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok((encoder.format_type().to_string(), buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_registered_metrics() {
        init_metrics();
        record_outcome(Mode::Poster, "success");
        update_queue_depth(3);

        let (content_type, body) = render().unwrap();
        let text = String::from_utf8(body).unwrap();

        assert!(content_type.starts_with("text/plain"));
        assert!(text.contains("retouch_items_total"));
        assert!(text.contains("retouch_queue_depth"));
        assert!(text.contains("mode=\"poster\""));
    }
}
