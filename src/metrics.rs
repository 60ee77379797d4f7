//! Prometheus metrics collection for the resume reviewer
//!
//! Tracks:
//! - analysis requests by outcome
//! - cache hits and misses
//! - upstream attempts by result (including retries)
//! - corrective re-prompts
//! - end-to-end analysis latency
//!
//! Exposed via the `/metrics` endpoint in Prometheus text format.

use std::sync::Arc;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::AppError;

/// Final outcome of an `/analyze` request
///
/// Enum labels keep cardinality fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    /// Rejected input (400 or 413)
    Rejected,
    /// Upstream unreachable, timed out or returned an error status
    UpstreamFailure,
    /// Model answered, but never with a valid document
    InvalidOutput,
    Internal,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Success => "success",
            RequestOutcome::Rejected => "rejected",
            RequestOutcome::UpstreamFailure => "upstream_failure",
            RequestOutcome::InvalidOutput => "invalid_output",
            RequestOutcome::Internal => "internal",
        }
    }

    /// Classify a failed request
    pub fn from_error(error: &AppError) -> Self {
        match error {
            AppError::Validation(_) | AppError::PayloadTooLarge(_) => RequestOutcome::Rejected,
            AppError::Upstream(_) => RequestOutcome::UpstreamFailure,
            AppError::ModelOutput { .. } => RequestOutcome::InvalidOutput,
            _ => RequestOutcome::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    Miss,
}

impl CacheLookup {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheLookup::Hit => "hit",
            CacheLookup::Miss => "miss",
        }
    }
}

/// Result of a single upstream HTTP attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamOutcome {
    Success,
    Timeout,
    HttpError,
    NetworkError,
}

impl UpstreamOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamOutcome::Success => "success",
            UpstreamOutcome::Timeout => "timeout",
            UpstreamOutcome::HttpError => "http_error",
            UpstreamOutcome::NetworkError => "network_error",
        }
    }
}

/// Metrics collector
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    cache_lookups: IntCounterVec,
    upstream_attempts: IntCounterVec,
    reprompts: IntCounter,
    analysis_duration: Histogram,
    metrics_recording_failures: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "resume_reviewer_requests_total",
                "Total analysis requests by outcome",
            ),
            &["outcome"],
        )?;

        let cache_lookups = IntCounterVec::new(
            Opts::new(
                "resume_reviewer_cache_lookups_total",
                "Response cache lookups by result",
            ),
            &["result"],
        )?;

        // Counts every HTTP attempt, so retries show up as extra increments
        let upstream_attempts = IntCounterVec::new(
            Opts::new(
                "resume_reviewer_upstream_attempts_total",
                "Upstream generation attempts by result",
            ),
            &["result"],
        )?;

        let reprompts = IntCounter::with_opts(Opts::new(
            "resume_reviewer_reprompts_total",
            "Corrective re-prompts issued after unparseable or invalid model output",
        ))?;

        // Local models are slow; buckets reach up to five minutes
        let analysis_duration = Histogram::with_opts(
            HistogramOpts::new(
                "resume_reviewer_analysis_duration_ms",
                "End-to-end analysis latency in milliseconds",
            )
            .buckets(vec![
                1.0, 10.0, 100.0, 1_000.0, 5_000.0, 15_000.0, 30_000.0, 60_000.0, 120_000.0,
                300_000.0,
            ]),
        )?;

        let metrics_recording_failures = IntCounterVec::new(
            Opts::new(
                "resume_reviewer_metrics_recording_failures_total",
                "Metrics recording operation failures by operation. \
                Indicates Prometheus internal errors.",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(cache_lookups.clone()))?;
        registry.register(Box::new(upstream_attempts.clone()))?;
        registry.register(Box::new(reprompts.clone()))?;
        registry.register(Box::new(analysis_duration.clone()))?;
        registry.register(Box::new(metrics_recording_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            cache_lookups,
            upstream_attempts,
            reprompts,
            analysis_duration,
            metrics_recording_failures,
        })
    }

    /// Record the outcome of an analysis request
    pub fn record_request(&self, outcome: RequestOutcome) {
        let result = self
            .requests_total
            .get_metric_with_label_values(&[outcome.as_str()])
            .map(|c| c.inc());
        self.check("record_request", result);
    }

    pub fn record_cache_lookup(&self, lookup: CacheLookup) {
        let result = self
            .cache_lookups
            .get_metric_with_label_values(&[lookup.as_str()])
            .map(|c| c.inc());
        self.check("record_cache_lookup", result);
    }

    pub fn record_upstream_attempt(&self, outcome: UpstreamOutcome) {
        let result = self
            .upstream_attempts
            .get_metric_with_label_values(&[outcome.as_str()])
            .map(|c| c.inc());
        self.check("record_upstream_attempt", result);
    }

    pub fn record_reprompt(&self) {
        self.reprompts.inc();
    }

    /// Record end-to-end analysis latency
    ///
    /// NaN, infinite and negative values are refused; they would corrupt
    /// every percentile of the histogram.
    pub fn record_analysis_duration(&self, duration_ms: f64) {
        let result = if !duration_ms.is_finite() || duration_ms < 0.0 {
            Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {duration_ms}"
            )))
        } else {
            self.analysis_duration.observe(duration_ms);
            Ok(())
        };
        self.check("record_analysis_duration", result);
    }

    /// Log-and-continue on recording errors; observability never fails a request
    fn check(&self, operation: &'static str, result: Result<(), prometheus::Error>) {
        if let Err(e) = result {
            tracing::error!(
                operation = operation,
                error = %e,
                "Metrics recording failed (non-fatal)"
            );
            if let Ok(counter) = self
                .metrics_recording_failures
                .get_metric_with_label_values(&[operation])
            {
                counter.inc();
            }
        }
    }

    pub fn requests_count(&self, outcome: RequestOutcome) -> u64 {
        self.requests_total
            .get_metric_with_label_values(&[outcome.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    pub fn cache_lookups_count(&self, lookup: CacheLookup) -> u64 {
        self.cache_lookups
            .get_metric_with_label_values(&[lookup.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    pub fn upstream_attempts_count(&self, outcome: UpstreamOutcome) -> u64 {
        self.upstream_attempts
            .get_metric_with_label_values(&[outcome.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    pub fn reprompts_count(&self) -> u64 {
        self.reprompts.get()
    }

    pub fn analysis_duration_count(&self) -> u64 {
        self.analysis_duration.get_sample_count()
    }

    pub fn metrics_recording_failures_count(&self) -> u64 {
        self.registry
            .gather()
            .iter()
            .find(|mf| mf.name() == "resume_reviewer_metrics_recording_failures_total")
            .map(|mf| {
                mf.get_metric()
                    .iter()
                    .map(|m| m.counter.value.unwrap_or(0.0) as u64)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_count,
                    "Prometheus text encoder failed"
                );
                prometheus::Error::Msg(format!(
                    "Failed to encode {metric_count} metric families: {e}"
                ))
            })?;

        String::from_utf8(buffer).map_err(|e| {
            tracing::error!(
                invalid_byte_index = e.utf8_error().valid_up_to(),
                "Prometheus encoder produced invalid UTF-8"
            );
            prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;

    #[test]
    fn test_metrics_new_registers_all_families() {
        let metrics = Metrics::new().expect("Failed to create metrics");

        metrics.record_request(RequestOutcome::Success);
        metrics.record_cache_lookup(CacheLookup::Miss);
        metrics.record_upstream_attempt(UpstreamOutcome::Success);
        metrics.record_reprompt();
        metrics.record_analysis_duration(12.5);

        let names: Vec<String> = metrics
            .registry
            .gather()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        for expected in [
            "resume_reviewer_requests_total",
            "resume_reviewer_cache_lookups_total",
            "resume_reviewer_upstream_attempts_total",
            "resume_reviewer_reprompts_total",
            "resume_reviewer_analysis_duration_ms",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_counters_increment_per_label() {
        let metrics = Metrics::new().unwrap();

        metrics.record_cache_lookup(CacheLookup::Hit);
        metrics.record_cache_lookup(CacheLookup::Hit);
        metrics.record_cache_lookup(CacheLookup::Miss);
        metrics.record_upstream_attempt(UpstreamOutcome::Timeout);

        assert_eq!(metrics.cache_lookups_count(CacheLookup::Hit), 2);
        assert_eq!(metrics.cache_lookups_count(CacheLookup::Miss), 1);
        assert_eq!(metrics.upstream_attempts_count(UpstreamOutcome::Timeout), 1);
        assert_eq!(metrics.upstream_attempts_count(UpstreamOutcome::Success), 0);
    }

    #[test]
    fn test_invalid_duration_is_refused_and_counted() {
        let metrics = Metrics::new().unwrap();

        metrics.record_analysis_duration(f64::NAN);
        metrics.record_analysis_duration(-1.0);
        metrics.record_analysis_duration(f64::INFINITY);

        assert_eq!(metrics.analysis_duration_count(), 0);
        assert_eq!(metrics.metrics_recording_failures_count(), 3);
    }

    #[test]
    fn test_outcome_from_error() {
        assert_eq!(
            RequestOutcome::from_error(&AppError::Validation("x".into())),
            RequestOutcome::Rejected
        );
        assert_eq!(
            RequestOutcome::from_error(&AppError::PayloadTooLarge("x".into())),
            RequestOutcome::Rejected
        );
        assert_eq!(
            RequestOutcome::from_error(&AppError::Upstream(UpstreamError::Http {
                status: 500,
                body: String::new(),
            })),
            RequestOutcome::UpstreamFailure
        );
        assert_eq!(
            RequestOutcome::from_error(&AppError::Internal("x".into())),
            RequestOutcome::Internal
        );
    }

    #[test]
    fn test_gather_produces_prometheus_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request(RequestOutcome::Success);
        metrics.record_reprompt();

        let output = metrics.gather().unwrap();
        assert!(output.contains("# TYPE resume_reviewer_requests_total counter"));
        assert!(output.contains("resume_reviewer_requests_total{outcome=\"success\"} 1"));
        assert!(output.contains("resume_reviewer_reprompts_total 1"));
    }

    #[test]
    fn test_clones_share_registry() {
        let metrics = Metrics::new().unwrap();
        let clone = metrics.clone();
        clone.record_reprompt();
        assert_eq!(metrics.reprompts_count(), 1);
    }
}
