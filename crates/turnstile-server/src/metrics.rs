use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[derive(Debug, Default)]
pub struct Metrics {
    calls_admitted: AtomicU64,
    calls_denied: AtomicU64,
    streams_opened: AtomicU64,
    streams_closed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_admitted(&self) {
        self.calls_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_denied(&self) {
        self.calls_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_opened(&self) {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_closed(&self) {
        self.streams_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn calls_admitted(&self) -> u64 {
        self.calls_admitted.load(Ordering::Relaxed)
    }

    pub fn calls_denied(&self) -> u64 {
        self.calls_denied.load(Ordering::Relaxed)
    }

    pub fn streams_opened(&self) -> u64 {
        self.streams_opened.load(Ordering::Relaxed)
    }

    pub fn streams_closed(&self) -> u64 {
        self.streams_closed.load(Ordering::Relaxed)
    }

    pub fn active_streams(&self) -> u64 {
        self.streams_opened().saturating_sub(self.streams_closed())
    }

    pub fn render_prometheus(&self) -> String {
        let mut output = String::new();
        write_metric(
            &mut output,
            "turnstile_calls_admitted_total",
            "counter",
            "Calls that passed the access policy.",
            self.calls_admitted(),
        );
        write_metric(
            &mut output,
            "turnstile_calls_denied_total",
            "counter",
            "Calls rejected as unauthenticated.",
            self.calls_denied(),
        );
        write_metric(
            &mut output,
            "turnstile_streams_opened_total",
            "counter",
            "Logging and statistics streams opened.",
            self.streams_opened(),
        );
        write_metric(
            &mut output,
            "turnstile_active_streams",
            "gauge",
            "Logging and statistics streams currently open.",
            self.active_streams(),
        );
        output
    }
}

fn write_metric(output: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {kind}");
    let _ = writeln!(output, "{name} {value}");
}

pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics.render_prometheus(),
    )
}

pub fn router(metrics: Arc<Metrics>) -> axum::Router {
    axum::Router::new()
        .route("/metrics", axum::routing::get(metrics_handler))
        .with_state(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_metrics_are_zero() {
        let m = Metrics::new();
        assert_eq!(m.calls_admitted(), 0);
        assert_eq!(m.calls_denied(), 0);
        assert_eq!(m.active_streams(), 0);
    }

    #[test]
    fn record_increments_counters() {
        let m = Metrics::new();
        m.record_admitted();
        m.record_admitted();
        m.record_denied();
        m.record_stream_opened();
        m.record_stream_opened();
        m.record_stream_closed();

        assert_eq!(m.calls_admitted(), 2);
        assert_eq!(m.calls_denied(), 1);
        assert_eq!(m.streams_opened(), 2);
        assert_eq!(m.active_streams(), 1);
    }

    #[test]
    fn render_prometheus_format() {
        let m = Metrics::new();
        m.record_admitted();
        m.record_stream_opened();

        let output = m.render_prometheus();

        assert!(output.contains("# TYPE turnstile_calls_admitted_total counter"));
        assert!(output.contains("turnstile_calls_admitted_total 1"));
        assert!(output.contains("turnstile_calls_denied_total 0"));
        assert!(output.contains("# TYPE turnstile_active_streams gauge"));
        assert!(output.contains("turnstile_active_streams 1"));
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_prometheus_text() {
        let metrics = Arc::new(Metrics::new());
        metrics.record_admitted();
        metrics.record_admitted();
        metrics.record_denied();

        let server = axum_test::TestServer::new(router(metrics)).unwrap();
        let response = server.get("/metrics").await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("turnstile_calls_admitted_total 2"));
        assert!(body.contains("turnstile_calls_denied_total 1"));
    }
}
