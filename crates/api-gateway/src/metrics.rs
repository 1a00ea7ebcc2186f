use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Forwarding
pub static PROXY_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "gateway_proxy_requests_total",
            "Requests answered by a backend, by upstream status",
        ),
        &["service", "status"],
    )
    .expect("valid metric definition")
});

pub static PROXY_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "gateway_proxy_failures_total",
            "Requests that never got a backend response",
        ),
        &["service", "kind"],
    )
    .expect("valid metric definition")
});

pub static PROXY_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "gateway_proxy_latency_seconds",
            "Time until the backend response headers arrive",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("valid metric definition")
});

pub static ROUTE_MISSES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "gateway_route_misses_total",
        "Requests whose path matched no configured prefix",
    )
    .expect("valid metric definition")
});

// Health probes
pub static HEALTH_PROBES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("gateway_health_probes_total", "Backend health probes by outcome"),
        &["service", "state"],
    )
    .expect("valid metric definition")
});

/// Register all metrics with the registry
pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(PROXY_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROXY_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROXY_LATENCY.clone()))?;
    REGISTRY.register(Box::new(ROUTE_MISSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(HEALTH_PROBES_TOTAL.clone()))?;
    Ok(())
}
