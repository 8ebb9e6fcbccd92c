use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub claims_created_total: IntCounterVec,
    pub claim_resolutions_total: IntCounterVec,
    pub resolution_latency_seconds: HistogramVec,
    pub notification_failures_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let claims_created_total = IntCounterVec::new(
            Opts::new("claims_created_total", "Claims created by claim type"),
            &["claim_type"],
        )
        .expect("valid claims_created_total metric");

        let claim_resolutions_total = IntCounterVec::new(
            Opts::new(
                "claim_resolutions_total",
                "Claim resolutions and forced assignments by outcome",
            ),
            &["outcome"],
        )
        .expect("valid claim_resolutions_total metric");

        let resolution_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "resolution_latency_seconds",
                "Latency of claim resolution in seconds, lock wait included",
            ),
            &["outcome"],
        )
        .expect("valid resolution_latency_seconds metric");

        let notification_failures_total = IntCounterVec::new(
            Opts::new(
                "notification_failures_total",
                "Notifications dropped after a sink or push failure",
            ),
            &["channel"],
        )
        .expect("valid notification_failures_total metric");

        registry
            .register(Box::new(claims_created_total.clone()))
            .expect("register claims_created_total");
        registry
            .register(Box::new(claim_resolutions_total.clone()))
            .expect("register claim_resolutions_total");
        registry
            .register(Box::new(resolution_latency_seconds.clone()))
            .expect("register resolution_latency_seconds");
        registry
            .register(Box::new(notification_failures_total.clone()))
            .expect("register notification_failures_total");

        Self {
            registry,
            claims_created_total,
            claim_resolutions_total,
            resolution_latency_seconds,
            notification_failures_total,
        }
    }

    pub fn record_resolution(&self, outcome: &str, elapsed_secs: f64) {
        self.claim_resolutions_total
            .with_label_values(&[outcome])
            .inc();
        self.resolution_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_secs);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
