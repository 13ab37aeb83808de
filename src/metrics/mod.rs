use prometheus::{
    Counter, CounterVec, Histogram, HistogramOpts, IntGauge, Opts, Registry,
};
use std::sync::Arc;

pub mod server;

pub struct Metrics {
    pub messages_acked_total: Counter,
    pub messages_requeued_total: Counter,
    pub forward_outcomes_total: CounterVec,
    pub forward_duration_seconds: Histogram,
    pub reconnect_attempts_total: Counter,
    pub broker_connected: IntGauge,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let messages_acked_total = Counter::new(
            "registro_messages_acked_total",
            "Total number of messages acknowledged",
        )?;

        let messages_requeued_total = Counter::new(
            "registro_messages_requeued_total",
            "Total number of messages negatively acknowledged with requeue",
        )?;

        let forward_outcomes_total = CounterVec::new(
            Opts::new(
                "registro_forward_outcomes_total",
                "Forwarding attempts by outcome",
            ),
            &["outcome"],
        )?;

        let forward_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "registro_forward_duration_seconds",
                "Time taken to forward a record to the registro API",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;

        let reconnect_attempts_total = Counter::new(
            "registro_reconnect_attempts_total",
            "Total number of broker reconnect attempts",
        )?;

        let broker_connected = IntGauge::new(
            "registro_broker_connected",
            "1 while a broker session is consuming, 0 otherwise",
        )?;

        registry.register(Box::new(messages_acked_total.clone()))?;
        registry.register(Box::new(messages_requeued_total.clone()))?;
        registry.register(Box::new(forward_outcomes_total.clone()))?;
        registry.register(Box::new(forward_duration_seconds.clone()))?;
        registry.register(Box::new(reconnect_attempts_total.clone()))?;
        registry.register(Box::new(broker_connected.clone()))?;

        Ok(Arc::new(Self {
            messages_acked_total,
            messages_requeued_total,
            forward_outcomes_total,
            forward_duration_seconds,
            reconnect_attempts_total,
            broker_connected,
            registry,
        }))
    }
}
