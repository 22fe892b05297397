use prometheus::{
    opts, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Registry, TextEncoder,
};

pub struct ObservabilityRepository {
    registry: Registry,
    commands_issued_total: CounterVec,
    responses_reconciled_total: CounterVec,
    pending_commands: Gauge,
    unknown_correlation_total: Counter,
    command_round_trip_seconds: Histogram,
}

impl ObservabilityRepository {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();

        let commands_issued_total = CounterVec::new(
            opts!("oc2gate_commands_issued_total", "OpenC2 commands issued"),
            &["action"],
        )
        .map_err(|e| e.to_string())?;
        let responses_reconciled_total = CounterVec::new(
            opts!(
                "oc2gate_responses_reconciled_total",
                "OpenC2 responses reconciled into the status map"
            ),
            &["action", "outcome"],
        )
        .map_err(|e| e.to_string())?;
        let pending_commands = Gauge::with_opts(opts!(
            "oc2gate_pending_commands",
            "Commands awaiting a response"
        ))
        .map_err(|e| e.to_string())?;
        let unknown_correlation_total = Counter::with_opts(opts!(
            "oc2gate_unknown_correlation_total",
            "Responses whose correlation id was not pending"
        ))
        .map_err(|e| e.to_string())?;
        let command_round_trip_seconds = Histogram::with_opts(HistogramOpts::new(
            "oc2gate_command_round_trip_seconds",
            "Time from registration to reconciliation (seconds)",
        ))
        .map_err(|e| e.to_string())?;

        registry
            .register(Box::new(commands_issued_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(responses_reconciled_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(pending_commands.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(unknown_correlation_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(command_round_trip_seconds.clone()))
            .map_err(|e| e.to_string())?;

        Ok(Self {
            registry,
            commands_issued_total,
            responses_reconciled_total,
            pending_commands,
            unknown_correlation_total,
            command_round_trip_seconds,
        })
    }

    pub fn inc_commands_issued(&self, action: &str) {
        self.commands_issued_total.with_label_values(&[action]).inc();
    }

    pub fn inc_responses_reconciled(&self, action: &str, outcome: &str) {
        self.responses_reconciled_total
            .with_label_values(&[action, outcome])
            .inc();
    }

    pub fn set_pending_commands(&self, count: f64) {
        self.pending_commands.set(count);
    }

    pub fn inc_unknown_correlation(&self) {
        self.unknown_correlation_total.inc();
    }

    pub fn observe_round_trip(&self, seconds: f64) {
        self.command_round_trip_seconds.observe(seconds);
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }
}
