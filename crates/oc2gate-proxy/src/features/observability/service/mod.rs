use crate::features::observability::repo::ObservabilityRepository;
use oc2gate_core::Action;
use std::sync::Arc;

pub struct ObservabilityService {
    repo: Arc<ObservabilityRepository>,
}

impl ObservabilityService {
    pub fn new(repo: Arc<ObservabilityRepository>) -> Self {
        Self { repo }
    }

    pub fn record_issued(&self, action: Action) {
        self.repo.inc_commands_issued(action.as_str());
    }

    pub fn record_reconciled(&self, action: Action, success: bool, round_trip_seconds: f64) {
        let outcome = if success { "success" } else { "failure" };
        self.repo.inc_responses_reconciled(action.as_str(), outcome);
        self.repo.observe_round_trip(round_trip_seconds);
    }

    pub fn record_unknown_correlation(&self) {
        self.repo.inc_unknown_correlation();
    }

    pub fn set_pending(&self, count: usize) {
        self.repo.set_pending_commands(count as f64);
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        self.repo.render_metrics()
    }
}
