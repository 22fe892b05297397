use crate::features::observability::repo::ObservabilityRepository;
use crate::features::observability::service::ObservabilityService;
use oc2gate_core::Action;
use std::sync::Arc;

pub struct ObservabilityController {
    service: ObservabilityService,
}

impl ObservabilityController {
    pub fn new(service: ObservabilityService) -> Self {
        Self { service }
    }

    /// Controller over a fresh registry
    pub fn with_registry() -> Result<Self, String> {
        let repo = Arc::new(ObservabilityRepository::new()?);
        Ok(Self::new(ObservabilityService::new(repo)))
    }

    pub fn record_issued(&self, action: Action) {
        self.service.record_issued(action);
    }

    pub fn record_reconciled(&self, action: Action, success: bool, round_trip_seconds: f64) {
        self.service
            .record_reconciled(action, success, round_trip_seconds);
    }

    pub fn record_unknown_correlation(&self) {
        self.service.record_unknown_correlation();
    }

    pub fn set_pending(&self, count: usize) {
        self.service.set_pending(count);
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        self.service.render_metrics()
    }
}
