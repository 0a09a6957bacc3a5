use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::CartId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

/// Ordered record of how a grand total was assembled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub pass_id: Uuid,
    pub cart_id: CartId,
    pub cart_fingerprint: String,
    pub steps: Vec<PricingTraceStep>,
}

impl PricingTrace {
    pub fn new(pass_id: Uuid, cart_id: CartId, cart_fingerprint: impl Into<String>) -> Self {
        Self { pass_id, cart_id, cart_fingerprint: cart_fingerprint.into(), steps: Vec::new() }
    }

    pub fn record(&mut self, stage: &str, detail: impl Into<String>, amount: Decimal) {
        self.steps.push(PricingTraceStep {
            stage: stage.to_string(),
            detail: detail.into(),
            amount,
        });
    }

    pub fn step(&self, stage: &str) -> Option<&PricingTraceStep> {
        self.steps.iter().find(|step| step.stage == stage)
    }
}
