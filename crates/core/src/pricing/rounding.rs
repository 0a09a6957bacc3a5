use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

const MONEY_DECIMALS: u32 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round every intermediate monetary value as soon as it is computed.
    #[default]
    EveryStage,
    /// Keep full precision until a figure is returned.
    FinalOnly,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidpointRounding {
    #[default]
    NearestEven,
    AwayFromZero,
}

/// Rounding rules shared by every pricing stage so the excl/incl paths cannot drift.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rounding {
    policy: RoundingPolicy,
    midpoint: MidpointRounding,
}

impl Rounding {
    pub fn new(policy: RoundingPolicy, midpoint: MidpointRounding) -> Self {
        Self { policy, midpoint }
    }

    pub fn policy(&self) -> RoundingPolicy {
        self.policy
    }

    /// Applied to intermediate values.
    pub fn stage(&self, value: Decimal) -> Decimal {
        match self.policy {
            RoundingPolicy::EveryStage => self.round(value),
            RoundingPolicy::FinalOnly => value,
        }
    }

    /// Applied to every figure a stage returns.
    pub fn round(&self, value: Decimal) -> Decimal {
        let strategy = match self.midpoint {
            MidpointRounding::NearestEven => RoundingStrategy::MidpointNearestEven,
            MidpointRounding::AwayFromZero => RoundingStrategy::MidpointAwayFromZero,
        };
        value.round_dp_with_strategy(MONEY_DECIMALS, strategy)
    }
}
