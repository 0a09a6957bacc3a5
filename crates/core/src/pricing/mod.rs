pub mod calculator;
pub mod context;
pub mod discounts;
pub mod gift_cards;
pub mod payment_fee;
pub mod reward_points;
pub mod rounding;
pub mod services;
pub mod shipping;
pub mod subtotal;
pub mod tax;
pub mod total;
pub mod trace;

use serde::{Deserialize, Serialize};

pub use calculator::{DeterministicPricingEngine, OrderTotalCalculator, PricingEngine};
pub use context::PricingContext;
pub use rounding::{MidpointRounding, Rounding, RoundingPolicy};
pub use services::Collaborators;
pub use shipping::ShippingTotal;
pub use subtotal::SubtotalResult;
pub use tax::{AuxiliaryTaxingStrategy, TaxBucket, TaxTotalResult};
pub use total::OrderTotalResult;

/// Outcome of a stage that may legitimately have no answer yet.
///
/// Carts whose shipping cannot be priced are a normal checkout state, so they
/// surface here instead of as an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Resolution<T> {
    Resolved(T),
    Unresolvable(UnresolvableReason),
}

impl<T> Resolution<T> {
    pub fn resolved(self) -> Option<T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Unresolvable(_) => None,
        }
    }

    pub fn as_resolved(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Unresolvable(_) => None,
        }
    }

    pub fn is_resolvable(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Self::Resolved(value) => Resolution::Resolved(f(value)),
            Self::Unresolvable(reason) => Resolution::Unresolvable(reason),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnresolvableReason {
    /// No shipping option is selected and no rate provider is active.
    NoShippingProvider,
    /// No option is selected and several providers could quote a rate.
    AmbiguousShippingProviders { active: usize },
}

impl std::fmt::Display for UnresolvableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoShippingProvider => write!(f, "no shipping option or rate provider available"),
            Self::AmbiguousShippingProviders { active } => {
                write!(f, "{active} active shipping rate providers and no selected option")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Resolution, UnresolvableReason};

    #[test]
    fn map_preserves_unresolvable_reason() {
        let unresolved: Resolution<u32> =
            Resolution::Unresolvable(UnresolvableReason::AmbiguousShippingProviders { active: 3 });
        let mapped = unresolved.map(|value| value * 2);

        assert!(!mapped.is_resolvable());
        assert_eq!(
            mapped,
            Resolution::Unresolvable(UnresolvableReason::AmbiguousShippingProviders { active: 3 })
        );
        assert_eq!(Resolution::Resolved(2).map(|value| value * 2).resolved(), Some(4));
    }

    #[test]
    fn unresolvable_serializes_with_reason_tag() {
        let value: Resolution<u32> = Resolution::Unresolvable(UnresolvableReason::NoShippingProvider);
        let json = serde_json::to_value(&value).expect("serialize");
        assert_eq!(json["status"], "unresolvable");
        assert_eq!(json["value"]["reason"], "no_shipping_provider");
    }
}
