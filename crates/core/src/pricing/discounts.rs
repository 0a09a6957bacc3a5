use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::customer::Customer;
use crate::domain::discount::{Discount, DiscountType};
use crate::pricing::rounding::Rounding;
use crate::pricing::services::DiscountSource;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreferredDiscount {
    pub discount: Option<Discount>,
    pub amount: Decimal,
}

pub struct DiscountSelector<'a> {
    source: &'a dyn DiscountSource,
    rounding: Rounding,
}

impl<'a> DiscountSelector<'a> {
    pub fn new(source: &'a dyn DiscountSource, rounding: Rounding) -> Self {
        Self { source, rounding }
    }

    /// Picks the valid discount of `discount_type` with the largest reduction on `base_amount`.
    pub fn select_preferred(
        &self,
        discount_type: DiscountType,
        customer: &Customer,
        base_amount: Decimal,
    ) -> PreferredDiscount {
        let candidates: Vec<Discount> = self
            .source
            .discounts(discount_type)
            .into_iter()
            .filter(|discount| discount.discount_type == discount_type)
            .filter(|discount| self.source.is_discount_valid(discount, customer))
            .collect();

        let preferred = preferred_discount(&candidates, base_amount, &self.rounding);
        debug!(
            event_name = "pricing.discount.selected",
            discount_type = ?discount_type,
            candidates = candidates.len(),
            discount_id = preferred.discount.as_ref().map(|d| d.id.0.as_str()).unwrap_or("none"),
            amount = %preferred.amount,
            "preferred discount resolved"
        );
        preferred
    }
}

/// Maximum-benefit choice among already-validated candidates.
///
/// Equal amounts go to the lexicographically smallest discount id so the
/// outcome never depends on repository ordering. A best amount of zero
/// selects nothing.
pub fn preferred_discount(
    candidates: &[Discount],
    base_amount: Decimal,
    rounding: &Rounding,
) -> PreferredDiscount {
    let base_amount = base_amount.max(Decimal::ZERO);
    let mut best: Option<(&Discount, Decimal)> = None;

    for candidate in candidates {
        let amount = rounding.stage(candidate.amount_for(base_amount)).min(base_amount);
        best = match best {
            None => Some((candidate, amount)),
            Some((current, current_amount)) => {
                let wins = amount > current_amount
                    || (amount == current_amount && candidate.id < current.id);
                if wins {
                    Some((candidate, amount))
                } else {
                    Some((current, current_amount))
                }
            }
        };
    }

    match best {
        Some((discount, amount)) if amount > Decimal::ZERO => {
            PreferredDiscount { discount: Some(discount.clone()), amount }
        }
        _ => PreferredDiscount::default(),
    }
}
