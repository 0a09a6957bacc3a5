use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiscountId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    OrderSubtotal,
    Shipping,
    OrderTotal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountRule {
    Amount {
        amount: Decimal,
    },
    /// `percentage` is expressed in percent, so `10` takes ten percent off.
    Percentage {
        percentage: Decimal,
        #[serde(default)]
        maximum_amount: Option<Decimal>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub name: String,
    pub discount_type: DiscountType,
    pub rule: DiscountRule,
}

impl Discount {
    /// Reduction this discount grants against `base_amount`, clamped to `[0, base_amount]`.
    pub fn amount_for(&self, base_amount: Decimal) -> Decimal {
        let base_amount = base_amount.max(Decimal::ZERO);
        let raw = match &self.rule {
            DiscountRule::Amount { amount } => *amount,
            DiscountRule::Percentage { percentage, maximum_amount } => {
                let computed = base_amount * *percentage / Decimal::ONE_HUNDRED;
                match maximum_amount {
                    Some(cap) => computed.min(*cap),
                    None => computed,
                }
            }
        };

        raw.max(Decimal::ZERO).min(base_amount)
    }
}
