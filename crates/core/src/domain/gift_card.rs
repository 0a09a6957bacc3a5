use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GiftCardId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftCard {
    pub id: GiftCardId,
    pub code: String,
    pub remaining_balance: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// A gift card with the part of its balance this order consumes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedGiftCard {
    pub gift_card: GiftCard,
    pub amount_used: Decimal,
}

impl AppliedGiftCard {
    pub fn balance_left(&self) -> Decimal {
        (self.gift_card.remaining_balance - self.amount_used).max(Decimal::ZERO)
    }
}
