use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::gift_card::{AppliedGiftCard, GiftCard};
use crate::pricing::rounding::Rounding;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftCardApplication {
    pub remaining_total: Decimal,
    pub applied: Vec<AppliedGiftCard>,
}

impl GiftCardApplication {
    pub fn amount_used(&self) -> Decimal {
        self.applied.iter().map(|card| card.amount_used).sum()
    }
}

/// Consumes gift card balances against a payable total.
#[derive(Clone, Copy, Debug, Default)]
pub struct GiftCardLedger {
    rounding: Rounding,
}

impl GiftCardLedger {
    pub fn new(rounding: Rounding) -> Self {
        Self { rounding }
    }

    /// Cards are consumed oldest first (`created_at`, then id). Every active
    /// card is recorded, including those left untouched once the total hits zero.
    pub fn apply(&self, remaining_total: Decimal, mut cards: Vec<GiftCard>) -> GiftCardApplication {
        cards.retain(|card| card.is_active);
        cards.sort_by(|left, right| {
            left.created_at.cmp(&right.created_at).then_with(|| left.id.cmp(&right.id))
        });

        let mut remaining = self.rounding.stage(remaining_total.max(Decimal::ZERO));
        let mut applied = Vec::with_capacity(cards.len());
        for card in cards {
            let balance = card.remaining_balance.max(Decimal::ZERO);
            let used = self.rounding.stage(balance.min(remaining));
            remaining -= used;
            applied.push(AppliedGiftCard { gift_card: card, amount_used: used });
        }

        GiftCardApplication { remaining_total: self.rounding.round(remaining), applied }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::GiftCardLedger;
    use crate::domain::gift_card::{GiftCard, GiftCardId};
    use crate::pricing::rounding::Rounding;

    fn card(id: &str, balance: i64, age_days: i64) -> GiftCard {
        let issued = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("valid date");
        GiftCard {
            id: GiftCardId(id.to_string()),
            code: format!("GC-{id}"),
            remaining_balance: Decimal::new(balance, 2),
            is_active: true,
            created_at: issued - Duration::days(age_days),
        }
    }

    #[test]
    fn consumes_cards_sequentially_until_total_is_covered() {
        let ledger = GiftCardLedger::new(Rounding::default());
        let result =
            ledger.apply(Decimal::new(5000, 2), vec![card("one", 3000, 10), card("two", 4000, 5)]);

        assert_eq!(result.remaining_total, Decimal::ZERO);
        assert_eq!(result.applied[0].amount_used, Decimal::new(3000, 2));
        assert_eq!(result.applied[1].amount_used, Decimal::new(2000, 2));
        assert_eq!(result.applied[1].balance_left(), Decimal::new(2000, 2));
    }

    #[test]
    fn oldest_card_is_consumed_first() {
        let ledger = GiftCardLedger::new(Rounding::default());
        let result =
            ledger.apply(Decimal::new(1000, 2), vec![card("new", 5000, 1), card("old", 5000, 30)]);

        assert_eq!(result.applied[0].gift_card.id.0, "old");
        assert_eq!(result.applied[0].amount_used, Decimal::new(1000, 2));
        assert_eq!(result.applied[1].amount_used, Decimal::ZERO);
    }

    #[test]
    fn remaining_total_stays_within_bounds() {
        let ledger = GiftCardLedger::new(Rounding::default());
        let mut inactive = card("inactive", 9000, 40);
        inactive.is_active = false;
        let start = Decimal::new(2599, 2);
        let result = ledger.apply(start, vec![card("a", 1000, 3), inactive, card("b", -500, 2)]);

        assert!(result.remaining_total >= Decimal::ZERO && result.remaining_total <= start);
        assert_eq!(result.amount_used(), start - result.remaining_total);
        assert_eq!(result.applied.len(), 2);
    }
}
