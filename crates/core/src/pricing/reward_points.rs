use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::rounding::Rounding;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPointsAccount {
    pub balance: i64,
    /// Currency amount one point is worth.
    pub exchange_rate: Decimal,
    pub round_down: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub points: i64,
    pub amount: Decimal,
}

#[derive(Clone, Copy, Debug)]
pub struct RewardPointsConverter {
    exchange_rate: Decimal,
    round_down: bool,
    rounding: Rounding,
}

impl RewardPointsConverter {
    pub fn new(exchange_rate: Decimal, round_down: bool, rounding: Rounding) -> Self {
        Self { exchange_rate, round_down, rounding }
    }

    pub fn for_account(account: &RewardPointsAccount, rounding: Rounding) -> Self {
        Self::new(account.exchange_rate, account.round_down, rounding)
    }

    pub fn to_amount(&self, points: i64) -> Decimal {
        if points <= 0 {
            return Decimal::ZERO;
        }
        self.rounding.round(Decimal::from(points) * self.exchange_rate)
    }

    pub fn to_points(&self, amount: Decimal) -> i64 {
        if amount <= Decimal::ZERO || self.exchange_rate <= Decimal::ZERO {
            return 0;
        }

        let exact = amount / self.exchange_rate;
        let points = if self.round_down { exact.floor() } else { exact.ceil() };
        points.to_i64().unwrap_or(i64::MAX)
    }

    /// Sizes a redemption so `remaining_total - amount` never goes below zero.
    pub fn redeem(&self, remaining_total: Decimal, balance: i64) -> Redemption {
        if remaining_total <= Decimal::ZERO || balance <= 0 {
            return Redemption::default();
        }

        let balance_amount = self.to_amount(balance);
        if remaining_total > balance_amount {
            return Redemption { points: balance, amount: balance_amount };
        }

        Redemption { points: self.to_points(remaining_total).min(balance), amount: remaining_total }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Redemption, RewardPointsAccount, RewardPointsConverter};
    use crate::pricing::rounding::Rounding;

    fn converter(round_down: bool) -> RewardPointsConverter {
        RewardPointsConverter::new(Decimal::new(2, 2), round_down, Rounding::default())
    }

    #[test]
    fn converts_points_to_amount() {
        assert_eq!(converter(false).to_amount(1000), Decimal::new(2000, 2));
        assert_eq!(converter(false).to_amount(-5), Decimal::ZERO);
    }

    #[test]
    fn rounding_direction_follows_round_down_flag() {
        let amount = Decimal::new(1001, 2);
        assert_eq!(converter(true).to_points(amount), 500);
        assert_eq!(converter(false).to_points(amount), 501);
        assert_eq!(converter(false).to_points(Decimal::ZERO), 0);
    }

    #[test]
    fn points_survive_a_round_trip_when_rate_divides_evenly() {
        let converter = converter(false);
        for points in [1, 50, 750, 1234] {
            assert_eq!(converter.to_points(converter.to_amount(points)), points);
        }
    }

    #[test]
    fn partial_redemption_covers_exactly_the_remaining_total() {
        let redemption = converter(false).redeem(Decimal::new(1500, 2), 1000);
        assert_eq!(redemption, Redemption { points: 750, amount: Decimal::new(1500, 2) });
    }

    #[test]
    fn full_balance_is_redeemed_when_total_exceeds_it() {
        let redemption = converter(false).redeem(Decimal::new(5000, 2), 1000);
        assert_eq!(redemption, Redemption { points: 1000, amount: Decimal::new(2000, 2) });
    }

    #[test]
    fn partial_redemption_never_spends_more_than_the_balance() {
        let converter =
            RewardPointsConverter::new(Decimal::new(15, 3), false, Rounding::default());
        assert_eq!(converter.to_amount(1), Decimal::new(2, 2));

        let redemption = converter.redeem(Decimal::new(2, 2), 1);
        assert_eq!(redemption, Redemption { points: 1, amount: Decimal::new(2, 2) });
    }

    #[test]
    fn converter_for_account_uses_account_rate() {
        let account = RewardPointsAccount {
            balance: 400,
            exchange_rate: Decimal::new(5, 2),
            round_down: true,
        };
        let redemption = RewardPointsConverter::for_account(&account, Rounding::default())
            .redeem(Decimal::new(1010, 2), account.balance);
        assert_eq!(redemption, Redemption { points: 202, amount: Decimal::new(1010, 2) });
    }

    #[test]
    fn nothing_is_redeemed_against_a_zero_total() {
        assert_eq!(converter(false).redeem(Decimal::ZERO, 1000), Redemption::default());
    }
}
