use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::RewardPointsConfig;
use crate::domain::cart::Cart;
use crate::domain::discount::{Discount, DiscountType};
use crate::domain::gift_card::AppliedGiftCard;
use crate::pricing::context::PricingContext;
use crate::pricing::discounts::DiscountSelector;
use crate::pricing::gift_cards::GiftCardLedger;
use crate::pricing::payment_fee::PaymentFeeTotal;
use crate::pricing::reward_points::{Redemption, RewardPointsAccount, RewardPointsConverter};
use crate::pricing::rounding::Rounding;
use crate::pricing::services::{GiftCardSource, RewardPointsSource};
use crate::pricing::shipping::ShippingTotal;
use crate::pricing::subtotal::SubtotalResult;
use crate::pricing::tax::TaxTotalResult;
use crate::pricing::trace::PricingTrace;
use crate::pricing::Resolution;

/// Everything the order-placement workflow snapshots from one pricing pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotalResult {
    pub subtotal: SubtotalResult,
    pub shipping: ShippingTotal,
    pub payment_fee: PaymentFeeTotal,
    pub tax: TaxTotalResult,
    pub display_including_tax: bool,
    pub order_discount_amount: Decimal,
    pub order_discount: Option<Discount>,
    pub applied_discounts: Vec<Discount>,
    pub applied_gift_cards: Vec<AppliedGiftCard>,
    pub redeemed_points: i64,
    pub redeemed_points_amount: Decimal,
    pub total: Decimal,
    pub trace: PricingTrace,
}

impl OrderTotalResult {
    pub fn subtotal_for_display(&self) -> Decimal {
        self.subtotal.after_discount(self.display_including_tax)
    }

    pub fn shipping_for_display(&self) -> Decimal {
        self.shipping.amount(self.display_including_tax)
    }

    /// Tax bucket in its persisted `"rate:amount; "` form.
    pub fn tax_rates(&self) -> String {
        self.tax.bucket.to_string()
    }
}

/// Stage outputs the assembler folds into a grand total.
pub struct StageTotals {
    pub subtotal: SubtotalResult,
    pub shipping: Resolution<ShippingTotal>,
    pub payment_fee: PaymentFeeTotal,
    pub tax: TaxTotalResult,
}

pub struct TotalAssembler<'a> {
    selector: DiscountSelector<'a>,
    gift_cards: &'a dyn GiftCardSource,
    reward_points: &'a dyn RewardPointsSource,
    reward_config: &'a RewardPointsConfig,
    rounding: Rounding,
    display_including_tax: bool,
}

impl<'a> TotalAssembler<'a> {
    pub fn new(
        selector: DiscountSelector<'a>,
        gift_cards: &'a dyn GiftCardSource,
        reward_points: &'a dyn RewardPointsSource,
        reward_config: &'a RewardPointsConfig,
        rounding: Rounding,
        display_including_tax: bool,
    ) -> Self {
        Self { selector, gift_cards, reward_points, reward_config, rounding, display_including_tax }
    }

    pub fn assemble(
        &self,
        cart: &Cart,
        context: &PricingContext,
        stages: StageTotals,
    ) -> Resolution<OrderTotalResult> {
        let StageTotals { subtotal, shipping, payment_fee, tax } = stages;
        let shipping = match shipping {
            Resolution::Resolved(shipping) => shipping,
            Resolution::Unresolvable(reason) => {
                warn!(
                    event_name = "pricing.total.unresolvable",
                    pass_id = %context.pass_id(),
                    cart_id = %cart.id.0,
                    reason = ?reason,
                    "grand total unavailable until shipping can be computed"
                );
                return Resolution::Unresolvable(reason);
            }
        };

        let rounding = &self.rounding;
        let mut trace =
            PricingTrace::new(context.pass_id(), cart.id.clone(), context.fingerprint());
        trace.record(
            "subtotal",
            "sum of line and checkout attribute prices, excluding tax",
            subtotal.excl_tax_before_discount,
        );
        trace.record("subtotal_discount", "preferred order subtotal discount", subtotal.discount_amount);
        trace.record("shipping", "shipping excluding tax", shipping.excl_tax);
        trace.record("payment_fee", "payment method fee excluding tax", payment_fee.excl_tax);
        trace.record("tax", "subtotal + shipping + payment fee tax", tax.total);

        let running = rounding.stage(
            subtotal.excl_tax_after_discount + shipping.excl_tax + payment_fee.excl_tax + tax.total,
        );

        let preferred =
            self.selector.select_preferred(DiscountType::OrderTotal, &cart.customer, running);
        let order_discount_amount = rounding.stage(preferred.amount.min(running));
        let order_discount = preferred.discount.filter(|_| order_discount_amount > Decimal::ZERO);
        let running = rounding.stage((running - order_discount_amount).max(Decimal::ZERO));
        trace.record("order_discount", "preferred order total discount", order_discount_amount);

        let (running, applied_gift_cards) = if cart.is_recurring {
            (running, Vec::new())
        } else {
            let cards = self.gift_cards.active_gift_cards(&cart.customer, &cart.store_id);
            let application = GiftCardLedger::new(*rounding).apply(running, cards);
            trace.record("gift_cards", "active gift card balances", application.amount_used());
            (application.remaining_total, application.applied)
        };
        let running = rounding.stage(running.max(Decimal::ZERO));

        let redemption = self.redeem_reward_points(cart, running);
        if redemption.points > 0 {
            trace.record(
                "reward_points",
                format!("{} points redeemed", redemption.points),
                redemption.amount,
            );
        }
        let total = rounding.round((running - redemption.amount).max(Decimal::ZERO));
        trace.record("total", "amount payable", total);

        let applied_discounts: Vec<Discount> = [
            subtotal.applied_discount.clone(),
            shipping.applied_discount.clone(),
            order_discount.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        info!(
            event_name = "pricing.total.computed",
            pass_id = %context.pass_id(),
            cart_id = %cart.id.0,
            total = %total,
            discounts = applied_discounts.len(),
            gift_cards = applied_gift_cards.len(),
            redeemed_points = redemption.points,
            "grand total computed"
        );

        Resolution::Resolved(OrderTotalResult {
            subtotal,
            shipping,
            payment_fee,
            tax,
            display_including_tax: self.display_including_tax,
            order_discount_amount: rounding.round(order_discount_amount),
            order_discount,
            applied_discounts,
            applied_gift_cards,
            redeemed_points: redemption.points,
            redeemed_points_amount: redemption.amount,
            total,
            trace,
        })
    }

    fn redeem_reward_points(&self, cart: &Cart, remaining_total: Decimal) -> Redemption {
        if !self.reward_config.enabled || !cart.customer.use_reward_points {
            return Redemption::default();
        }

        let account = RewardPointsAccount {
            balance: self.reward_points.reward_points_balance(&cart.customer),
            exchange_rate: self.reward_config.exchange_rate,
            round_down: self.reward_config.round_down,
        };
        RewardPointsConverter::for_account(&account, self.rounding)
            .redeem(remaining_total, account.balance)
    }
}
