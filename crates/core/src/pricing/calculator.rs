use tracing::debug;

use crate::config::AppConfig;
use crate::domain::cart::Cart;
use crate::pricing::context::PricingContext;
use crate::pricing::discounts::DiscountSelector;
use crate::pricing::payment_fee::{compute_payment_fee, PaymentFeeTotal};
use crate::pricing::rounding::Rounding;
use crate::pricing::services::Collaborators;
use crate::pricing::shipping::{ShippingTotal, ShippingTotalEngine};
use crate::pricing::subtotal::{SubtotalEngine, SubtotalResult};
use crate::pricing::tax::{TaxAggregator, TaxTotalResult};
use crate::pricing::total::{OrderTotalResult, StageTotals, TotalAssembler};
use crate::pricing::Resolution;

/// Prices a cart end to end.
pub trait PricingEngine: Send + Sync {
    fn price(&self, cart: &Cart) -> Resolution<OrderTotalResult>;
}

/// Engine backed by configuration and a fixed set of collaborators.
pub struct DeterministicPricingEngine<'a> {
    config: &'a AppConfig,
    services: Collaborators<'a>,
}

impl<'a> DeterministicPricingEngine<'a> {
    pub fn new(config: &'a AppConfig, services: Collaborators<'a>) -> Self {
        Self { config, services }
    }
}

impl PricingEngine for DeterministicPricingEngine<'_> {
    fn price(&self, cart: &Cart) -> Resolution<OrderTotalResult> {
        OrderTotalCalculator::new(self.config, self.services).compute_grand_total(cart)
    }
}

/// Entry point for every pricing stage.
///
/// Each `compute_*` call opens a fresh [`PricingContext`]; the `*_in` variants
/// share one context so a single pass classifies lines only once.
pub struct OrderTotalCalculator<'a> {
    config: &'a AppConfig,
    services: Collaborators<'a>,
    rounding: Rounding,
}

impl<'a> OrderTotalCalculator<'a> {
    pub fn new(config: &'a AppConfig, services: Collaborators<'a>) -> Self {
        let rounding = Rounding::new(config.pricing.rounding, config.pricing.midpoint);
        Self { config, services, rounding }
    }

    pub fn rounding(&self) -> Rounding {
        self.rounding
    }

    pub fn new_context(&self, cart: &Cart) -> PricingContext {
        let context = PricingContext::new(cart, self.services.tax);
        debug!(
            event_name = "pricing.context.created",
            pass_id = %context.pass_id(),
            cart_id = %cart.id.0,
            vat_exempt = context.is_vat_exempt(),
            "pricing pass started"
        );
        context
    }

    pub fn compute_subtotal(&self, cart: &Cart) -> SubtotalResult {
        let mut context = self.new_context(cart);
        self.compute_subtotal_in(cart, &mut context)
    }

    pub fn compute_shipping_total(&self, cart: &Cart) -> Resolution<ShippingTotal> {
        let mut context = self.new_context(cart);
        let subtotal = self.compute_subtotal_in(cart, &mut context);
        self.compute_shipping_total_in(cart, &mut context, &subtotal)
    }

    pub fn compute_tax_total(&self, cart: &Cart, use_payment_fee: bool) -> TaxTotalResult {
        let mut context = self.new_context(cart);
        let subtotal = self.compute_subtotal_in(cart, &mut context);
        let shipping = self.compute_shipping_total_in(cart, &mut context, &subtotal);
        let payment_fee = if use_payment_fee {
            self.compute_payment_fee_in(cart, &mut context, &subtotal)
        } else {
            PaymentFeeTotal::default()
        };
        self.aggregate_tax(&context, &subtotal, shipping.as_resolved(), &payment_fee)
    }

    pub fn compute_grand_total(&self, cart: &Cart) -> Resolution<OrderTotalResult> {
        let mut context = self.new_context(cart);
        self.compute_grand_total_in(cart, &mut context)
    }

    pub fn compute_subtotal_in(&self, cart: &Cart, context: &mut PricingContext) -> SubtotalResult {
        context.ensure_current(cart, self.services.tax);
        SubtotalEngine::new(self.services.tax, self.selector(), self.rounding).compute(cart, context)
    }

    pub fn compute_shipping_total_in(
        &self,
        cart: &Cart,
        context: &mut PricingContext,
        subtotal: &SubtotalResult,
    ) -> Resolution<ShippingTotal> {
        context.ensure_current(cart, self.services.tax);
        ShippingTotalEngine::new(
            self.services.shipping,
            self.services.tax,
            self.selector(),
            self.rounding,
            &self.config.shipping,
            &self.config.tax,
        )
        .compute(cart, context, subtotal)
    }

    pub fn compute_payment_fee_in(
        &self,
        cart: &Cart,
        context: &mut PricingContext,
        subtotal: &SubtotalResult,
    ) -> PaymentFeeTotal {
        context.ensure_current(cart, self.services.tax);
        let fee = self.services.payment_fees.additional_fee(cart);
        compute_payment_fee(
            &fee,
            cart,
            context,
            subtotal,
            self.services.tax,
            &self.config.tax,
            &self.rounding,
        )
    }

    pub fn compute_grand_total_in(
        &self,
        cart: &Cart,
        context: &mut PricingContext,
    ) -> Resolution<OrderTotalResult> {
        let subtotal = self.compute_subtotal_in(cart, context);
        let shipping = self.compute_shipping_total_in(cart, context, &subtotal);
        let payment_fee = self.compute_payment_fee_in(cart, context, &subtotal);
        let tax = self.aggregate_tax(context, &subtotal, shipping.as_resolved(), &payment_fee);

        TotalAssembler::new(
            self.selector(),
            self.services.gift_cards,
            self.services.reward_points,
            &self.config.reward_points,
            self.rounding,
            self.config.pricing.display_including_tax,
        )
        .assemble(cart, context, StageTotals { subtotal, shipping, payment_fee, tax })
    }

    fn aggregate_tax(
        &self,
        context: &PricingContext,
        subtotal: &SubtotalResult,
        shipping: Option<&ShippingTotal>,
        payment_fee: &PaymentFeeTotal,
    ) -> TaxTotalResult {
        let mut aggregator = TaxAggregator::new(context.is_vat_exempt());
        for (rate, amount) in subtotal.tax_bucket.iter() {
            aggregator.add_subtotal_tax(amount, rate);
        }
        if let Some(shipping) = shipping {
            shipping.record_tax(&mut aggregator);
        }
        payment_fee.record_tax(&mut aggregator);

        let result = aggregator.finish(&self.rounding);
        debug!(
            event_name = "pricing.tax.aggregated",
            pass_id = %context.pass_id(),
            total = %result.total,
            rates = result.bucket.len(),
            "tax aggregated"
        );
        result
    }

    fn selector(&self) -> DiscountSelector<'a> {
        DiscountSelector::new(self.services.discounts, self.rounding)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{DeterministicPricingEngine, OrderTotalCalculator, PricingEngine};
    use crate::config::AppConfig;
    use crate::domain::shipping::{FixedRateProvider, PaymentFee};
    use crate::pricing::services::Collaborators;
    use crate::pricing::UnresolvableReason;
    use crate::store::test_support::{cart_with_lines, line, store_with_rate};
    use crate::store::InMemoryStore;

    fn store() -> InMemoryStore {
        let mut store = store_with_rate("standard", Decimal::new(10, 2));
        store.fixed_rate_providers.push(FixedRateProvider {
            system_name: "flat".to_string(),
            rate: Decimal::new(500, 2),
            ignore_additional_charges: false,
        });
        store
    }

    #[test]
    fn grand_total_adds_shipping_and_tax() {
        let store = store();
        let config = AppConfig::default();
        let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
        let cart = cart_with_lines(vec![line("a", 2, Decimal::new(1000, 2))]);

        let result = calculator.compute_grand_total(&cart).resolved().expect("resolvable");

        assert_eq!(result.subtotal.excl_tax_after_discount, Decimal::new(2000, 2));
        assert_eq!(result.shipping.excl_tax, Decimal::new(500, 2));
        assert_eq!(result.tax.total, Decimal::new(200, 2));
        assert_eq!(result.total, Decimal::new(2700, 2));
        assert_eq!(result.trace.step("total").map(|step| step.amount), Some(result.total));
    }

    #[test]
    fn tax_total_includes_payment_fee_only_on_request() {
        let mut store = store();
        store.payment_fee = PaymentFee { amount: Decimal::new(300, 2), use_percentage: false };
        let mut config = AppConfig::default();
        config.tax.payment_fee_is_taxable = true;
        config.tax.payment_fee_tax_category = Some("standard".to_string());
        let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
        let cart = cart_with_lines(vec![line("a", 1, Decimal::new(1000, 2))]);

        let without_fee = calculator.compute_tax_total(&cart, false);
        let with_fee = calculator.compute_tax_total(&cart, true);

        assert_eq!(without_fee.total, Decimal::new(100, 2));
        assert_eq!(with_fee.total, Decimal::new(130, 2));
        assert_eq!(with_fee.payment_fee_tax, Decimal::new(30, 2));
    }

    #[test]
    fn tax_total_is_available_when_shipping_is_not() {
        let store = store_with_rate("standard", Decimal::new(10, 2));
        let config = AppConfig::default();
        let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
        let cart = cart_with_lines(vec![line("a", 1, Decimal::new(1000, 2))]);

        assert_eq!(
            calculator.compute_shipping_total(&cart).resolved(),
            None,
            "no provider is configured"
        );
        assert_eq!(calculator.compute_tax_total(&cart, false).total, Decimal::new(100, 2));
        assert_eq!(
            DeterministicPricingEngine::new(&config, Collaborators::from_store(&store)).price(&cart),
            crate::pricing::Resolution::Unresolvable(UnresolvableReason::NoShippingProvider)
        );
    }
}
