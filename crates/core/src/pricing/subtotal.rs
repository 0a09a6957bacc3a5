use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::cart::Cart;
use crate::domain::discount::{Discount, DiscountType};
use crate::pricing::context::{classify_lines, split_tax, PricingContext};
use crate::pricing::discounts::DiscountSelector;
use crate::pricing::rounding::Rounding;
use crate::pricing::services::TaxResolver;
use crate::pricing::tax::TaxBucket;

/// Every subtotal figure a caller may need, in both tax modes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtotalResult {
    pub excl_tax_before_discount: Decimal,
    pub incl_tax_before_discount: Decimal,
    /// Discount in exclusive-tax terms.
    pub discount_amount: Decimal,
    pub discount_amount_incl_tax: Decimal,
    pub applied_discount: Option<Discount>,
    /// Tax per rate after discount proration.
    pub tax_bucket: TaxBucket,
    pub excl_tax_after_discount: Decimal,
    pub incl_tax_after_discount: Decimal,
}

impl SubtotalResult {
    pub fn before_discount(&self, including_tax: bool) -> Decimal {
        if including_tax {
            self.incl_tax_before_discount
        } else {
            self.excl_tax_before_discount
        }
    }

    pub fn after_discount(&self, including_tax: bool) -> Decimal {
        if including_tax {
            self.incl_tax_after_discount
        } else {
            self.excl_tax_after_discount
        }
    }

    pub fn discount(&self, including_tax: bool) -> Decimal {
        if including_tax {
            self.discount_amount_incl_tax
        } else {
            self.discount_amount
        }
    }

    pub fn tax_total(&self) -> Decimal {
        self.tax_bucket.total()
    }
}

pub struct SubtotalEngine<'a> {
    tax: &'a dyn TaxResolver,
    selector: DiscountSelector<'a>,
    rounding: Rounding,
}

impl<'a> SubtotalEngine<'a> {
    pub fn new(tax: &'a dyn TaxResolver, selector: DiscountSelector<'a>, rounding: Rounding) -> Self {
        Self { tax, selector, rounding }
    }

    pub fn compute(&self, cart: &Cart, context: &mut PricingContext) -> SubtotalResult {
        context.ensure_current(cart, self.tax);
        let vat_exempt = context.is_vat_exempt();
        let rounding = &self.rounding;

        // Accumulate every line before any proration happens.
        let mut excl_total = Decimal::ZERO;
        let mut incl_total = Decimal::ZERO;
        let mut bucket = TaxBucket::new();

        let line_taxes = classify_lines(cart, self.tax, vat_exempt, rounding);
        for info in &line_taxes {
            excl_total += info.subtotal_excl_tax;
            incl_total += info.subtotal_incl_tax;
            bucket.accumulate(info.tax_rate, info.tax_amount());
        }
        context.record_line_taxes(line_taxes);

        for attribute in &cart.checkout_attributes {
            let amount = rounding.stage(attribute.price_adjustment);
            let (excl, incl, rate) = split_tax(
                self.tax,
                cart,
                amount,
                attribute.tax_category.as_ref(),
                vat_exempt,
                rounding,
            );
            excl_total += excl;
            incl_total += incl;
            bucket.accumulate(rate, incl - excl);
        }

        let excl_total = rounding.stage(excl_total.max(Decimal::ZERO));
        let incl_total = rounding.stage(incl_total.max(Decimal::ZERO));

        let preferred =
            self.selector.select_preferred(DiscountType::OrderSubtotal, &cart.customer, excl_total);
        let discount_amount = rounding.stage(preferred.amount.min(excl_total));

        let mut discount_incl_tax = discount_amount;
        if discount_amount > Decimal::ZERO && !excl_total.is_zero() {
            let share = discount_amount / excl_total;
            let rates: Vec<(Decimal, Decimal)> = bucket.iter().collect();
            for (rate, tax_amount) in rates {
                let discount_tax = tax_amount * share;
                discount_incl_tax += discount_tax;
                bucket.set(rate, rounding.stage(tax_amount - discount_tax));
            }
        }

        let bucket = if bucket.is_empty() { TaxBucket::zero() } else { bucket.rounded(rounding) };
        let excl_after = rounding.round((excl_total - discount_amount).max(Decimal::ZERO));
        let incl_after = excl_after + bucket.total();

        debug!(
            event_name = "pricing.subtotal.computed",
            pass_id = %context.pass_id(),
            cart_id = %cart.id.0,
            excl_tax = %excl_after,
            incl_tax = %incl_after,
            discount = %discount_amount,
            "subtotal computed"
        );

        SubtotalResult {
            excl_tax_before_discount: rounding.round(excl_total),
            incl_tax_before_discount: rounding.round(incl_total),
            discount_amount: rounding.round(discount_amount),
            discount_amount_incl_tax: rounding.round(discount_incl_tax),
            applied_discount: preferred.discount.filter(|_| discount_amount > Decimal::ZERO),
            tax_bucket: bucket,
            excl_tax_after_discount: excl_after,
            incl_tax_after_discount: incl_after,
        }
    }
}
