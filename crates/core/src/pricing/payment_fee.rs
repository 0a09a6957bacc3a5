use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::TaxConfig;
use crate::domain::cart::{Cart, TaxCategoryId};
use crate::domain::shipping::PaymentFee;
use crate::pricing::context::{split_tax, PricingContext};
use crate::pricing::rounding::Rounding;
use crate::pricing::services::TaxResolver;
use crate::pricing::subtotal::SubtotalResult;
use crate::pricing::tax::{resolve_tax_category, TaxAggregator};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFeeTotal {
    pub excl_tax: Decimal,
    pub incl_tax: Decimal,
    pub tax_rate: Decimal,
    pub tax_category: Option<TaxCategoryId>,
}

impl PaymentFeeTotal {
    pub fn amount(&self, including_tax: bool) -> Decimal {
        if including_tax {
            self.incl_tax
        } else {
            self.excl_tax
        }
    }

    pub fn record_tax(&self, aggregator: &mut TaxAggregator) {
        aggregator.add_payment_fee_tax(self.incl_tax - self.excl_tax, self.tax_rate);
    }
}

/// Splits the payment method's additional fee into its tax variants.
///
/// Percentage fees apply to the discounted exclusive subtotal. Taxing follows
/// the same auxiliary-category rules as shipping.
pub fn compute_payment_fee(
    fee: &PaymentFee,
    cart: &Cart,
    context: &mut PricingContext,
    subtotal: &SubtotalResult,
    tax: &dyn TaxResolver,
    tax_config: &TaxConfig,
    rounding: &Rounding,
) -> PaymentFeeTotal {
    let base = if fee.use_percentage {
        subtotal.excl_tax_after_discount * fee.amount / Decimal::ONE_HUNDRED
    } else {
        fee.amount
    };
    let amount = rounding.round(base.max(Decimal::ZERO));
    if amount.is_zero() {
        return PaymentFeeTotal::default();
    }

    if !tax_config.payment_fee_is_taxable || context.is_vat_exempt() {
        return PaymentFeeTotal {
            excl_tax: amount,
            incl_tax: amount,
            tax_rate: Decimal::ZERO,
            tax_category: None,
        };
    }

    let configured = tax_config.payment_fee_tax_category.clone().map(TaxCategoryId);
    let category = resolve_tax_category(
        tax_config.auxiliary_services_taxing,
        cart,
        context,
        tax,
        rounding,
        configured.as_ref(),
    );
    let (excl, incl, rate) = split_tax(tax, cart, amount, category.as_ref(), false, rounding);
    PaymentFeeTotal {
        excl_tax: rounding.round(excl),
        incl_tax: rounding.round(incl),
        tax_rate: rate,
        tax_category: category,
    }
}
