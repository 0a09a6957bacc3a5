use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ShippingConfig, TaxConfig};
use crate::domain::cart::{Cart, TaxCategoryId};
use crate::domain::discount::{Discount, DiscountType};
use crate::pricing::context::{split_tax, PricingContext};
use crate::pricing::discounts::DiscountSelector;
use crate::pricing::rounding::Rounding;
use crate::pricing::services::{ShippingSource, TaxResolver};
use crate::pricing::subtotal::SubtotalResult;
use crate::pricing::tax::{resolve_tax_category, TaxAggregator};
use crate::pricing::{Resolution, UnresolvableReason};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreeShippingReason {
    CustomerRole,
    NoShippingRequired,
    AllItemsShipFree,
    SubtotalThreshold,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingTotal {
    pub base_rate: Decimal,
    pub additional_charge: Decimal,
    pub discount_amount: Decimal,
    pub applied_discount: Option<Discount>,
    pub excl_tax: Decimal,
    pub incl_tax: Decimal,
    pub tax_rate: Decimal,
    pub tax_category: Option<TaxCategoryId>,
    pub free_shipping: Option<FreeShippingReason>,
}

impl ShippingTotal {
    fn free(reason: FreeShippingReason) -> Self {
        Self {
            base_rate: Decimal::ZERO,
            additional_charge: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            applied_discount: None,
            excl_tax: Decimal::ZERO,
            incl_tax: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            tax_category: None,
            free_shipping: Some(reason),
        }
    }

    pub fn amount(&self, including_tax: bool) -> Decimal {
        if including_tax {
            self.incl_tax
        } else {
            self.excl_tax
        }
    }

    pub fn tax_amount(&self) -> Decimal {
        self.incl_tax - self.excl_tax
    }

    pub fn record_tax(&self, aggregator: &mut TaxAggregator) {
        aggregator.add_shipping_tax(self.tax_amount(), self.tax_rate);
    }
}

struct BaseRate {
    rate: Decimal,
    ignore_additional_charges: bool,
}

pub struct ShippingTotalEngine<'a> {
    shipping: &'a dyn ShippingSource,
    tax: &'a dyn TaxResolver,
    selector: DiscountSelector<'a>,
    rounding: Rounding,
    shipping_config: &'a ShippingConfig,
    tax_config: &'a TaxConfig,
}

impl<'a> ShippingTotalEngine<'a> {
    pub fn new(
        shipping: &'a dyn ShippingSource,
        tax: &'a dyn TaxResolver,
        selector: DiscountSelector<'a>,
        rounding: Rounding,
        shipping_config: &'a ShippingConfig,
        tax_config: &'a TaxConfig,
    ) -> Self {
        Self { shipping, tax, selector, rounding, shipping_config, tax_config }
    }

    pub fn compute(
        &self,
        cart: &Cart,
        context: &mut PricingContext,
        subtotal: &SubtotalResult,
    ) -> Resolution<ShippingTotal> {
        context.ensure_current(cart, self.tax);

        if let Some(reason) = self.free_shipping_reason(cart, subtotal) {
            debug!(
                event_name = "pricing.shipping.free",
                pass_id = %context.pass_id(),
                cart_id = %cart.id.0,
                reason = ?reason,
                "shipping is free"
            );
            return Resolution::Resolved(ShippingTotal::free(reason));
        }

        let base = match self.base_rate(cart) {
            Ok(base) => base,
            Err(reason) => {
                warn!(
                    event_name = "pricing.shipping.unresolvable",
                    pass_id = %context.pass_id(),
                    cart_id = %cart.id.0,
                    reason = ?reason,
                    "shipping total cannot be computed"
                );
                return Resolution::Unresolvable(reason);
            }
        };

        let rounding = &self.rounding;
        let base_rate = rounding.stage(base.rate.max(Decimal::ZERO));
        let additional_charge = if base.ignore_additional_charges {
            Decimal::ZERO
        } else {
            rounding.stage(additional_shipping_charge(cart))
        };
        let adjusted = base_rate + additional_charge;

        let preferred =
            self.selector.select_preferred(DiscountType::Shipping, &cart.customer, adjusted);
        let discount_amount = rounding.stage(preferred.amount.min(adjusted));
        let amount = rounding.round((adjusted - discount_amount).max(Decimal::ZERO));

        let (excl_tax, incl_tax, tax_rate, tax_category) =
            if self.tax_config.shipping_is_taxable && !context.is_vat_exempt() {
                let configured = self.tax_config.shipping_tax_category.clone().map(TaxCategoryId);
                let category = resolve_tax_category(
                    self.tax_config.auxiliary_services_taxing,
                    cart,
                    context,
                    self.tax,
                    rounding,
                    configured.as_ref(),
                );
                let (excl, incl, rate) =
                    split_tax(self.tax, cart, amount, category.as_ref(), false, rounding);
                (rounding.round(excl), rounding.round(incl), rate, category)
            } else {
                (amount, amount, Decimal::ZERO, None)
            };

        debug!(
            event_name = "pricing.shipping.computed",
            pass_id = %context.pass_id(),
            cart_id = %cart.id.0,
            excl_tax = %excl_tax,
            incl_tax = %incl_tax,
            "shipping total computed"
        );

        Resolution::Resolved(ShippingTotal {
            base_rate: rounding.round(base_rate),
            additional_charge: rounding.round(additional_charge),
            discount_amount: rounding.round(discount_amount),
            applied_discount: preferred.discount.filter(|_| discount_amount > Decimal::ZERO),
            excl_tax,
            incl_tax,
            tax_rate,
            tax_category,
            free_shipping: None,
        })
    }

    fn free_shipping_reason(
        &self,
        cart: &Cart,
        subtotal: &SubtotalResult,
    ) -> Option<FreeShippingReason> {
        if cart.customer.free_shipping {
            return Some(FreeShippingReason::CustomerRole);
        }

        if !cart.requires_shipping() {
            return Some(FreeShippingReason::NoShippingRequired);
        }
        if cart.shippable_units().iter().all(|unit| unit.line.is_free_shipping) {
            return Some(FreeShippingReason::AllItemsShipFree);
        }

        let config = self.shipping_config;
        if config.free_shipping_over_enabled {
            let subtotal = subtotal.after_discount(config.free_shipping_over_including_tax);
            if subtotal > config.free_shipping_over_value {
                return Some(FreeShippingReason::SubtotalThreshold);
            }
        }

        None
    }

    fn base_rate(&self, cart: &Cart) -> Result<BaseRate, UnresolvableReason> {
        let base = self.resolve_rate(cart)?;
        let shipments = Decimal::from(cart.shipment_count().max(1));
        Ok(BaseRate { rate: base.rate * shipments, ..base })
    }

    fn resolve_rate(&self, cart: &Cart) -> Result<BaseRate, UnresolvableReason> {
        if let Some(option) = self.shipping.selected_shipping_option(&cart.customer, &cart.store_id)
        {
            return Ok(BaseRate {
                rate: option.rate,
                ignore_additional_charges: option.ignore_additional_charges,
            });
        }

        let providers = self.shipping.active_fixed_rate_providers(&cart.store_id);
        match providers.as_slice() {
            [provider] => Ok(BaseRate {
                rate: provider.rate,
                ignore_additional_charges: provider.ignore_additional_charges,
            }),
            [] => Err(UnresolvableReason::NoShippingProvider),
            _ => Err(UnresolvableReason::AmbiguousShippingProviders { active: providers.len() }),
        }
    }
}

/// Per-item surcharges of every shippable line that does not ship free.
pub fn additional_shipping_charge(cart: &Cart) -> Decimal {
    cart.shippable_units()
        .iter()
        .filter(|unit| !unit.line.is_free_shipping)
        .map(|unit| unit.line.additional_shipping_charge * Decimal::from(unit.units))
        .sum()
}
