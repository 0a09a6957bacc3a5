//! In-memory backing for every pricing collaborator, loadable from JSON fixtures.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cart::{Cart, TaxCategoryId};
use crate::domain::customer::{Customer, CustomerId, StoreId};
use crate::domain::discount::{Discount, DiscountId, DiscountType};
use crate::domain::gift_card::GiftCard;
use crate::domain::shipping::{FixedRateProvider, PaymentFee, ShippingOption};
use crate::errors::ApplicationError;
use crate::pricing::services::{
    DiscountSource, GiftCardSource, PaymentFeeSource, RewardPointsSource, ShippingSource,
    TaxResolver, TaxedPrice,
};

/// Catalog, tax, discount and wallet data for a single store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryStore {
    /// Catalog prices already contain tax at their category rate.
    pub prices_include_tax: bool,
    pub tax_rates: BTreeMap<TaxCategoryId, Decimal>,
    pub vat_exempt_customers: BTreeSet<CustomerId>,
    pub discounts: Vec<Discount>,
    /// Discounts listed here are limited to the given customers.
    pub discount_eligibility: BTreeMap<DiscountId, BTreeSet<CustomerId>>,
    pub gift_cards: BTreeMap<CustomerId, Vec<GiftCard>>,
    pub reward_points: BTreeMap<CustomerId, i64>,
    pub selected_shipping_options: BTreeMap<CustomerId, ShippingOption>,
    pub fixed_rate_providers: Vec<FixedRateProvider>,
    pub payment_fee: PaymentFee,
}

impl InMemoryStore {
    pub fn tax_rate(&self, tax_category: Option<&TaxCategoryId>) -> Decimal {
        tax_category.and_then(|category| self.tax_rates.get(category)).copied().unwrap_or_default()
    }
}

impl TaxResolver for InMemoryStore {
    fn resolve_taxed_price(
        &self,
        amount: Decimal,
        including_tax: bool,
        customer: &Customer,
        tax_category: Option<&TaxCategoryId>,
    ) -> TaxedPrice {
        let rate = self.tax_rate(tax_category);
        let net = if self.prices_include_tax {
            amount / (Decimal::ONE + rate)
        } else {
            amount
        };

        if self.is_vat_exempt(customer) {
            return TaxedPrice { amount: net, rate: Decimal::ZERO };
        }
        if !including_tax {
            return TaxedPrice { amount: net, rate };
        }

        let gross = if self.prices_include_tax {
            amount
        } else {
            amount * (Decimal::ONE + rate)
        };
        TaxedPrice { amount: gross, rate }
    }

    fn is_vat_exempt(&self, customer: &Customer) -> bool {
        self.vat_exempt_customers.contains(&customer.id)
    }
}

impl DiscountSource for InMemoryStore {
    fn discounts(&self, discount_type: DiscountType) -> Vec<Discount> {
        self.discounts
            .iter()
            .filter(|discount| discount.discount_type == discount_type)
            .cloned()
            .collect()
    }

    fn is_discount_valid(&self, discount: &Discount, customer: &Customer) -> bool {
        self.discount_eligibility
            .get(&discount.id)
            .map_or(true, |customers| customers.contains(&customer.id))
    }
}

impl GiftCardSource for InMemoryStore {
    fn active_gift_cards(&self, customer: &Customer, _store: &StoreId) -> Vec<GiftCard> {
        self.gift_cards
            .get(&customer.id)
            .map(|cards| cards.iter().filter(|card| card.is_active).cloned().collect())
            .unwrap_or_default()
    }
}

impl RewardPointsSource for InMemoryStore {
    fn reward_points_balance(&self, customer: &Customer) -> i64 {
        self.reward_points.get(&customer.id).copied().unwrap_or_default()
    }
}

impl ShippingSource for InMemoryStore {
    fn selected_shipping_option(
        &self,
        customer: &Customer,
        _store: &StoreId,
    ) -> Option<ShippingOption> {
        self.selected_shipping_options.get(&customer.id).cloned()
    }

    fn active_fixed_rate_providers(&self, _store: &StoreId) -> Vec<FixedRateProvider> {
        self.fixed_rate_providers.clone()
    }
}

impl PaymentFeeSource for InMemoryStore {
    fn additional_fee(&self, _cart: &Cart) -> PaymentFee {
        self.payment_fee.clone()
    }
}

/// A cart together with the store state it should be priced against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingFixture {
    pub cart: Cart,
    #[serde(default)]
    pub store: InMemoryStore,
}

impl PricingFixture {
    pub fn from_json(raw: &str) -> Result<Self, ApplicationError> {
        let fixture: Self = serde_json::from_str(raw)
            .map_err(|error| ApplicationError::Fixture(error.to_string()))?;
        fixture.cart.validate()?;
        Ok(fixture)
    }

    pub fn load(path: &Path) -> Result<Self, ApplicationError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            ApplicationError::Fixture(format!("could not read `{}`: {error}", path.display()))
        })?;
        Self::from_json(&raw)
    }
}


#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::test_support::store_with_rate;
    use super::PricingFixture;
    use crate::domain::cart::TaxCategoryId;
    use crate::domain::customer::Customer;
    use crate::errors::ApplicationError;
    use crate::pricing::services::TaxResolver;

    #[test]
    fn prices_including_tax_are_split_back_to_net() {
        let mut store = store_with_rate("standard", Decimal::new(25, 2));
        store.prices_include_tax = true;
        let customer = Customer::new("c-1");
        let category = TaxCategoryId("standard".to_string());

        let excl = store.resolve_taxed_price(Decimal::new(12_500, 2), false, &customer, Some(&category));
        let incl = store.resolve_taxed_price(Decimal::new(12_500, 2), true, &customer, Some(&category));

        assert_eq!(excl.amount, Decimal::new(10_000, 2));
        assert_eq!(incl.amount, Decimal::new(12_500, 2));
        assert_eq!(incl.rate, Decimal::new(25, 2));
    }

    #[test]
    fn exempt_customer_and_unknown_category_carry_no_rate() {
        let mut store = store_with_rate("standard", Decimal::new(19, 2));
        let customer = Customer::new("exempt");
        store.vat_exempt_customers.insert(customer.id.clone());
        let category = TaxCategoryId("standard".to_string());

        let exempt = store.resolve_taxed_price(Decimal::TEN, true, &customer, Some(&category));
        let untaxed = store.resolve_taxed_price(Decimal::TEN, true, &Customer::new("c-1"), None);

        assert_eq!(exempt.rate, Decimal::ZERO);
        assert_eq!(exempt.amount, Decimal::TEN);
        assert_eq!(untaxed.amount, Decimal::TEN);
    }

    #[test]
    fn fixture_parses_with_store_defaults() {
        let fixture = PricingFixture::from_json(
            r#"{
                "cart": {
                    "id": "cart-9",
                    "store_id": "main",
                    "customer": { "id": "c-9" },
                    "lines": [
                        { "id": "a", "product_id": "sku-a", "quantity": 2, "unit_price": "4.50" }
                    ]
                }
            }"#,
        )
        .expect("fixture parses");

        assert_eq!(fixture.cart.lines[0].unit_price, Decimal::new(450, 2));
        assert!(fixture.cart.lines[0].is_ship_enabled);
        assert!(fixture.store.fixed_rate_providers.is_empty());
    }

    #[test]
    fn fixture_with_invalid_cart_is_rejected() {
        let result = PricingFixture::from_json(
            r#"{
                "cart": {
                    "id": "cart-9",
                    "store_id": "main",
                    "customer": { "id": "c-9" },
                    "lines": [
                        { "id": "a", "product_id": "sku-a", "quantity": 0, "unit_price": "4.50" }
                    ]
                }
            }"#,
        );

        assert!(matches!(result, Err(ApplicationError::Domain(_))));
    }
}
