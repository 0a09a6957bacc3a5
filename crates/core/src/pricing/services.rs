//! Read-only collaborators a pricing pass consults.
//!
//! Implementations live outside the engine (catalog, tax provider, gift card
//! repository, ...). [`crate::store::InMemoryStore`] implements all of them
//! for fixtures and tests.

use rust_decimal::Decimal;

use crate::domain::cart::{Cart, TaxCategoryId};
use crate::domain::customer::{Customer, StoreId};
use crate::domain::discount::{Discount, DiscountType};
use crate::domain::gift_card::GiftCard;
use crate::domain::shipping::{FixedRateProvider, PaymentFee, ShippingOption};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaxedPrice {
    pub amount: Decimal,
    /// Fraction, so 19% is `0.19`.
    pub rate: Decimal,
}

pub trait TaxResolver: Send + Sync {
    fn resolve_taxed_price(
        &self,
        amount: Decimal,
        including_tax: bool,
        customer: &Customer,
        tax_category: Option<&TaxCategoryId>,
    ) -> TaxedPrice;

    fn is_vat_exempt(&self, customer: &Customer) -> bool;
}

pub trait DiscountSource: Send + Sync {
    fn discounts(&self, discount_type: DiscountType) -> Vec<Discount>;

    fn is_discount_valid(&self, discount: &Discount, customer: &Customer) -> bool;
}

pub trait GiftCardSource: Send + Sync {
    fn active_gift_cards(&self, customer: &Customer, store: &StoreId) -> Vec<GiftCard>;
}

pub trait RewardPointsSource: Send + Sync {
    fn reward_points_balance(&self, customer: &Customer) -> i64;
}

pub trait ShippingSource: Send + Sync {
    fn selected_shipping_option(&self, customer: &Customer, store: &StoreId)
        -> Option<ShippingOption>;

    fn active_fixed_rate_providers(&self, store: &StoreId) -> Vec<FixedRateProvider>;
}

pub trait PaymentFeeSource: Send + Sync {
    fn additional_fee(&self, cart: &Cart) -> PaymentFee;
}

#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub tax: &'a dyn TaxResolver,
    pub discounts: &'a dyn DiscountSource,
    pub gift_cards: &'a dyn GiftCardSource,
    pub reward_points: &'a dyn RewardPointsSource,
    pub shipping: &'a dyn ShippingSource,
    pub payment_fees: &'a dyn PaymentFeeSource,
}

impl<'a> Collaborators<'a> {
    /// Uses a single backing store for every collaborator.
    pub fn from_store<S>(store: &'a S) -> Self
    where
        S: TaxResolver
            + DiscountSource
            + GiftCardSource
            + RewardPointsSource
            + ShippingSource
            + PaymentFeeSource,
    {
        Self {
            tax: store,
            discounts: store,
            gift_cards: store,
            reward_points: store,
            shipping: store,
            payment_fees: store,
        }
    }
}
