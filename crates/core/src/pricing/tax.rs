use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::cart::{Cart, TaxCategoryId};
use crate::errors::DomainError;
use crate::pricing::context::PricingContext;
use crate::pricing::rounding::Rounding;
use crate::pricing::services::TaxResolver;

/// How shipping and payment-fee amounts pick a tax category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxiliaryTaxingStrategy {
    #[default]
    SpecifiedCategory,
    HighestCartAmount,
    HighestTaxRate,
}

/// Accumulated tax per rate, ordered by rate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxBucket(BTreeMap<Decimal, Decimal>);

impl TaxBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `{0: 0}` representation used when nothing was taxed.
    pub fn zero() -> Self {
        Self(BTreeMap::from([(Decimal::ZERO, Decimal::ZERO)]))
    }

    pub fn accumulate(&mut self, rate: Decimal, amount: Decimal) {
        if amount.is_zero() {
            return;
        }
        *self.0.entry(rate.normalize()).or_insert(Decimal::ZERO) += amount;
    }

    pub fn set(&mut self, rate: Decimal, amount: Decimal) {
        self.0.insert(rate.normalize(), amount);
    }

    pub fn get(&self, rate: Decimal) -> Option<Decimal> {
        self.0.get(&rate.normalize()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.0.iter().map(|(rate, amount)| (*rate, *amount))
    }

    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn rounded(&self, rounding: &Rounding) -> Self {
        Self(self.0.iter().map(|(rate, amount)| (*rate, rounding.round(*amount))).collect())
    }
}

/// Persisted as `"rate:amount; "` pairs, e.g. `0.07:1.40; 0.19:17.10; `.
impl fmt::Display for TaxBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rate, amount) in self.iter() {
            write!(f, "{}:{:.2}; ", rate.normalize(), amount)?;
        }
        Ok(())
    }
}

impl FromStr for TaxBucket {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut bucket = TaxBucket::new();
        for entry in value.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
            let invalid = || DomainError::InvalidTaxBucket { entry: entry.to_string() };
            let (rate, amount) = entry.split_once(':').ok_or_else(invalid)?;
            let rate = Decimal::from_str(rate.trim()).map_err(|_| invalid())?;
            let amount = Decimal::from_str(amount.trim()).map_err(|_| invalid())?;
            bucket.accumulate(rate, amount);
            if amount.is_zero() {
                bucket.0.entry(rate.normalize()).or_insert(Decimal::ZERO);
            }
        }
        Ok(bucket)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTotalResult {
    pub total: Decimal,
    pub bucket: TaxBucket,
    pub subtotal_tax: Decimal,
    pub shipping_tax: Decimal,
    pub payment_fee_tax: Decimal,
}

/// Collects tax from the subtotal, shipping and payment-fee stages into one bucket.
#[derive(Clone, Debug, Default)]
pub struct TaxAggregator {
    vat_exempt: bool,
    bucket: TaxBucket,
    subtotal_tax: Decimal,
    shipping_tax: Decimal,
    payment_fee_tax: Decimal,
}

impl TaxAggregator {
    pub fn new(vat_exempt: bool) -> Self {
        Self { vat_exempt, ..Self::default() }
    }

    pub fn add_subtotal_tax(&mut self, amount: Decimal, rate: Decimal) {
        if let Some(accepted) = self.accept(amount, rate) {
            self.subtotal_tax += accepted;
        }
    }

    pub fn add_shipping_tax(&mut self, amount: Decimal, rate: Decimal) {
        if let Some(accepted) = self.accept(amount.max(Decimal::ZERO), rate) {
            self.shipping_tax += accepted;
        }
    }

    pub fn add_payment_fee_tax(&mut self, amount: Decimal, rate: Decimal) {
        if let Some(accepted) = self.accept(amount.max(Decimal::ZERO), rate) {
            self.payment_fee_tax += accepted;
        }
    }

    fn accept(&mut self, amount: Decimal, rate: Decimal) -> Option<Decimal> {
        if self.vat_exempt || amount.is_zero() || rate <= Decimal::ZERO {
            return None;
        }
        self.bucket.accumulate(rate, amount);
        Some(amount)
    }

    pub fn finish(self, rounding: &Rounding) -> TaxTotalResult {
        if self.vat_exempt || self.bucket.is_empty() {
            return TaxTotalResult {
                total: Decimal::ZERO,
                bucket: TaxBucket::zero(),
                subtotal_tax: Decimal::ZERO,
                shipping_tax: Decimal::ZERO,
                payment_fee_tax: Decimal::ZERO,
            };
        }

        let bucket = self.bucket.rounded(rounding);
        TaxTotalResult {
            total: bucket.total().max(Decimal::ZERO),
            bucket,
            subtotal_tax: rounding.round(self.subtotal_tax),
            shipping_tax: rounding.round(self.shipping_tax),
            payment_fee_tax: rounding.round(self.payment_fee_tax),
        }
    }
}

/// Tax category governing shipping or payment-fee amounts.
///
/// Falls back to `fallback` when the strategy has nothing to pick from.
pub fn resolve_tax_category(
    strategy: AuxiliaryTaxingStrategy,
    cart: &Cart,
    context: &mut PricingContext,
    tax: &dyn TaxResolver,
    rounding: &Rounding,
    fallback: Option<&TaxCategoryId>,
) -> Option<TaxCategoryId> {
    if strategy == AuxiliaryTaxingStrategy::SpecifiedCategory {
        return fallback.cloned();
    }
    if let Some(cached) = context.auxiliary_category(fallback) {
        return cached;
    }

    let lines = context.line_taxes(cart, tax, rounding);
    let picked = match strategy {
        AuxiliaryTaxingStrategy::HighestCartAmount => {
            let mut groups: BTreeMap<&TaxCategoryId, Decimal> = BTreeMap::new();
            for line in lines {
                if let Some(category) = &line.tax_category {
                    *groups.entry(category).or_insert(Decimal::ZERO) += line.subtotal_excl_tax;
                }
            }
            pick_highest(groups.into_iter())
        }
        AuxiliaryTaxingStrategy::HighestTaxRate => pick_highest(
            lines
                .iter()
                .filter_map(|line| line.tax_category.as_ref().map(|c| (c, line.tax_rate))),
        ),
        AuxiliaryTaxingStrategy::SpecifiedCategory => None,
    };

    let resolved = picked.or_else(|| fallback.cloned());
    debug!(
        event_name = "pricing.tax.auxiliary_category",
        pass_id = %context.pass_id(),
        strategy = ?strategy,
        category = resolved.as_ref().map(|c| c.0.as_str()).unwrap_or("none"),
        "auxiliary tax category resolved"
    );
    context.remember_auxiliary_category(fallback, resolved.clone());
    resolved
}

/// Highest value wins; ties keep the smallest category id.
fn pick_highest<'a>(
    candidates: impl Iterator<Item = (&'a TaxCategoryId, Decimal)>,
) -> Option<TaxCategoryId> {
    let mut best: Option<(&TaxCategoryId, Decimal)> = None;
    for (category, value) in candidates {
        let wins = match best {
            None => true,
            Some((current, current_value)) => {
                value > current_value || (value == current_value && category < current)
            }
        };
        if wins {
            best = Some((category, value));
        }
    }
    best.map(|(category, _)| category.clone())
}
