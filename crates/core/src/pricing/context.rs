use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::domain::cart::{Cart, LineId, TaxCategoryId};
use crate::pricing::rounding::Rounding;
use crate::pricing::services::TaxResolver;

/// Tax classification of one priced cart line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineTaxInfo {
    pub line_id: LineId,
    pub tax_category: Option<TaxCategoryId>,
    pub subtotal_excl_tax: Decimal,
    pub subtotal_incl_tax: Decimal,
    pub tax_rate: Decimal,
}

impl LineTaxInfo {
    pub fn tax_amount(&self) -> Decimal {
        self.subtotal_incl_tax - self.subtotal_excl_tax
    }
}

/// Scratch state for a single pricing pass.
///
/// Bound to the cart state it was built from: a stage handed a context whose
/// fingerprint no longer matches the cart rebuilds it before reading from it.
#[derive(Clone, Debug)]
pub struct PricingContext {
    pass_id: Uuid,
    fingerprint: String,
    vat_exempt: bool,
    line_taxes: Option<Vec<LineTaxInfo>>,
    auxiliary_categories: BTreeMap<Option<TaxCategoryId>, Option<TaxCategoryId>>,
}

impl PricingContext {
    pub fn new(cart: &Cart, tax: &dyn TaxResolver) -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            fingerprint: cart_fingerprint(cart),
            vat_exempt: tax.is_vat_exempt(&cart.customer),
            line_taxes: None,
            auxiliary_categories: BTreeMap::new(),
        }
    }

    pub fn pass_id(&self) -> Uuid {
        self.pass_id
    }

    pub fn is_vat_exempt(&self) -> bool {
        self.vat_exempt
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn is_current_for(&self, cart: &Cart) -> bool {
        self.fingerprint == cart_fingerprint(cart)
    }

    /// Drops every cached classification if `cart` changed since the context was built.
    pub fn ensure_current(&mut self, cart: &Cart, tax: &dyn TaxResolver) {
        let fingerprint = cart_fingerprint(cart);
        if fingerprint == self.fingerprint {
            return;
        }

        warn!(
            event_name = "pricing.context.rebuilt",
            pass_id = %self.pass_id,
            cart_id = %cart.id.0,
            "cart changed during pricing pass; rebuilding pricing context"
        );
        let pass_id = self.pass_id;
        *self = Self::new(cart, tax);
        self.pass_id = pass_id;
    }

    /// Per-line classification, computed on first use.
    pub fn line_taxes(
        &mut self,
        cart: &Cart,
        tax: &dyn TaxResolver,
        rounding: &Rounding,
    ) -> &[LineTaxInfo] {
        if self.line_taxes.is_none() {
            self.line_taxes = Some(classify_lines(cart, tax, self.vat_exempt, rounding));
        }
        self.line_taxes.as_deref().unwrap_or_default()
    }

    pub(crate) fn record_line_taxes(&mut self, infos: Vec<LineTaxInfo>) {
        self.line_taxes = Some(infos);
    }

    pub(crate) fn auxiliary_category(
        &self,
        fallback: Option<&TaxCategoryId>,
    ) -> Option<Option<TaxCategoryId>> {
        self.auxiliary_categories.get(&fallback.cloned()).cloned()
    }

    pub(crate) fn remember_auxiliary_category(
        &mut self,
        fallback: Option<&TaxCategoryId>,
        resolved: Option<TaxCategoryId>,
    ) {
        self.auxiliary_categories.insert(fallback.cloned(), resolved);
    }
}

pub(crate) fn classify_lines(
    cart: &Cart,
    tax: &dyn TaxResolver,
    vat_exempt: bool,
    rounding: &Rounding,
) -> Vec<LineTaxInfo> {
    cart.priced_lines()
        .map(|line| {
            let amount = rounding.stage(cart.line_amount(line));
            let (excl, incl, rate) =
                split_tax(tax, cart, amount, line.tax_category.as_ref(), vat_exempt, rounding);
            LineTaxInfo {
                line_id: line.id.clone(),
                tax_category: line.tax_category.clone(),
                subtotal_excl_tax: excl,
                subtotal_incl_tax: incl,
                tax_rate: rate,
            }
        })
        .collect()
}

/// Resolves the exclusive and inclusive variants of `amount` plus the applied rate.
pub(crate) fn split_tax(
    tax: &dyn TaxResolver,
    cart: &Cart,
    amount: Decimal,
    tax_category: Option<&TaxCategoryId>,
    vat_exempt: bool,
    rounding: &Rounding,
) -> (Decimal, Decimal, Decimal) {
    let excl = tax.resolve_taxed_price(amount, false, &cart.customer, tax_category);
    let excl_amount = rounding.stage(excl.amount);
    if vat_exempt {
        return (excl_amount, excl_amount, Decimal::ZERO);
    }

    let incl = tax.resolve_taxed_price(amount, true, &cart.customer, tax_category);
    (excl_amount, rounding.stage(incl.amount), incl.rate)
}

pub fn cart_fingerprint(cart: &Cart) -> String {
    let payload = match serde_json::to_vec(cart) {
        Ok(payload) => payload,
        Err(_) => cart.id.0.as_bytes().to_vec(),
    };
    encode_hex(Sha256::digest(&payload).as_slice())
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
