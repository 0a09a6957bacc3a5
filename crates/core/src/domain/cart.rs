use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::{Customer, StoreId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxCategoryId(pub String);

/// Position of a line inside a product bundle.
///
/// Child quantities are per one parent bundle, so a child ships
/// `parent.quantity * child.quantity` units.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum BundleRole {
    #[default]
    Standalone,
    Parent {
        #[serde(default)]
        per_item_shipping: bool,
        #[serde(default)]
        per_item_pricing: bool,
    },
    Child {
        parent: LineId,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: LineId,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub tax_category: Option<TaxCategoryId>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub customer_entered_price: Option<Decimal>,
    #[serde(default = "default_ship_enabled")]
    pub is_ship_enabled: bool,
    #[serde(default)]
    pub is_free_shipping: bool,
    #[serde(default)]
    pub additional_shipping_charge: Decimal,
    #[serde(default)]
    pub bundle: BundleRole,
}

fn default_ship_enabled() -> bool {
    true
}

impl CartLine {
    pub fn effective_unit_price(&self) -> Decimal {
        self.customer_entered_price.unwrap_or(self.unit_price)
    }

    pub fn is_bundle_child(&self) -> bool {
        matches!(self.bundle, BundleRole::Child { .. })
    }

    pub fn ships_per_item(&self) -> bool {
        matches!(self.bundle, BundleRole::Parent { per_item_shipping: true, .. })
    }

    pub fn prices_per_item(&self) -> bool {
        matches!(self.bundle, BundleRole::Parent { per_item_pricing: true, .. })
    }
}

/// A selected checkout attribute value with a price adjustment.
///
/// Contributes to subtotal and tax only; it never ships and never counts
/// towards quantities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutAttributeValueLine {
    pub attribute: String,
    pub value: String,
    pub price_adjustment: Decimal,
    #[serde(default)]
    pub tax_category: Option<TaxCategoryId>,
}

/// A line that physically ships, with the unit count it ships.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShippableUnit<'a> {
    pub line: &'a CartLine,
    pub units: u64,
}

/// Immutable snapshot of a cart for the duration of one pricing pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub store_id: StoreId,
    pub customer: Customer,
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub checkout_attributes: Vec<CheckoutAttributeValueLine>,
    #[serde(default)]
    pub is_recurring: bool,
}

impl Cart {
    /// Lines priced on their own; bundle children are folded into their parent.
    pub fn priced_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|line| !line.is_bundle_child())
    }

    pub fn children_of<'a>(&'a self, parent: &'a LineId) -> impl Iterator<Item = &'a CartLine> {
        self.lines.iter().filter(move |line| match &line.bundle {
            BundleRole::Child { parent: id } => id == parent,
            _ => false,
        })
    }

    /// Extended pre-tax amount of a priced line.
    ///
    /// A per-item priced bundle is worth the sum of its children per bundle.
    pub fn line_amount(&self, line: &CartLine) -> Decimal {
        let quantity = Decimal::from(line.quantity);
        if line.prices_per_item() {
            let per_bundle: Decimal = self
                .children_of(&line.id)
                .map(|child| child.effective_unit_price() * Decimal::from(child.quantity))
                .sum();
            return per_bundle * quantity;
        }

        line.effective_unit_price() * quantity
    }

    pub fn shippable_units(&self) -> Vec<ShippableUnit<'_>> {
        let mut units = Vec::new();
        for line in self.priced_lines().filter(|line| line.is_ship_enabled) {
            if line.ships_per_item() {
                for child in self.children_of(&line.id).filter(|child| child.is_ship_enabled) {
                    units.push(ShippableUnit {
                        line: child,
                        units: u64::from(line.quantity) * u64::from(child.quantity),
                    });
                }
                continue;
            }

            units.push(ShippableUnit { line, units: u64::from(line.quantity) });
        }
        units
    }

    /// How many times a per-shipment base rate applies.
    ///
    /// The order ships once; a bundle parent shipping per item counts each
    /// of its shippable child lines instead of itself.
    pub fn shipment_count(&self) -> u64 {
        let mut ships_as_order = false;
        let mut per_item = 0u64;
        for line in self.priced_lines().filter(|line| line.is_ship_enabled) {
            if line.ships_per_item() {
                let children =
                    self.children_of(&line.id).filter(|child| child.is_ship_enabled).count();
                per_item += u64::try_from(children).unwrap_or(u64::MAX);
            } else {
                ships_as_order = true;
            }
        }
        per_item + u64::from(ships_as_order)
    }

    pub fn requires_shipping(&self) -> bool {
        self.shippable_units().iter().any(|unit| unit.units > 0)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = BTreeSet::new();
        for line in &self.lines {
            if !seen.insert(&line.id) {
                return Err(self.invalid(format!("duplicate line id `{}`", line.id.0)));
            }
            if line.quantity == 0 {
                return Err(self.invalid(format!("line `{}` has zero quantity", line.id.0)));
            }
        }

        for line in &self.lines {
            let BundleRole::Child { parent } = &line.bundle else {
                continue;
            };
            let parent_line = self.lines.iter().find(|candidate| &candidate.id == parent);
            match parent_line {
                Some(candidate) if matches!(candidate.bundle, BundleRole::Parent { .. }) => {}
                Some(_) => {
                    return Err(self.invalid(format!(
                        "line `{}` points at `{}` which is not a bundle parent",
                        line.id.0, parent.0
                    )));
                }
                None => {
                    return Err(self.invalid(format!(
                        "bundle child `{}` references missing parent `{}`",
                        line.id.0, parent.0
                    )));
                }
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> DomainError {
        DomainError::InvalidCart { cart_id: self.id.0.clone(), reason }
    }
}
