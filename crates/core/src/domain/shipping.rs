use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The option the customer picked during checkout, with its cached rate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub name: String,
    pub shipping_method: String,
    pub rate: Decimal,
    #[serde(default)]
    pub ignore_additional_charges: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedRateProvider {
    pub system_name: String,
    pub rate: Decimal,
    #[serde(default)]
    pub ignore_additional_charges: bool,
}

/// Additional fee charged by the selected payment method.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFee {
    pub amount: Decimal,
    /// Interpret `amount` as a percentage of the discounted subtotal.
    #[serde(default)]
    pub use_percentage: bool,
}
