pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod store;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::cart::{BundleRole, Cart, CartId, CartLine, CheckoutAttributeValueLine, LineId};
pub use domain::customer::{Customer, CustomerId, StoreId};
pub use domain::discount::{Discount, DiscountId, DiscountRule, DiscountType};
pub use domain::gift_card::{AppliedGiftCard, GiftCard, GiftCardId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::{
    Collaborators, DeterministicPricingEngine, OrderTotalCalculator, OrderTotalResult,
    PricingContext, PricingEngine, Resolution, TaxBucket, UnresolvableReason,
};
pub use store::{InMemoryStore, PricingFixture};
