use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreId(pub String);

/// The slice of customer state a pricing pass reads.
///
/// Role membership and the reward-points opt-in are resolved by the caller
/// before the cart snapshot is handed to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    /// Member of a customer role that ships for free.
    #[serde(default)]
    pub free_shipping: bool,
    #[serde(default)]
    pub use_reward_points: bool,
}

impl Customer {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: CustomerId(id.into()), free_shipping: false, use_reward_points: false }
    }
}
