//! Wishlist entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use organic_market_core::{MemberId, ProductId, WishlistItemId};

const fn default_quantity() -> u32 {
    1
}

/// A product favorited by a member.
///
/// `date_added` and `quantity` are denormalized convenience fields and play
/// no part in membership checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub owner_id: MemberId,
    pub product_reference: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<DateTime<Utc>>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl WishlistItem {
    /// Wire name of the owner field.
    pub const OWNER_FIELD: &'static str = "ownerId";

    /// Build a new entry with a freshly generated ID, stamped now.
    #[must_use]
    pub fn new(owner_id: MemberId, product_reference: ProductId) -> Self {
        Self {
            id: WishlistItemId::generate(),
            owner_id,
            product_reference,
            date_added: Some(Utc::now()),
            quantity: default_quantity(),
        }
    }
}
