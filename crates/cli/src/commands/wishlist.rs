//! Wishlist commands.

use organic_market_core::{MemberId, ProductId};
use organic_market_sync::{AppContext, DocumentStore};

use super::{CommandError, ensure_loaded};

/// List the products `member` has favorited.
pub async fn list<S: DocumentStore>(
    context: &AppContext<S>,
    member: &MemberId,
) -> Result<(), CommandError> {
    let count = ensure_loaded(context.wishlist().load(member).await, "wishlist")?;
    tracing::info!(member_id = %member, count, "Wishlist");

    for item in context.wishlist().items() {
        tracing::info!(
            item_id = %item.id,
            product = %item.product_reference,
            quantity = item.quantity,
            added = ?item.date_added,
            "Favorited"
        );
    }
    Ok(())
}

/// Favorite `product` for `member`, or unfavorite it if already favorited.
pub async fn toggle<S: DocumentStore>(
    context: &AppContext<S>,
    member: &MemberId,
    product: &ProductId,
) -> Result<(), CommandError> {
    // Membership is judged from local state, so load it first
    ensure_loaded(context.wishlist().load(member).await, "wishlist")?;

    let favorited = context.toggle_wishlist(member, product).await?;
    if favorited {
        tracing::info!(member_id = %member, product = %product, "Added to wishlist");
    } else {
        tracing::info!(member_id = %member, product = %product, "Removed from wishlist");
    }
    Ok(())
}
