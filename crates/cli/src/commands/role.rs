//! Role lookup.

use organic_market_core::MemberId;
use organic_market_sync::{AppContext, DocumentStore, StaticIdentityProvider};

use super::{CommandError, ensure_loaded};

/// Log in as `member` and report the role and store sizes it resolves to.
pub async fn show<S: DocumentStore>(
    context: &AppContext<S>,
    member: &MemberId,
) -> Result<(), CommandError> {
    let identity = StaticIdentityProvider::new(member.clone());
    let (member, load) = context.login(&identity).await?;

    if ensure_loaded(load.role, "role assignments")? == 0 {
        tracing::info!(member_id = %member, "No active role assignment");
        return Ok(());
    }

    if let Some(role) = context.session().role() {
        tracing::info!(
            member_id = %member,
            role = %role,
            wishlist = context.wishlist().len(),
            unread = context.notifications().unread_count(),
            "Active role"
        );
    }
    Ok(())
}
