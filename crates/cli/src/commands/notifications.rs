//! Notification commands.

use organic_market_core::MemberId;
use organic_market_sync::{AppContext, DocumentStore};

use super::{CommandError, ensure_loaded};

/// List notifications visible to `member`, optionally only unread ones.
pub async fn list<S: DocumentStore>(
    context: &AppContext<S>,
    member: &MemberId,
    unread_only: bool,
) -> Result<(), CommandError> {
    ensure_loaded(context.notifications().load(member).await, "notifications")?;
    let snapshot = context.notifications().snapshot();
    tracing::info!(
        member_id = %member,
        total = snapshot.items().len(),
        unread = snapshot.unread_count(),
        "Notifications"
    );

    for notification in snapshot
        .items()
        .iter()
        .filter(|n| !unread_only || !n.read_status)
    {
        tracing::info!(
            id = %notification.id,
            read = notification.read_status,
            broadcast = notification.owner_id.is_none(),
            created = ?notification.creation_date,
            "{}: {}",
            notification.title,
            notification.message
        );
    }
    Ok(())
}
