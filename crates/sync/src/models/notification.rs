//! Member notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use organic_market_core::{MemberId, NotificationId};

/// A notification shown to one member, or to everyone when `owner_id` is
/// absent (broadcast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<MemberId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_status: bool,
}

impl Notification {
    /// Wire name of the owner field; absent or null means broadcast.
    pub const OWNER_FIELD: &'static str = "ownerId";

    /// Build an unread notification created now.
    #[must_use]
    pub fn new(
        id: NotificationId,
        owner_id: Option<MemberId>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner_id,
            title: title.into(),
            message: message.into(),
            creation_date: Some(Utc::now()),
            read_status: false,
        }
    }

    /// Broadcasts are visible to everyone; others only to their owner.
    #[must_use]
    pub fn is_visible_to(&self, member_id: &MemberId) -> bool {
        self.owner_id.as_ref().is_none_or(|owner| owner == member_id)
    }
}
