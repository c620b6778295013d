//! Session-related types.
//!
//! Types held by the session store and the keys of its durable slot.

use organic_market_core::{MemberId, Role};

use super::RoleAssignment;

/// Current authenticated identity.
///
/// `is_authenticated` is derived, never stored, so it can't drift from the
/// fields it depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Member ID issued by the identity provider.
    pub member_id: Option<MemberId>,
    /// Role the member acts under.
    pub role: Option<Role>,
    /// Record the role was resolved from. `None` after a rehydrate.
    pub assignment: Option<RoleAssignment>,
}

impl Session {
    /// True iff both a member ID and a role are set.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.member_id.is_some() && self.role.is_some()
    }
}

/// Durable key-value slot keys.
pub mod keys {
    /// Key for the lowercase role name.
    pub const USER_ROLE: &str = "userRole";

    /// Key for the member ID.
    pub const MEMBER_ID: &str = "memberId";
}
