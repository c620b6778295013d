//! Role-assignment documents.

use serde::{Deserialize, Serialize};

use organic_market_core::{MemberId, Role, RoleAssignmentId};

/// Maps a member to a role.
///
/// At most one active assignment per member is assumed; nothing enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub id: RoleAssignmentId,
    pub member_id: MemberId,
    pub role: Role,
    #[serde(default)]
    pub active: bool,
}

impl RoleAssignment {
    /// Wire name of the member field.
    pub const MEMBER_FIELD: &'static str = "memberId";

    /// Whether this record is the active assignment for `member_id`.
    #[must_use]
    pub fn is_active_for(&self, member_id: &MemberId) -> bool {
        self.active && &self.member_id == member_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_wire_format() {
        let json = r#"{"id":"r1","memberId":"m1","role":"farmer","active":true,"extra":1}"#;
        let record: RoleAssignment = serde_json::from_str(json).unwrap();
        assert_eq!(record.role, Role::Farmer);
        assert!(record.is_active_for(&MemberId::new("m1")));
        assert!(!record.is_active_for(&MemberId::new("m2")));
    }

    #[test]
    fn test_missing_active_flag_means_inactive() {
        let json = r#"{"id":"r1","memberId":"m1","role":"customer"}"#;
        let record: RoleAssignment = serde_json::from_str(json).unwrap();
        assert!(!record.is_active_for(&MemberId::new("m1")));
    }
}
