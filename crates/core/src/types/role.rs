//! Member role enumeration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string does not name a known [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// Role a member acts under on the marketplace.
///
/// Serialized in lowercase, matching the role-assignment documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Buys produce from farmers.
    Customer,
    /// Lists and sells produce.
    Farmer,
    /// Operates the marketplace.
    Admin,
}

impl Role {
    /// The lowercase wire name of this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Farmer => "farmer",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "farmer" => Ok(Self::Farmer),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!("farmer".parse::<Role>().unwrap(), Role::Farmer);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("Farmer".parse::<Role>().is_err());
        assert_eq!(
            "owner".parse::<Role>().unwrap_err(),
            RoleParseError("owner".to_string())
        );
    }

    #[test]
    fn test_role_display_matches_serde() {
        for role in [Role::Customer, Role::Farmer, Role::Admin] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
        }
    }
}
