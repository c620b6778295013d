//! Core types for Organic Market.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod role;

pub use id::*;
pub use role::{Role, RoleParseError};
