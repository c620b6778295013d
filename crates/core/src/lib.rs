//! Organic Market Core - Shared types library.
//!
//! This crate provides common types used across all Organic Market components:
//! - `sync` - Client-side state stores kept in step with the document store
//! - `cli` - Command-line tools for inspecting member state
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and the member role

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
