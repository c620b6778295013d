//! Domain models mirrored between the stores and the document store.
//!
//! Wire field names are camelCase; unknown remote fields are ignored.

pub mod notification;
pub mod role_assignment;
pub mod session;
pub mod wishlist;

pub use notification::Notification;
pub use role_assignment::RoleAssignment;
pub use session::Session;
pub use wishlist::WishlistItem;
