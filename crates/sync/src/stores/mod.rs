//! Reactive client-side stores.
//!
//! Each store owns its slice of state inside a `tokio::sync::watch` sender.
//! Every mutation is one `send_modify` critical section, so readers never see
//! a half-applied update, and subscribers are woken once per change.
//!
//! Loads follow one convention: fetch the whole remote collection, filter it
//! client-side ([`load_owned`]) and replace local state wholesale. Remote
//! failures are logged and swallowed; local state is left as it was.

pub mod notifications;
pub mod session;
pub mod wishlist;

pub use notifications::{NotificationState, NotificationStore};
pub use session::SessionStore;
pub use wishlist::WishlistStore;

use std::sync::atomic::{AtomicU64, Ordering};

use organic_market_core::MemberId;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::remote::DocumentStore;

/// What happened to a load once its remote fetch returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Local state was replaced with `count` rows.
    Applied { count: usize },
    /// A newer load (or a reset) started first; the result was discarded.
    Superseded,
    /// The remote fetch failed; local state is unchanged.
    Failed,
}

/// Which rows of a shared collection belong to a member, judged on the raw
/// document before it is decoded.
#[derive(Debug, Clone, Copy)]
pub struct OwnerFilter<'a> {
    field: &'static str,
    member_id: &'a MemberId,
    include_unowned: bool,
}

impl<'a> OwnerFilter<'a> {
    /// Rows whose `field` equals `member_id`.
    #[must_use]
    pub const fn owned_by(field: &'static str, member_id: &'a MemberId) -> Self {
        Self {
            field,
            member_id,
            include_unowned: false,
        }
    }

    /// Rows whose `field` equals `member_id`, plus rows with no owner at all.
    #[must_use]
    pub const fn visible_to(field: &'static str, member_id: &'a MemberId) -> Self {
        Self {
            field,
            member_id,
            include_unowned: true,
        }
    }

    fn matches(&self, row: &Value) -> bool {
        match row.get(self.field) {
            Some(Value::String(owner)) => owner == self.member_id.as_str(),
            None | Some(Value::Null) => self.include_unowned,
            Some(_) => false,
        }
    }
}

/// Fetch `collection`, keep the rows `owner` selects and decode them.
///
/// The document store has no server-side filtering, so every load pulls the
/// full collection. Ownership is checked on the raw JSON first; a selected
/// row that doesn't decode as `T` is logged and skipped, so other members'
/// data can never fail the load. `keep` then filters the decoded rows.
///
/// # Errors
///
/// Returns error if the remote fetch fails.
pub async fn load_owned<S, T, F>(
    remote: &S,
    collection: &str,
    owner: OwnerFilter<'_>,
    keep: F,
) -> Result<Vec<T>, RemoteError>
where
    S: DocumentStore,
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let rows: Vec<Value> = remote.get_all(collection).await?;
    let total = rows.len();

    let mut kept = Vec::new();
    for row in rows.into_iter().filter(|row| owner.matches(row)) {
        let id = row.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
        match serde_json::from_value::<T>(row) {
            Ok(decoded) if keep(&decoded) => kept.push(decoded),
            Ok(_) => {}
            Err(e) => warn!(collection, id, error = %e, "Skipping undecodable document"),
        }
    }

    debug!(collection, total, kept = kept.len(), "Filtered collection client-side");
    Ok(kept)
}

/// Monotonic load counter; only the newest load may publish.
///
/// A load takes a ticket before awaiting the network and publishes only if
/// its ticket is still the latest. Resets take a ticket too, which cancels
/// anything in flight.
#[derive(Debug, Default)]
pub struct LoadGeneration(AtomicU64);

impl LoadGeneration {
    /// Start a new generation and return its ticket.
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True if no newer generation has started since `ticket`.
    #[must_use]
    pub fn is_current(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }
}
