//! Member identity provider seam.
//!
//! The session store is a thin cache in front of whatever issues member IDs;
//! this trait is the boundary to it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use organic_market_core::MemberId;

use crate::error::IdentityError;

/// Issues stable member IDs and handles login/logout.
pub trait IdentityProvider: Send + Sync {
    /// Member currently logged in, if any.
    fn member_id(&self) -> Option<MemberId>;

    /// Log in and return the member ID.
    fn login(&self) -> impl Future<Output = Result<MemberId, IdentityError>> + Send;

    /// Log out. Logging out while logged out is a no-op.
    fn logout(&self) -> impl Future<Output = ()> + Send;
}

/// Identity provider that always logs in as one fixed member.
///
/// Used by the CLI, which receives the member ID as an argument.
#[derive(Debug)]
pub struct StaticIdentityProvider {
    member_id: MemberId,
    logged_in: AtomicBool,
}

impl StaticIdentityProvider {
    #[must_use]
    pub const fn new(member_id: MemberId) -> Self {
        Self {
            member_id,
            logged_in: AtomicBool::new(false),
        }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn member_id(&self) -> Option<MemberId> {
        self.logged_in
            .load(Ordering::SeqCst)
            .then(|| self.member_id.clone())
    }

    async fn login(&self) -> Result<MemberId, IdentityError> {
        self.logged_in.store(true, Ordering::SeqCst);
        Ok(self.member_id.clone())
    }

    async fn logout(&self) {
        self.logged_in.store(false, Ordering::SeqCst);
    }
}
