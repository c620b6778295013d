//! Session store: who is logged in, and under which role.
//!
//! Backed by two keys in the durable key-value slot so a restart can
//! rehydrate the authenticated flag without a network round trip.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use organic_market_core::{MemberId, Role};

use super::{LoadGeneration, LoadOutcome, OwnerFilter, load_owned};
use crate::error::{clear_sentry_user, report_remote_failure, set_sentry_user};
use crate::models::session::keys;
use crate::models::{RoleAssignment, Session};
use crate::remote::DocumentStore;
use crate::storage::KeyValueStore;

/// Current identity and role, mirrored to the durable slot.
pub struct SessionStore<S> {
    remote: Arc<S>,
    collection: String,
    storage: Arc<dyn KeyValueStore>,
    // Serializes slot writes so the last one always mirrors the newest state
    slot_lock: Mutex<()>,
    state: watch::Sender<Session>,
    generation: LoadGeneration,
}

impl<S> SessionStore<S> {
    /// Create an anonymous session.
    ///
    /// Nothing is read from `storage` until [`restore`](Self::restore).
    #[must_use]
    pub fn new(remote: Arc<S>, collection: impl Into<String>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            remote,
            collection: collection.into(),
            storage,
            slot_lock: Mutex::new(()),
            state: watch::channel(Session::default()).0,
            generation: LoadGeneration::default(),
        }
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn member_id(&self) -> Option<MemberId> {
        self.state.borrow().member_id.clone()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.state.borrow().role
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Adopt a role for `member_id`, replacing any current session.
    ///
    /// Persists role and member ID. Cancels any in-flight [`load_role`].
    ///
    /// [`load_role`]: SessionStore::load_role
    pub fn set_role(&self, role: Role, member_id: MemberId, assignment: Option<RoleAssignment>) {
        let ticket = self.generation.begin();
        self.adopt(ticket, role, member_id, assignment);
    }

    /// Forget the session and remove the persisted keys.
    pub fn clear(&self) {
        self.generation.begin();
        self.state.send_replace(Session::default());
        self.sync_slot();
        clear_sentry_user();
        info!("Session cleared");
    }

    /// Rehydrate member ID and role from the durable slot.
    ///
    /// Returns `true` if both keys were present and valid. The assignment
    /// record is not persisted, so it stays `None`.
    pub fn restore(&self) -> bool {
        let read = |key: &str| {
            self.storage.get(key).unwrap_or_else(|e| {
                warn!(key, error = %e, "Failed to read persisted session key");
                None
            })
        };

        let (Some(raw_role), Some(member_id)) = (read(keys::USER_ROLE), read(keys::MEMBER_ID)) else {
            debug!("No persisted session");
            return false;
        };
        let role = match raw_role.parse::<Role>() {
            Ok(role) => role,
            Err(e) => {
                warn!(error = %e, "Ignoring persisted session with unknown role");
                return false;
            }
        };

        let member_id = MemberId::new(member_id);
        set_sentry_user(&member_id);
        info!(member_id = %member_id, role = %role, "Session restored");
        self.state.send_replace(Session {
            member_id: Some(member_id),
            role: Some(role),
            assignment: None,
        });
        true
    }

    /// Publish and persist a role, unless a newer generation than `ticket`
    /// has started.
    fn adopt(
        &self,
        ticket: u64,
        role: Role,
        member_id: MemberId,
        assignment: Option<RoleAssignment>,
    ) -> bool {
        let applied = self.state.send_if_modified(|session| {
            if !self.generation.is_current(ticket) {
                return false;
            }
            *session = Session {
                member_id: Some(member_id.clone()),
                role: Some(role),
                assignment,
            };
            true
        });

        if applied {
            self.sync_slot();
            set_sentry_user(&member_id);
            info!(member_id = %member_id, role = %role, "Role adopted");
        }
        applied
    }

    /// Mirror the current session into the durable slot.
    ///
    /// Runs after the state is published, never inside the channel's write
    /// lock. The state is re-read under `slot_lock`, so concurrent calls
    /// leave the slot matching whichever session was published last.
    fn sync_slot(&self) {
        let _guard = self.slot_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (member_id, role) = {
            let session = self.state.borrow();
            (session.member_id.clone(), session.role)
        };

        match (member_id, role) {
            (Some(member_id), Some(role)) => {
                for (key, value) in [
                    (keys::USER_ROLE, role.as_str()),
                    (keys::MEMBER_ID, member_id.as_str()),
                ] {
                    if let Err(e) = self.storage.set(key, value) {
                        warn!(key, error = %e, "Failed to persist session key");
                    }
                }
            }
            _ => {
                for key in [keys::USER_ROLE, keys::MEMBER_ID] {
                    if let Err(e) = self.storage.remove(key) {
                        warn!(key, error = %e, "Failed to remove persisted session key");
                    }
                }
            }
        }
    }
}

impl<S: DocumentStore> SessionStore<S> {
    /// Look up the active role assignment of `member_id` and adopt it.
    ///
    /// Adopts the first active record for the member. If none exists, or the
    /// fetch fails, the session is left as it was.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn load_role(&self, member_id: &MemberId) -> LoadOutcome {
        let ticket = self.generation.begin();

        let assignments = match load_owned(
            self.remote.as_ref(),
            &self.collection,
            OwnerFilter::owned_by(RoleAssignment::MEMBER_FIELD, member_id),
            |record: &RoleAssignment| record.is_active_for(member_id),
        )
        .await
        {
            Ok(assignments) => assignments,
            Err(e) => {
                report_remote_failure("session.load_role", &self.collection, &e);
                return LoadOutcome::Failed;
            }
        };

        let Some(assignment) = assignments.into_iter().next() else {
            debug!(member_id = %member_id, "No active role assignment");
            return LoadOutcome::Applied { count: 0 };
        };

        if self.adopt(ticket, assignment.role, member_id.clone(), Some(assignment)) {
            LoadOutcome::Applied { count: 1 }
        } else {
            debug!(member_id = %member_id, "Discarding superseded role lookup");
            LoadOutcome::Superseded
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use organic_market_core::RoleAssignmentId;

    use super::*;
    use crate::remote::InMemoryDocumentStore;
    use crate::storage::MemoryKeyValueStore;

    fn record(id: &str, member: &str, role: Role, active: bool) -> RoleAssignment {
        RoleAssignment {
            id: RoleAssignmentId::new(id),
            member_id: MemberId::new(member),
            role,
            active,
        }
    }

    fn store() -> (
        InMemoryDocumentStore,
        Arc<MemoryKeyValueStore>,
        SessionStore<InMemoryDocumentStore>,
    ) {
        let remote = InMemoryDocumentStore::new();
        let storage = Arc::new(MemoryKeyValueStore::new());
        let store = SessionStore::new(Arc::new(remote.clone()), "userRoles", storage.clone());
        (remote, storage, store)
    }

    #[test]
    fn test_set_role_persists_keys() {
        let (_remote, storage, store) = store();
        let rec = record("r1", "m1", Role::Farmer, true);

        store.set_role(Role::Farmer, MemberId::new("m1"), Some(rec.clone()));

        assert!(store.is_authenticated());
        assert_eq!(store.snapshot().assignment, Some(rec));
        assert_eq!(storage.get("userRole").unwrap().as_deref(), Some("farmer"));
        assert_eq!(storage.get("memberId").unwrap().as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_clear_then_load_role() {
        let (remote, storage, store) = store();
        remote
            .seed("userRoles", [record("r1", "m1", Role::Farmer, true)])
            .unwrap();

        store.set_role(Role::Farmer, MemberId::new("m1"), None);
        store.clear();
        assert!(!store.is_authenticated());
        assert_eq!(store.member_id(), None);
        assert_eq!(storage.get("memberId").unwrap(), None);
        assert_eq!(storage.get("userRole").unwrap(), None);

        let outcome = store.load_role(&MemberId::new("m1")).await;

        assert_eq!(outcome, LoadOutcome::Applied { count: 1 });
        assert!(store.is_authenticated());
        assert_eq!(store.role(), Some(Role::Farmer));
    }

    #[tokio::test]
    async fn test_load_role_adopts_first_active_match() {
        let (remote, _storage, store) = store();
        remote
            .seed(
                "userRoles",
                [
                    record("r0", "m1", Role::Admin, false),
                    record("r1", "m2", Role::Admin, true),
                    record("r2", "m1", Role::Customer, true),
                    record("r3", "m1", Role::Farmer, true),
                ],
            )
            .unwrap();

        store.load_role(&MemberId::new("m1")).await;

        let session = store.snapshot();
        assert_eq!(session.role, Some(Role::Customer));
        assert_eq!(session.assignment.unwrap().id, RoleAssignmentId::new("r2"));
    }

    #[tokio::test]
    async fn test_load_role_without_match_leaves_state() {
        let (remote, _storage, store) = store();
        remote
            .seed("userRoles", [record("r0", "m1", Role::Admin, false)])
            .unwrap();

        let outcome = store.load_role(&MemberId::new("m1")).await;

        assert_eq!(outcome, LoadOutcome::Applied { count: 0 });
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_load_role_failure_leaves_state() {
        let (remote, _storage, store) = store();
        store.set_role(Role::Admin, MemberId::new("m9"), None);
        remote.set_failing(true);

        let outcome = store.load_role(&MemberId::new("m1")).await;

        assert_eq!(outcome, LoadOutcome::Failed);
        assert_eq!(store.member_id(), Some(MemberId::new("m9")));
        assert_eq!(store.role(), Some(Role::Admin));
    }

    #[test]
    fn test_restore_rehydrates_flag() {
        let (_remote, storage, store) = store();
        storage.set("userRole", "admin").unwrap();
        storage.set("memberId", "m3").unwrap();

        assert!(store.restore());
        assert!(store.is_authenticated());
        assert_eq!(store.role(), Some(Role::Admin));
        assert!(store.snapshot().assignment.is_none());
    }

    #[test]
    fn test_restore_ignores_partial_or_invalid_slot() {
        let (_remote, storage, store) = store();
        storage.set("memberId", "m3").unwrap();
        assert!(!store.restore());

        storage.set("userRole", "overlord").unwrap();
        assert!(!store.restore());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_set_role_overwrites_existing_session() {
        let (_remote, _storage, store) = store();
        store.set_role(Role::Customer, MemberId::new("m1"), None);
        store.set_role(Role::Farmer, MemberId::new("m2"), None);
        assert_eq!(store.member_id(), Some(MemberId::new("m2")));
        assert_eq!(store.role(), Some(Role::Farmer));
    }

    #[test]
    fn test_subscribers_see_logout() {
        let (_remote, _storage, store) = store();
        store.set_role(Role::Customer, MemberId::new("m1"), None);
        let mut rx = store.subscribe();

        store.clear();

        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_authenticated());
    }

    #[tokio::test]
    async fn test_unknown_role_of_other_member_does_not_fail_lookup() {
        let (remote, _storage, store) = store();
        remote
            .seed(
                "userRoles",
                [
                    serde_json::json!({"id": "r0", "memberId": "m2", "role": "moderator", "active": false}),
                    serde_json::json!({"id": "r1", "memberId": "m1", "role": "farmer", "active": true}),
                ],
            )
            .unwrap();

        let outcome = store.load_role(&MemberId::new("m1")).await;

        assert_eq!(outcome, LoadOutcome::Applied { count: 1 });
        assert!(store.is_authenticated());
        assert_eq!(store.role(), Some(Role::Farmer));
    }

    /// Slot that reads the published session whenever it is written to.
    #[derive(Default)]
    struct ObservingSlot {
        inner: MemoryKeyValueStore,
        session: std::sync::OnceLock<watch::Receiver<Session>>,
        seen: Mutex<Vec<Option<MemberId>>>,
    }

    impl ObservingSlot {
        fn observe(&self) {
            // Would deadlock if called while the sender holds its write lock
            let member = self.session.get().unwrap().borrow().member_id.clone();
            self.seen.lock().unwrap().push(member);
        }
    }

    impl KeyValueStore for ObservingSlot {
        fn get(&self, key: &str) -> Result<Option<String>, crate::error::StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), crate::error::StorageError> {
            self.observe();
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), crate::error::StorageError> {
            self.observe();
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_slot_is_written_after_state_is_published() {
        let slot = Arc::new(ObservingSlot::default());
        let store = SessionStore::new(
            Arc::new(InMemoryDocumentStore::new()),
            "userRoles",
            slot.clone(),
        );
        assert!(slot.session.set(store.subscribe()).is_ok());

        store.set_role(Role::Farmer, MemberId::new("m1"), None);
        let after_set: Vec<_> = slot.seen.lock().unwrap().drain(..).collect();
        assert_eq!(after_set, [Some(MemberId::new("m1")), Some(MemberId::new("m1"))]);

        store.clear();
        let after_clear: Vec<_> = slot.seen.lock().unwrap().drain(..).collect();
        assert_eq!(after_clear, [None, None]);
        assert_eq!(slot.get("memberId").unwrap(), None);
    }
}
