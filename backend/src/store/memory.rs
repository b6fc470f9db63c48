//! In-memory reference backend.
//!
//! Backs the test suite and local experimentation. State lives behind one
//! mutex; methods lock, mutate, and return without awaiting, so the async
//! trait surface stays cancellation-safe.
//!
//! The backend supports injected failures (`fail_delegate_create_for`) so
//! tests can exercise the executor's per-row failure isolation.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Delegate, DelegateStatus, GroupingRef, Parent, PartyRef, ProgramAssignment, ProgramRole,
    ProgramYear, Staff, User,
};

use super::{
    AssignmentStore, IdentityStore, NewDelegate, NewParent, NewStaff, ParentStore,
    ParticipantStore, ReferenceStore,
};

#[derive(Debug, Default)]
struct Inner {
    users: Vec<User>,
    delegates: Vec<Delegate>,
    staff: Vec<Staff>,
    parents: Vec<Parent>,
    /// (delegate_id, parent_id, program_year_id)
    links: Vec<(Uuid, Uuid, Uuid)>,
    assignments: Vec<ProgramAssignment>,
    program_years: Vec<ProgramYear>,
    grouping_activations: HashMap<Uuid, Vec<GroupingRef>>,
    party_activations: HashMap<Uuid, Vec<PartyRef>>,
    /// Emails for which `create_delegate` fails (test hook).
    fail_delegate_creates: HashSet<String>,
    /// Emails for which `update_delegate_placement` fails (test hook).
    fail_placements: HashSet<String>,
}

/// Mutex-guarded in-memory store implementing every collaborator trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".into()))
    }

    // -------------------------------------------------------------------------
    // Seeding helpers
    // -------------------------------------------------------------------------

    pub fn seed_program_year(&self, program_name: &str, year: i32) -> ProgramYear {
        let py = ProgramYear {
            id: Uuid::new_v4(),
            program_id: Uuid::new_v4(),
            program_name: program_name.to_string(),
            year,
        };
        self.locked().expect("store mutex poisoned").program_years.push(py.clone());
        py
    }

    /// Activate a new grouping for a year and return its activation row.
    pub fn activate_grouping(
        &self,
        program_year_id: Uuid,
        name: &str,
        is_assignment_level: bool,
    ) -> GroupingRef {
        let grouping = GroupingRef {
            grouping_id: Uuid::new_v4(),
            name: name.to_string(),
            is_assignment_level,
        };
        self.push_grouping_activation(program_year_id, grouping.clone());
        grouping
    }

    /// Push a raw activation row; duplicates are allowed, as in the real
    /// activation table.
    pub fn push_grouping_activation(&self, program_year_id: Uuid, grouping: GroupingRef) {
        self.locked()
            .expect("store mutex poisoned")
            .grouping_activations
            .entry(program_year_id)
            .or_default()
            .push(grouping);
    }

    pub fn activate_party(
        &self,
        program_year_id: Uuid,
        name: &str,
        color: Option<&str>,
    ) -> PartyRef {
        let party = PartyRef {
            party_id: Uuid::new_v4(),
            year_party_id: Uuid::new_v4(),
            name: name.to_string(),
            color: color.map(str::to_string),
        };
        self.push_party_activation(program_year_id, party.clone());
        party
    }

    pub fn push_party_activation(&self, program_year_id: Uuid, party: PartyRef) {
        self.locked()
            .expect("store mutex poisoned")
            .party_activations
            .entry(program_year_id)
            .or_default()
            .push(party);
    }

    /// Make `create_delegate` fail for this email (per-row failure tests).
    pub fn fail_delegate_create_for(&self, email: &str) {
        self.locked()
            .expect("store mutex poisoned")
            .fail_delegate_creates
            .insert(email.to_lowercase());
    }

    /// Make `update_delegate_placement` fail for this email (per-delegate
    /// failure tests in the assignment engine).
    pub fn fail_placement_for(&self, email: &str) {
        self.locked()
            .expect("store mutex poisoned")
            .fail_placements
            .insert(email.to_lowercase());
    }

    /// Seed a delegate's grouping/party directly, leaving status untouched.
    pub fn place_delegate(
        &self,
        delegate_id: Uuid,
        grouping_id: Option<Uuid>,
        party_id: Option<Uuid>,
    ) {
        let mut inner = self.locked().expect("store mutex poisoned");
        if let Some(delegate) = inner.delegates.iter_mut().find(|d| d.id == delegate_id) {
            delegate.grouping_id = grouping_id;
            delegate.party_id = party_id;
        }
    }

    // -------------------------------------------------------------------------
    // Inspection helpers for assertions
    // -------------------------------------------------------------------------

    pub fn user_count(&self) -> usize {
        self.locked().expect("store mutex poisoned").users.len()
    }

    pub fn delegate_count(&self, program_year_id: Uuid) -> usize {
        self.locked()
            .expect("store mutex poisoned")
            .delegates
            .iter()
            .filter(|d| d.program_year_id == program_year_id)
            .count()
    }

    pub fn parent_count(&self, program_year_id: Uuid) -> usize {
        self.locked()
            .expect("store mutex poisoned")
            .parents
            .iter()
            .filter(|p| p.program_year_id == program_year_id)
            .count()
    }

    pub fn link_count(&self) -> usize {
        self.locked().expect("store mutex poisoned").links.len()
    }

    pub fn staff_for_year(&self, program_year_id: Uuid) -> Vec<Staff> {
        self.locked()
            .expect("store mutex poisoned")
            .staff
            .iter()
            .filter(|s| s.program_year_id == program_year_id)
            .cloned()
            .collect()
    }

    pub fn assignments_for_program(&self, program_id: Uuid) -> Vec<ProgramAssignment> {
        self.locked()
            .expect("store mutex poisoned")
            .assignments
            .iter()
            .filter(|a| a.program_id == program_id)
            .cloned()
            .collect()
    }
}

// =============================================================================
// Trait implementations
// =============================================================================

impl IdentityStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.locked()?;
        let email = email.to_lowercase();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        let mut inner = self.locked()?;
        let email = email.to_lowercase();
        if inner.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Conflict(format!("user exists: {email}")));
        }
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }
}

impl ParticipantStore for MemoryStore {
    async fn find_delegate(
        &self,
        program_year_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Delegate>> {
        let inner = self.locked()?;
        let email = email.to_lowercase();
        Ok(inner
            .delegates
            .iter()
            .find(|d| d.program_year_id == program_year_id && d.email == email)
            .cloned())
    }

    async fn create_delegate(&self, delegate: NewDelegate) -> StoreResult<Delegate> {
        let mut inner = self.locked()?;
        let email = delegate.email.to_lowercase();
        if inner.fail_delegate_creates.contains(&email) {
            return Err(StoreError::Backend(format!(
                "injected failure: create_delegate for {email}"
            )));
        }
        let row = Delegate {
            id: Uuid::new_v4(),
            program_year_id: delegate.program_year_id,
            user_id: delegate.user_id,
            first_name: delegate.first_name,
            last_name: delegate.last_name,
            email,
            phone: delegate.phone,
            status: delegate.status,
            grouping_id: None,
            party_id: None,
        };
        inner.delegates.push(row.clone());
        Ok(row)
    }

    async fn update_delegate_placement(
        &self,
        delegate_id: Uuid,
        grouping_id: Uuid,
        party_id: Uuid,
        status: DelegateStatus,
    ) -> StoreResult<()> {
        let mut inner = self.locked()?;
        let fail_placements = inner.fail_placements.clone();
        let delegate = inner
            .delegates
            .iter_mut()
            .find(|d| d.id == delegate_id)
            .ok_or_else(|| StoreError::Backend(format!("no delegate {delegate_id}")))?;
        if fail_placements.contains(&delegate.email) {
            return Err(StoreError::Backend(format!(
                "injected failure: update_delegate_placement for {}",
                delegate.email
            )));
        }
        delegate.grouping_id = Some(grouping_id);
        delegate.party_id = Some(party_id);
        delegate.status = status;
        Ok(())
    }

    async fn list_delegates_for_year(&self, program_year_id: Uuid) -> StoreResult<Vec<Delegate>> {
        let inner = self.locked()?;
        Ok(inner
            .delegates
            .iter()
            .filter(|d| d.program_year_id == program_year_id)
            .cloned()
            .collect())
    }

    async fn find_staff(&self, program_year_id: Uuid, email: &str) -> StoreResult<Option<Staff>> {
        let inner = self.locked()?;
        let email = email.to_lowercase();
        Ok(inner
            .staff
            .iter()
            .find(|s| s.program_year_id == program_year_id && s.email == email)
            .cloned())
    }

    async fn create_staff(&self, staff: NewStaff) -> StoreResult<Staff> {
        let mut inner = self.locked()?;
        let row = Staff {
            id: Uuid::new_v4(),
            program_year_id: staff.program_year_id,
            user_id: staff.user_id,
            first_name: staff.first_name,
            last_name: staff.last_name,
            email: staff.email.to_lowercase(),
            phone: staff.phone,
            role: staff.role,
            grouping_id: staff.grouping_id,
        };
        inner.staff.push(row.clone());
        Ok(row)
    }
}

impl ParentStore for MemoryStore {
    async fn find_parent(
        &self,
        program_year_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Parent>> {
        let inner = self.locked()?;
        let email = email.to_lowercase();
        Ok(inner
            .parents
            .iter()
            .find(|p| p.program_year_id == program_year_id && p.email == email)
            .cloned())
    }

    async fn create_parent(&self, parent: NewParent) -> StoreResult<Parent> {
        let mut inner = self.locked()?;
        let row = Parent {
            id: Uuid::new_v4(),
            program_year_id: parent.program_year_id,
            user_id: parent.user_id,
            first_name: parent.first_name,
            last_name: parent.last_name,
            email: parent.email.to_lowercase(),
            phone: parent.phone,
        };
        inner.parents.push(row.clone());
        Ok(row)
    }

    async fn find_or_create_link(
        &self,
        delegate_id: Uuid,
        parent_id: Uuid,
        program_year_id: Uuid,
    ) -> StoreResult<()> {
        let mut inner = self.locked()?;
        let key = (delegate_id, parent_id, program_year_id);
        if !inner.links.contains(&key) {
            inner.links.push(key);
        }
        Ok(())
    }
}

impl AssignmentStore for MemoryStore {
    async fn find_assignment(
        &self,
        user_id: Uuid,
        program_id: Uuid,
    ) -> StoreResult<Option<ProgramAssignment>> {
        let inner = self.locked()?;
        Ok(inner
            .assignments
            .iter()
            .find(|a| a.user_id == user_id && a.program_id == program_id)
            .cloned())
    }

    async fn create_assignment(
        &self,
        user_id: Uuid,
        program_id: Uuid,
        role: ProgramRole,
    ) -> StoreResult<()> {
        let mut inner = self.locked()?;
        inner.assignments.push(ProgramAssignment {
            user_id,
            program_id,
            role,
        });
        Ok(())
    }
}

impl ReferenceStore for MemoryStore {
    async fn find_program_year(&self, program_year_id: Uuid) -> StoreResult<Option<ProgramYear>> {
        let inner = self.locked()?;
        Ok(inner
            .program_years
            .iter()
            .find(|py| py.id == program_year_id)
            .cloned())
    }

    async fn list_active_groupings_for_year(
        &self,
        program_year_id: Uuid,
    ) -> StoreResult<Vec<GroupingRef>> {
        let inner = self.locked()?;
        Ok(inner
            .grouping_activations
            .get(&program_year_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_active_parties_for_year(
        &self,
        program_year_id: Uuid,
    ) -> StoreResult<Vec<PartyRef>> {
        let inner = self.locked()?;
        Ok(inner
            .party_activations
            .get(&program_year_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn filter_known_emails(&self, emails: &[String]) -> StoreResult<HashSet<String>> {
        let inner = self.locked()?;
        let wanted: HashSet<String> = emails.iter().map(|e| e.to_lowercase()).collect();
        Ok(inner
            .users
            .iter()
            .filter(|u| wanted.contains(&u.email))
            .map(|u| u.email.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        store.create_user("John@Test.com", "hash").await.unwrap();

        let found = store.find_user_by_email("john@test.COM").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().email, "john@test.com");
    }

    #[tokio::test]
    async fn test_duplicate_user_conflicts() {
        let store = MemoryStore::new();
        store.create_user("a@test.com", "h1").await.unwrap();
        let err = store.create_user("A@test.com", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_link_deduplicated() {
        let store = MemoryStore::new();
        let (d, p, y) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.find_or_create_link(d, p, y).await.unwrap();
        store.find_or_create_link(d, p, y).await.unwrap();
        assert_eq!(store.link_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_delegate_failure() {
        let store = MemoryStore::new();
        store.fail_delegate_create_for("bad@test.com");

        let result = store
            .create_delegate(NewDelegate {
                program_year_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                first_name: "Bad".into(),
                last_name: "Row".into(),
                email: "bad@test.com".into(),
                phone: None,
                status: DelegateStatus::PendingAssignment,
            })
            .await;
        assert!(result.is_err());
    }
}
