//! Storage collaborator interfaces.
//!
//! The onboarding core never talks to a database directly; it goes through
//! the narrow async traits below. Splitting by concern keeps each seam small:
//!
//! - [`IdentityStore`] - user accounts
//! - [`ParticipantStore`] - delegates and staff
//! - [`ParentStore`] - parent records and delegate-parent links
//! - [`AssignmentStore`] - program membership rows
//! - [`ReferenceStore`] - program years and per-year activations
//!
//! [`ProgramStore`] bundles all five for the service entry points.
//!
//! Idempotency in the import executor is read-then-write (`find_*` before
//! `create_*`). Two concurrent batches against the same program year can race
//! between those calls; a hardened backend would add unique constraints and
//! upsert-on-conflict without changing these signatures.

#![allow(async_fn_in_trait)]

use std::collections::HashSet;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{
    Delegate, DelegateStatus, GroupingRef, Parent, PartyRef, ProgramAssignment, ProgramRole,
    ProgramYear, Staff, StaffRole, User,
};

pub mod memory;

pub use memory::MemoryStore;

// =============================================================================
// Creation payloads
// =============================================================================

/// Fields for a new delegate row.
#[derive(Debug, Clone)]
pub struct NewDelegate {
    pub program_year_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: DelegateStatus,
}

/// Fields for a new staff row.
#[derive(Debug, Clone)]
pub struct NewStaff {
    pub program_year_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: StaffRole,
    pub grouping_id: Option<Uuid>,
}

/// Fields for a new parent row.
#[derive(Debug, Clone)]
pub struct NewParent {
    pub program_year_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

// =============================================================================
// Traits
// =============================================================================

/// User accounts, looked up by lower-cased email.
pub trait IdentityStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User>;
}

/// Delegates and staff, scoped to a program year.
pub trait ParticipantStore {
    async fn find_delegate(
        &self,
        program_year_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Delegate>>;

    async fn create_delegate(&self, delegate: NewDelegate) -> StoreResult<Delegate>;

    /// Set a delegate's grouping, party and status in one update.
    async fn update_delegate_placement(
        &self,
        delegate_id: Uuid,
        grouping_id: Uuid,
        party_id: Uuid,
        status: DelegateStatus,
    ) -> StoreResult<()>;

    async fn list_delegates_for_year(&self, program_year_id: Uuid) -> StoreResult<Vec<Delegate>>;

    async fn find_staff(&self, program_year_id: Uuid, email: &str) -> StoreResult<Option<Staff>>;

    async fn create_staff(&self, staff: NewStaff) -> StoreResult<Staff>;
}

/// Parent records and delegate-parent links.
pub trait ParentStore {
    async fn find_parent(&self, program_year_id: Uuid, email: &str)
        -> StoreResult<Option<Parent>>;

    async fn create_parent(&self, parent: NewParent) -> StoreResult<Parent>;

    /// Create the (delegate, parent) link unless it already exists.
    async fn find_or_create_link(
        &self,
        delegate_id: Uuid,
        parent_id: Uuid,
        program_year_id: Uuid,
    ) -> StoreResult<()>;
}

/// Program membership rows.
pub trait AssignmentStore {
    async fn find_assignment(
        &self,
        user_id: Uuid,
        program_id: Uuid,
    ) -> StoreResult<Option<ProgramAssignment>>;

    async fn create_assignment(
        &self,
        user_id: Uuid,
        program_id: Uuid,
        role: ProgramRole,
    ) -> StoreResult<()>;
}

/// Program years and per-year grouping/party activations.
pub trait ReferenceStore {
    async fn find_program_year(&self, program_year_id: Uuid) -> StoreResult<Option<ProgramYear>>;

    /// Activation rows as stored - may contain duplicates; callers dedup.
    async fn list_active_groupings_for_year(
        &self,
        program_year_id: Uuid,
    ) -> StoreResult<Vec<GroupingRef>>;

    async fn list_active_parties_for_year(
        &self,
        program_year_id: Uuid,
    ) -> StoreResult<Vec<PartyRef>>;

    /// Which of the given (lower-cased) emails already have accounts.
    async fn filter_known_emails(&self, emails: &[String]) -> StoreResult<HashSet<String>>;
}

/// Everything the onboarding services need, in one bound.
pub trait ProgramStore:
    IdentityStore + ParticipantStore + ParentStore + AssignmentStore + ReferenceStore
{
}

impl<T> ProgramStore for T where
    T: IdentityStore + ParticipantStore + ParentStore + AssignmentStore + ReferenceStore
{
}
