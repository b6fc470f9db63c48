//! Domain models for the rosterload onboarding pipeline.
//!
//! This module contains the core data structures used throughout the
//! pipeline:
//!
//! - [`ParticipantKind`] - which roster a CSV belongs to (delegate or staff)
//! - [`DelegateStatus`] / [`StaffRole`] / [`ProgramRole`] - lifecycle and role
//!   enums with case-insensitive code parsing
//! - [`User`], [`Delegate`], [`Staff`], [`Parent`], [`ProgramYear`] - the
//!   entity shapes the core reads and writes through its stores
//! - [`GroupingRef`] / [`PartyRef`] - per-year activation rows
//! - [`ValidationIssue`] - one structured row-level error or warning
//! - result DTOs ([`ImportPreview`], [`ImportOutcome`], [`AssignmentPreview`],
//!   [`AssignmentResult`]) serialized camelCase for UI consumption

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Participant Kind
// =============================================================================

/// Which roster a CSV upload targets.
///
/// Determines the required columns and the side tables touched on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Delegate,
    Staff,
}

impl ParticipantKind {
    /// Parse from a request parameter, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "delegate" | "delegates" => Some(Self::Delegate),
            "staff" => Some(Self::Staff),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Delegate => "delegate",
            Self::Staff => "staff",
        }
    }
}

// =============================================================================
// Delegate Status
// =============================================================================

/// Delegate lifecycle status.
///
/// Imported delegates start as `PendingAssignment`; the assignment engine
/// promotes them to `Active` when it places them into a grouping and party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegateStatus {
    PendingAssignment,
    Active,
    Withdrawn,
}

impl DelegateStatus {
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::PendingAssignment => "pending_assignment",
            Self::Active => "active",
            Self::Withdrawn => "withdrawn",
        }
    }
}

// =============================================================================
// Staff Role
// =============================================================================

/// Role of a staff member within a program year.
///
/// The fixed set accepted by the staff roster; anything else is a row error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Administrator,
    Director,
    Counselor,
    Advisor,
    Volunteer,
}

impl StaffRole {
    /// Parse a role column value, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "administrator" | "admin" => Some(Self::Administrator),
            "director" => Some(Self::Director),
            "counselor" => Some(Self::Counselor),
            "advisor" => Some(Self::Advisor),
            "volunteer" => Some(Self::Volunteer),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Director => "director",
            Self::Counselor => "counselor",
            Self::Advisor => "advisor",
            Self::Volunteer => "volunteer",
        }
    }

    /// Display label for welcome emails and operator output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::Director => "Director",
            Self::Counselor => "Counselor",
            Self::Advisor => "Advisor",
            Self::Volunteer => "Volunteer",
        }
    }

    /// The program assignment role this staff role maps to.
    pub fn program_role(&self) -> ProgramRole {
        match self {
            Self::Administrator => ProgramRole::Admin,
            _ => ProgramRole::Staff,
        }
    }

    /// All accepted role codes, for error messages.
    pub fn codes() -> [&'static str; 5] {
        ["administrator", "director", "counselor", "advisor", "volunteer"]
    }
}

// =============================================================================
// Program Role
// =============================================================================

/// Role recorded on a user's program assignment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramRole {
    Delegate,
    Staff,
    Admin,
}

impl ProgramRole {
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Delegate => "delegate",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// An account in the identity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// Stored lower-cased.
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// One annual instance of a program; the scoping unit for everything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramYear {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_name: String,
    pub year: i32,
}

/// A delegate enrolled in a program year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegate {
    pub id: Uuid,
    pub program_year_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub status: DelegateStatus,
    /// Set by the assignment engine, never at import time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_id: Option<Uuid>,
}

impl Delegate {
    /// Both dimensions must be set for a delegate to count as assigned.
    pub fn is_assigned(&self) -> bool {
        self.grouping_id.is_some() && self.party_id.is_some()
    }
}

/// A staff member enrolled in a program year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: Uuid,
    pub program_year_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: StaffRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping_id: Option<Uuid>,
}

/// A parent/guardian record scoped to a program year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    pub id: Uuid,
    pub program_year_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A user's membership row in a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramAssignment {
    pub user_id: Uuid,
    pub program_id: Uuid,
    pub role: ProgramRole,
}

// =============================================================================
// Activation rows
// =============================================================================

/// A grouping activated for a program year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingRef {
    pub grouping_id: Uuid,
    pub name: String,
    /// True when the grouping's type is the level delegates are assigned at.
    pub is_assignment_level: bool,
}

/// A party activated for a program year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyRef {
    pub party_id: Uuid,
    /// The activation row's own id.
    pub year_party_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// =============================================================================
// Validation Issues
// =============================================================================

/// One row-level validation error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// 1-based row number (header is row 1).
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(row: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Preview DTOs
// =============================================================================

/// Whether a row's email already has an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    New,
    Existing,
}

/// One annotated row in the preview listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRow {
    pub row: usize,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: RowStatus,
    pub valid: bool,
}

/// Dry-run result of a roster upload. No writes have happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub total_rows: usize,
    pub valid_rows: usize,
    /// Valid rows whose email has no account yet.
    pub new_users: usize,
    /// Valid rows whose email already has an account.
    pub existing_users: usize,
    /// Valid delegate rows naming a parent email with no account yet.
    /// Counted per row occurrence, not per unique email.
    pub new_parents: usize,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    /// First rows only, capped for UI display.
    pub preview: Vec<PreviewRow>,
}

// =============================================================================
// Import DTOs
// =============================================================================

/// A row that failed during import, with the raw error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub row: usize,
    pub email: String,
    pub error: String,
}

/// Accumulated counters for one import run.
///
/// There is no batch rollback: these reflect exactly what was committed,
/// including rows completed before a mid-batch failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub users_created: usize,
    pub parents_created: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub failures: Vec<RowFailure>,
}

// =============================================================================
// Assignment DTOs
// =============================================================================

/// One planned (or committed) delegate placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedAssignment {
    pub delegate_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub grouping_id: Uuid,
    pub grouping_name: String,
    pub party_id: Uuid,
    pub party_name: String,
}

/// Load summary for one grouping after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingLoad {
    pub grouping_id: Uuid,
    pub name: String,
    /// Delegates already in the grouping before this run.
    pub existing: usize,
    /// Delegates placed by this run.
    pub new: usize,
    pub total: usize,
}

/// Load summary for one party across all groupings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyLoad {
    pub party_id: Uuid,
    pub name: String,
    pub existing: usize,
    pub new: usize,
    pub total: usize,
}

/// Dry-run result of a balanced assignment pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPreview {
    /// Delegates already placed before this run.
    pub already_assigned: usize,
    /// Delegates this run would place.
    pub unassigned: usize,
    /// Per-delegate placements, capped for UI display; summaries below cover
    /// the whole pool.
    pub assignments: Vec<PlannedAssignment>,
    pub groupings: Vec<GroupingLoad>,
    pub parties: Vec<PartyLoad>,
}

/// A delegate whose placement update failed during commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentFailure {
    pub delegate_id: Uuid,
    pub email: String,
    pub error: String,
}

/// Result of a committed assignment pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    pub assigned: usize,
    pub failed: usize,
    pub groupings: Vec<GroupingLoad>,
    pub parties: Vec<PartyLoad>,
    pub failures: Vec<AssignmentFailure>,
}

// =============================================================================
// Tests
// =============================================================================
