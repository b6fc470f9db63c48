//! # Rosterload - bulk participant onboarding for civic education programs
//!
//! Rosterload turns operator-filled CSV rosters into validated delegate and
//! staff records for a program year, and balances unassigned delegates
//! across groupings and parties.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV Roster │────▶│   Parser    │────▶│  Validator  │────▶│   Preview   │
//! │ (templates) │     │ (comments,  │     │ (row rules) │     │  (dry run)  │
//! └─────────────┘     │  quoting)   │     └─────────────┘     └──────┬──────┘
//!                     └─────────────┘                                │
//!                                                                    ▼
//!                     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//!                     │  Balanced   │◀────│   Stores    │◀────│   Import    │
//!                     │ Assignment  │     │ (traits)    │     │  Executor   │
//!                     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rosterload::{execute_import, Caller, MemoryStore, NullMailer,
//!     ParticipantKind, Sha256PasswordHasher};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let year = store.seed_program_year("Youth Assembly", 2026);
//!     let caller = Caller::program_admin(operator_id, [year.program_id]);
//!
//!     let outcome = execute_import(
//!         &store, &Sha256PasswordHasher, &NullMailer,
//!         &caller, year.id, ParticipantKind::Delegate, csv_text, false,
//!     ).await.unwrap();
//!     println!("Imported {} delegates", outcome.success);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - hierarchical error types
//! - [`models`] - domain entities and result DTOs
//! - [`parser`] - CSV table parsing with encoding auto-detection
//! - [`validation`] - pure per-row validators
//! - [`reference`] - per-year lookup tables
//! - [`store`] - storage collaborator traits + in-memory backend
//! - [`import`] - preview engine and import executor
//! - [`assign`] - balanced assignment engine
//! - [`auth`] - explicit caller context
//! - [`credentials`] - temporary password generation and hashing
//! - [`email`] - welcome-email collaborator
//! - [`logs`] - broadcast audit logging
//! - [`templates`] - embedded CSV templates

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Lookup tables
pub mod reference;

// Storage
pub mod store;

// Pipeline
pub mod import;

// Assignment
pub mod assign;

// Ambient concerns
pub mod auth;
pub mod credentials;
pub mod email;
pub mod logs;
pub mod templates;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{MailError, MailResult, RequestError, RequestResult, StoreError, StoreResult};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AssignmentPreview, AssignmentResult, Delegate, DelegateStatus, GroupingRef, ImportOutcome,
    ImportPreview, Parent, ParticipantKind, PartyRef, ProgramRole, ProgramYear, Staff, StaffRole,
    User, ValidationIssue,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    detect_delimiter, parse_bytes_auto, parse_file_auto, parse_table, CsvTable, ImportRow,
    ParsedFile, DEFAULT_DELIMITER,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    columns, is_valid_email, validate_delegate_row, validate_staff_row, RowValidation,
};

// =============================================================================
// Re-exports - Reference Maps
// =============================================================================

pub use reference::ReferenceMaps;

// =============================================================================
// Re-exports - Stores
// =============================================================================

pub use store::{
    AssignmentStore, IdentityStore, MemoryStore, NewDelegate, NewParent, NewStaff, ParentStore,
    ParticipantStore, ProgramStore, ReferenceStore,
};

// =============================================================================
// Re-exports - Services
// =============================================================================

pub use assign::{commit_assignment, preview_assignment, ASSIGNMENT_PREVIEW_LIMIT};
pub use import::{execute_import, preview_import, PREVIEW_ROW_LIMIT};

// =============================================================================
// Re-exports - Ambient
// =============================================================================

pub use auth::{ensure_program_admin, Caller};
pub use credentials::{PasswordHasher, Sha256PasswordHasher};
pub use email::{NullMailer, WelcomeEmail, WelcomeMailer};
pub use templates::{delegate_template, staff_template, template_for};
