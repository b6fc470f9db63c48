//! Row validation for roster uploads.
//!
//! Two pure functions check a single [`ImportRow`] against the field rules
//! for its roster kind and return structured errors and warnings:
//!
//! - [`validate_delegate_row`] - names, email shape, and the optional parent
//!   block (parentEmail present pulls in parent name requirements)
//! - [`validate_staff_row`] - names, email shape, a fixed role set, and a
//!   grouping-name lookup that can only warn
//!
//! Errors block a row from import; warnings leave it importable. Issue order
//! within a row is not part of the contract.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{StaffRole, ValidationIssue};
use crate::parser::ImportRow;
use crate::reference::ReferenceMaps;

/// Column names shared by the templates, validators and importer.
pub mod columns {
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const PARENT_FIRST_NAME: &str = "parentFirstName";
    pub const PARENT_LAST_NAME: &str = "parentLastName";
    pub const PARENT_EMAIL: &str = "parentEmail";
    pub const PARENT_PHONE: &str = "parentPhone";
    pub const ROLE: &str = "role";
    pub const GROUPING_NAME: &str = "groupingName";
}

/// Simple `local@domain.tld` shape; RFC 5322 edge cases are not attempted.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex")
});

/// Check the email shape used across both rosters.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Outcome of validating one row.
#[derive(Debug, Clone)]
pub struct RowValidation {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl RowValidation {
    fn from_issues(errors: Vec<ValidationIssue>, warnings: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// All error messages joined for failure reporting.
    pub fn joined_errors(&self) -> String {
        self.errors
            .iter()
            .map(|issue| issue.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validate one delegate roster row.
pub fn validate_delegate_row(row: &ImportRow) -> RowValidation {
    let mut errors = Vec::new();
    let n = row.row_number();

    require(row, columns::FIRST_NAME, n, &mut errors);
    require(row, columns::LAST_NAME, n, &mut errors);
    require_email(row, n, &mut errors);

    // Parent columns are optional as a group, but a parent email pulls in
    // the rest of the block. Each check fires independently.
    if row.has(columns::PARENT_EMAIL) {
        if !is_valid_email(row.get(columns::PARENT_EMAIL)) {
            errors.push(ValidationIssue::new(
                n,
                columns::PARENT_EMAIL,
                format!("Invalid {} format", columns::PARENT_EMAIL),
            ));
        }
        for column in [columns::PARENT_FIRST_NAME, columns::PARENT_LAST_NAME] {
            if !row.has(column) {
                errors.push(ValidationIssue::new(
                    n,
                    column,
                    format!("{} is required when {} is set", column, columns::PARENT_EMAIL),
                ));
            }
        }
    }

    RowValidation::from_issues(errors, Vec::new())
}

/// Validate one staff roster row against the active grouping map.
pub fn validate_staff_row(row: &ImportRow, refs: &ReferenceMaps) -> RowValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let n = row.row_number();

    require(row, columns::FIRST_NAME, n, &mut errors);
    require(row, columns::LAST_NAME, n, &mut errors);
    require_email(row, n, &mut errors);

    let role = row.get(columns::ROLE);
    if role.is_empty() {
        errors.push(ValidationIssue::new(
            n,
            columns::ROLE,
            format!("{} is required", columns::ROLE),
        ));
    } else if StaffRole::from_code(role).is_none() {
        errors.push(ValidationIssue::new(
            n,
            columns::ROLE,
            format!(
                "Unknown role '{}' (expected one of: {})",
                role,
                StaffRole::codes().join(", ")
            ),
        ));
    }

    // A grouping miss never blocks the row; the member imports ungrouped.
    if row.has(columns::GROUPING_NAME) {
        let name = row.get(columns::GROUPING_NAME);
        if refs.grouping_by_name(name).is_none() {
            warnings.push(ValidationIssue::new(
                n,
                columns::GROUPING_NAME,
                format!(
                    "Grouping '{}' is not active for this program year; staff will be imported without a grouping",
                    name
                ),
            ));
        }
    }

    RowValidation::from_issues(errors, warnings)
}

fn require(row: &ImportRow, column: &str, n: usize, errors: &mut Vec<ValidationIssue>) {
    if !row.has(column) {
        errors.push(ValidationIssue::new(n, column, format!("{column} is required")));
    }
}

fn require_email(row: &ImportRow, n: usize, errors: &mut Vec<ValidationIssue>) {
    let email = row.get(columns::EMAIL);
    if email.is_empty() {
        errors.push(ValidationIssue::new(
            n,
            columns::EMAIL,
            format!("{} is required", columns::EMAIL),
        ));
    } else if !is_valid_email(email) {
        errors.push(ValidationIssue::new(
            n,
            columns::EMAIL,
            format!("Invalid {} format", columns::EMAIL),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupingRef;
    use crate::parser::parse_table;
    use uuid::Uuid;

    fn delegate_row(csv_row: &str) -> ImportRow {
        let csv = format!(
            "firstName,lastName,email,phone,parentFirstName,parentLastName,parentEmail,parentPhone\n{csv_row}"
        );
        parse_table(&csv, ',').rows.remove(0)
    }

    fn staff_row(csv_row: &str) -> ImportRow {
        let csv = format!("firstName,lastName,email,phone,role,groupingName\n{csv_row}");
        parse_table(&csv, ',').rows.remove(0)
    }

    fn refs_with(names: &[&str]) -> ReferenceMaps {
        let mut maps = ReferenceMaps::default();
        for name in names {
            maps.push_grouping(GroupingRef {
                grouping_id: Uuid::new_v4(),
                name: (*name).into(),
                is_assignment_level: true,
            });
        }
        maps
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("john@test.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("john@test"));
        assert!(!is_valid_email("john test@test.com"));
        assert!(!is_valid_email("@test.com"));
    }

    #[test]
    fn test_valid_delegate_row() {
        let row = delegate_row("John,Doe,john@test.com,555-1234,Jane,Doe,jane@test.com,");
        let result = validate_delegate_row(&row);
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_delegate_missing_names() {
        let row = delegate_row(",,john@test.com,,,,,");
        let result = validate_delegate_row(&row);
        assert!(!result.valid);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"firstName"));
        assert!(fields.contains(&"lastName"));
    }

    #[test]
    fn test_parent_email_pulls_in_parent_names() {
        // parentEmail set, both parent names missing: exactly two errors.
        let row = delegate_row("John,Doe,john@test.com,,,,jane@test.com,");
        let result = validate_delegate_row(&row);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"parentFirstName"));
        assert!(fields.contains(&"parentLastName"));
    }

    #[test]
    fn test_malformed_parent_block_fires_three_errors() {
        let row = delegate_row("John,Doe,john@test.com,,,,not-an-email,");
        let result = validate_delegate_row(&row);
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn test_parent_block_optional_when_absent() {
        let row = delegate_row("John,Doe,john@test.com,,,,,");
        assert!(validate_delegate_row(&row).valid);
    }

    #[test]
    fn test_staff_unknown_role_is_error() {
        let row = staff_row("Pat,Smith,pat@test.com,,principal,");
        let result = validate_staff_row(&row, &refs_with(&[]));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "role");
    }

    #[test]
    fn test_staff_role_case_insensitive() {
        let row = staff_row("Pat,Smith,pat@test.com,,COUNSELOR,");
        assert!(validate_staff_row(&row, &refs_with(&[])).valid);
    }

    #[test]
    fn test_staff_unknown_grouping_is_warning_only() {
        let row = staff_row("Pat,Smith,pat@test.com,,counselor,Atlantis");
        let result = validate_staff_row(&row, &refs_with(&["Franklin County"]));
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "groupingName");
    }

    #[test]
    fn test_staff_known_grouping_no_warning() {
        let row = staff_row("Pat,Smith,pat@test.com,,counselor,franklin county");
        let result = validate_staff_row(&row, &refs_with(&["Franklin County"]));
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_joined_errors() {
        let row = delegate_row(",Doe,bad-email,,,,,");
        let result = validate_delegate_row(&row);
        let joined = result.joined_errors();
        assert!(joined.contains("firstName is required"));
        assert!(joined.contains("; "));
    }
}
