//! Committing import of a roster upload.
//!
//! Rows are processed strictly in order, one at a time, because later rows'
//! existence checks must observe earlier rows' writes (two siblings naming
//! the same new parent must share one parent record). Each row is caught
//! independently: a storage failure marks that row failed and the loop moves
//! on. There is no batch transaction - re-submitting the same CSV is the
//! recovery path, and the idempotency checks make that convergent.

use uuid::Uuid;

use crate::auth::Caller;
use crate::credentials::PasswordHasher;
use crate::email::{WelcomeEmail, WelcomeMailer};
use crate::error::{RequestResult, StoreResult};
use crate::logs::{log_error, log_info, log_success, log_warning};
use crate::models::{
    DelegateStatus, ImportOutcome, ParticipantKind, ProgramRole, ProgramYear, RowFailure,
    StaffRole, User,
};
use crate::parser::ImportRow;
use crate::reference::ReferenceMaps;
use crate::store::{NewDelegate, NewParent, NewStaff, ProgramStore};
use crate::validation::columns;

use super::{resolve_context, validate_row};

/// What happened to a row that passed validation.
enum RowAction {
    Imported { temp_password: Option<String> },
    Skipped,
}

/// Import a roster upload, writing one row at a time.
///
/// Preconditions match [`super::preview_import`]; after them no error aborts
/// the batch. The returned [`ImportOutcome`] reflects exactly what was
/// committed.
pub async fn execute_import<S, H, M>(
    store: &S,
    hasher: &H,
    mailer: &M,
    caller: &Caller,
    program_year_id: Uuid,
    kind: ParticipantKind,
    csv_text: &str,
    send_emails: bool,
) -> RequestResult<ImportOutcome>
where
    S: ProgramStore,
    H: PasswordHasher,
    M: WelcomeMailer,
{
    let ctx = resolve_context(store, caller, program_year_id, csv_text).await?;
    let scope = program_year_id.to_string();
    log_info(
        &scope,
        format!(
            "Importing {} roster: {} rows (emails {})",
            kind.as_code(),
            ctx.table.rows.len(),
            if send_emails { "on" } else { "off" }
        ),
    );

    let mut outcome = ImportOutcome::default();

    for row in &ctx.table.rows {
        let validation = validate_row(kind, row, &ctx.refs);
        if !validation.valid {
            outcome.failed += 1;
            outcome.failures.push(RowFailure {
                row: row.row_number(),
                email: row.get(columns::EMAIL).to_string(),
                error: validation.joined_errors(),
            });
            continue;
        }

        let action = match kind {
            ParticipantKind::Delegate => {
                import_delegate_row(store, hasher, &ctx.year, row, &mut outcome).await
            }
            ParticipantKind::Staff => {
                import_staff_row(store, hasher, &ctx.year, &ctx.refs, row, &mut outcome).await
            }
        };

        match action {
            Ok(RowAction::Skipped) => {
                outcome.skipped += 1;
                log_info(
                    &scope,
                    format!(
                        "Row {}: {} already imported, skipping",
                        row.row_number(),
                        row.get(columns::EMAIL)
                    ),
                );
            }
            Ok(RowAction::Imported { temp_password }) => {
                if send_emails && temp_password.is_some() {
                    send_welcome(
                        mailer,
                        &ctx.year,
                        kind,
                        row,
                        temp_password,
                        &mut outcome,
                        &scope,
                    )
                    .await;
                }
                outcome.success += 1;
                log_success(
                    &scope,
                    format!("Row {}: imported {}", row.row_number(), row.get(columns::EMAIL)),
                );
            }
            Err(e) => {
                outcome.failed += 1;
                outcome.failures.push(RowFailure {
                    row: row.row_number(),
                    email: row.get(columns::EMAIL).to_string(),
                    error: e.to_string(),
                });
                log_error(
                    &scope,
                    format!("Row {} failed", row.row_number()),
                    Some(e.to_string()),
                );
            }
        }
    }

    log_success(
        &scope,
        format!(
            "Import finished: {} imported, {} skipped, {} failed",
            outcome.success, outcome.skipped, outcome.failed
        ),
    );

    Ok(outcome)
}

/// Look the user up by email, creating the account (with a fresh temporary
/// password) when absent. Returns the plaintext only for accounts created
/// here.
async fn ensure_user<S: ProgramStore, H: PasswordHasher>(
    store: &S,
    hasher: &H,
    email: &str,
    outcome: &mut ImportOutcome,
) -> StoreResult<(User, Option<String>)> {
    if let Some(user) = store.find_user_by_email(email).await? {
        return Ok((user, None));
    }
    let plaintext = hasher.generate_temp_password();
    let user = store.create_user(email, &hasher.hash(&plaintext)).await?;
    outcome.users_created += 1;
    Ok((user, Some(plaintext)))
}

async fn ensure_program_assignment<S: ProgramStore>(
    store: &S,
    user_id: Uuid,
    program_id: Uuid,
    role: ProgramRole,
) -> StoreResult<()> {
    if store.find_assignment(user_id, program_id).await?.is_none() {
        store.create_assignment(user_id, program_id, role).await?;
    }
    Ok(())
}

async fn import_delegate_row<S: ProgramStore, H: PasswordHasher>(
    store: &S,
    hasher: &H,
    year: &ProgramYear,
    row: &ImportRow,
    outcome: &mut ImportOutcome,
) -> StoreResult<RowAction> {
    let email = row.get(columns::EMAIL).to_lowercase();
    let (user, temp_password) = ensure_user(store, hasher, &email, outcome).await?;

    // Re-submission safety: an existing delegate for this year+email is
    // expected, not an error.
    if store.find_delegate(year.id, &email).await?.is_some() {
        return Ok(RowAction::Skipped);
    }

    // Grouping and party stay empty here; the assignment engine fills them.
    let delegate = store
        .create_delegate(NewDelegate {
            program_year_id: year.id,
            user_id: user.id,
            first_name: row.get(columns::FIRST_NAME).to_string(),
            last_name: row.get(columns::LAST_NAME).to_string(),
            email: email.clone(),
            phone: optional(row.get(columns::PHONE)),
            status: DelegateStatus::PendingAssignment,
        })
        .await?;

    ensure_program_assignment(store, user.id, year.program_id, ProgramRole::Delegate).await?;

    if row.has(columns::PARENT_EMAIL) {
        link_parent(store, hasher, year, row, delegate.id, outcome).await?;
    }

    Ok(RowAction::Imported { temp_password })
}

/// Create-or-reuse the parent user and record, then link the delegate.
/// Every create is preceded by an existence check, so siblings in the same
/// batch share one parent record and re-imports add nothing.
async fn link_parent<S: ProgramStore, H: PasswordHasher>(
    store: &S,
    hasher: &H,
    year: &ProgramYear,
    row: &ImportRow,
    delegate_id: Uuid,
    outcome: &mut ImportOutcome,
) -> StoreResult<()> {
    let parent_email = row.get(columns::PARENT_EMAIL).to_lowercase();
    // Parent credentials are delivered through the password-reset flow, not
    // the participant welcome email, so the plaintext is dropped here.
    let (parent_user, _) = ensure_user(store, hasher, &parent_email, outcome).await?;

    let parent = match store.find_parent(year.id, &parent_email).await? {
        Some(parent) => parent,
        None => {
            let parent = store
                .create_parent(NewParent {
                    program_year_id: year.id,
                    user_id: parent_user.id,
                    first_name: row.get(columns::PARENT_FIRST_NAME).to_string(),
                    last_name: row.get(columns::PARENT_LAST_NAME).to_string(),
                    email: parent_email.clone(),
                    phone: optional(row.get(columns::PARENT_PHONE)),
                })
                .await?;
            outcome.parents_created += 1;
            parent
        }
    };

    store.find_or_create_link(delegate_id, parent.id, year.id).await
}

async fn import_staff_row<S: ProgramStore, H: PasswordHasher>(
    store: &S,
    hasher: &H,
    year: &ProgramYear,
    refs: &ReferenceMaps,
    row: &ImportRow,
    outcome: &mut ImportOutcome,
) -> StoreResult<RowAction> {
    let email = row.get(columns::EMAIL).to_lowercase();
    let (user, temp_password) = ensure_user(store, hasher, &email, outcome).await?;

    if store.find_staff(year.id, &email).await?.is_some() {
        return Ok(RowAction::Skipped);
    }

    // Validation already vetted the role; a miss here is a storage-level
    // inconsistency and fails just this row.
    let role = StaffRole::from_code(row.get(columns::ROLE)).ok_or_else(|| {
        crate::error::StoreError::Backend(format!(
            "unresolvable staff role '{}'",
            row.get(columns::ROLE)
        ))
    })?;

    // Unresolved grouping names import as ungrouped; the preview already
    // warned about them.
    let grouping_id = if row.has(columns::GROUPING_NAME) {
        refs.grouping_by_name(row.get(columns::GROUPING_NAME))
            .map(|g| g.grouping_id)
    } else {
        None
    };

    store
        .create_staff(NewStaff {
            program_year_id: year.id,
            user_id: user.id,
            first_name: row.get(columns::FIRST_NAME).to_string(),
            last_name: row.get(columns::LAST_NAME).to_string(),
            email,
            phone: optional(row.get(columns::PHONE)),
            role,
            grouping_id,
        })
        .await?;

    ensure_program_assignment(store, user.id, year.program_id, role.program_role()).await?;

    Ok(RowAction::Imported { temp_password })
}

async fn send_welcome<M: WelcomeMailer>(
    mailer: &M,
    year: &ProgramYear,
    kind: ParticipantKind,
    row: &ImportRow,
    temp_password: Option<String>,
    outcome: &mut ImportOutcome,
    scope: &str,
) {
    let mail = WelcomeEmail {
        program_id: year.program_id,
        email: row.get(columns::EMAIL).to_lowercase(),
        first_name: row.get(columns::FIRST_NAME).to_string(),
        last_name: row.get(columns::LAST_NAME).to_string(),
        program_name: year.program_name.clone(),
        year: year.year,
        kind,
        role_label: match kind {
            ParticipantKind::Staff => {
                StaffRole::from_code(row.get(columns::ROLE)).map(|r| r.label().to_string())
            }
            ParticipantKind::Delegate => None,
        },
        temp_password,
    };

    match mailer.send_welcome_email(&mail).await {
        Ok(true) => outcome.emails_sent += 1,
        Ok(false) => {
            outcome.emails_failed += 1;
            log_warning(scope, format!("Welcome email to {} was not sent", mail.email));
        }
        Err(e) => {
            outcome.emails_failed += 1;
            log_warning(
                scope,
                format!("Welcome email to {} failed: {}", mail.email, e),
            );
        }
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Sha256PasswordHasher;
    use crate::email::testing::RecordingMailer;
    use crate::email::NullMailer;
    use crate::error::{MailError, RequestError};
    use crate::store::{IdentityStore, MemoryStore, ParticipantStore};

    const DELEGATE_HEADER: &str =
        "firstName,lastName,email,phone,parentFirstName,parentLastName,parentEmail,parentPhone";
    const STAFF_HEADER: &str = "firstName,lastName,email,phone,role,groupingName";

    fn setup() -> (MemoryStore, crate::models::ProgramYear, Caller) {
        let store = MemoryStore::new();
        let py = store.seed_program_year("Youth Assembly", 2026);
        let caller = Caller::program_admin(Uuid::new_v4(), [py.program_id]);
        (store, py, caller)
    }

    async fn run_delegates(
        store: &MemoryStore,
        caller: &Caller,
        year_id: Uuid,
        csv: &str,
    ) -> ImportOutcome {
        execute_import(
            store,
            &Sha256PasswordHasher,
            &NullMailer,
            caller,
            year_id,
            ParticipantKind::Delegate,
            csv,
            false,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_delegate_with_parent() {
        let (store, py, caller) = setup();
        let csv = format!(
            "{DELEGATE_HEADER}\nJohn,Doe,john@test.com,555-1234,Jane,Doe,parent@test.com,555-5678"
        );

        let outcome = run_delegates(&store, &caller, py.id, &csv).await;

        assert_eq!(outcome.success, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.users_created, 2);
        assert_eq!(outcome.parents_created, 1);
        assert_eq!(store.delegate_count(py.id), 1);
        assert_eq!(store.parent_count(py.id), 1);
        assert_eq!(store.link_count(), 1);

        // Program assignment for the delegate's user, with the delegate role.
        let assignments = store.assignments_for_program(py.program_id);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].role, ProgramRole::Delegate);
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let (store, py, caller) = setup();
        let csv = format!(
            "{DELEGATE_HEADER}\nJohn,Doe,john@test.com,555-1234,Jane,Doe,parent@test.com,555-5678"
        );

        run_delegates(&store, &caller, py.id, &csv).await;
        let second = run_delegates(&store, &caller, py.id, &csv).await;

        assert_eq!(second.success, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.users_created, 0);
        assert_eq!(second.parents_created, 0);
        // No duplicate rows anywhere.
        assert_eq!(store.delegate_count(py.id), 1);
        assert_eq!(store.parent_count(py.id), 1);
        assert_eq!(store.link_count(), 1);
    }

    #[tokio::test]
    async fn test_siblings_share_one_parent_record() {
        let (store, py, caller) = setup();
        let csv = format!(
            "{DELEGATE_HEADER}\n\
             John,Doe,john@test.com,,Jane,Doe,parent@test.com,\n\
             Jim,Doe,jim@test.com,,Jane,Doe,parent@test.com,"
        );

        let outcome = run_delegates(&store, &caller, py.id, &csv).await;

        assert_eq!(outcome.success, 2);
        // Parent user + record created once, linked twice.
        assert_eq!(outcome.parents_created, 1);
        assert_eq!(outcome.users_created, 3);
        assert_eq!(store.parent_count(py.id), 1);
        assert_eq!(store.link_count(), 2);
    }

    #[tokio::test]
    async fn test_row_failure_does_not_stop_batch() {
        let (store, py, caller) = setup();
        store.fail_delegate_create_for("row2@test.com");
        let csv = format!(
            "{DELEGATE_HEADER}\n\
             One,Row,row1@test.com,,,,,\n\
             Two,Row,row2@test.com,,,,,\n\
             Three,Row,row3@test.com,,,,,"
        );

        let outcome = run_delegates(&store, &caller, py.id, &csv).await;

        assert_eq!(outcome.success, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].email, "row2@test.com");
        // The failed row's delegate was never created.
        assert_eq!(store.delegate_count(py.id), 2);
        assert!(store
            .find_delegate(py.id, "row2@test.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_invalid_rows_counted_failed_with_joined_messages() {
        let (store, py, caller) = setup();
        let csv = format!(
            "{DELEGATE_HEADER}\n\
             ,Doe,not-an-email,,,,,\n\
             John,Doe,john@test.com,,,,,"
        );

        let outcome = run_delegates(&store, &caller, py.id, &csv).await;

        assert_eq!(outcome.success, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failures[0].row, 2);
        assert!(outcome.failures[0].error.contains("firstName is required"));
        assert!(outcome.failures[0].error.contains("Invalid email format"));
    }

    #[tokio::test]
    async fn test_staff_import_roles_and_grouping() {
        let (store, py, caller) = setup();
        let franklin = store.activate_grouping(py.id, "Franklin County", true);

        let csv = format!(
            "{STAFF_HEADER}\n\
             Ann,Lead,ann@test.com,,administrator,\n\
             Pat,Smith,pat@test.com,,counselor,franklin county\n\
             Sam,Jones,sam@test.com,,advisor,Atlantis"
        );
        let outcome = execute_import(
            &store,
            &Sha256PasswordHasher,
            &NullMailer,
            &caller,
            py.id,
            ParticipantKind::Staff,
            &csv,
            false,
        )
        .await
        .unwrap();

        assert_eq!(outcome.success, 3);
        let staff = store.staff_for_year(py.id);
        assert_eq!(staff.len(), 3);

        let pat = staff.iter().find(|s| s.email == "pat@test.com").unwrap();
        assert_eq!(pat.grouping_id, Some(franklin.grouping_id));
        // Unknown grouping imports ungrouped.
        let sam = staff.iter().find(|s| s.email == "sam@test.com").unwrap();
        assert_eq!(sam.grouping_id, None);

        // Administrator maps to the admin program role, others to staff.
        let assignments = store.assignments_for_program(py.program_id);
        let ann_user = store.find_user_by_email("ann@test.com").await.unwrap().unwrap();
        let ann_row = assignments.iter().find(|a| a.user_id == ann_user.id).unwrap();
        assert_eq!(ann_row.role, ProgramRole::Admin);
        let pat_user = store.find_user_by_email("pat@test.com").await.unwrap().unwrap();
        let pat_row = assignments.iter().find(|a| a.user_id == pat_user.id).unwrap();
        assert_eq!(pat_row.role, ProgramRole::Staff);
    }

    #[tokio::test]
    async fn test_welcome_emails_only_for_new_accounts() {
        let (store, py, caller) = setup();
        // jane already has an account; no temp password, no email.
        store.create_user("jane@test.com", "hash").await.unwrap();
        let mailer = RecordingMailer::new();

        let csv = format!(
            "{DELEGATE_HEADER}\n\
             John,Doe,john@test.com,,,,,\n\
             Jane,Roe,jane@test.com,,,,,"
        );
        let outcome = execute_import(
            &store,
            &Sha256PasswordHasher,
            &mailer,
            &caller,
            py.id,
            ParticipantKind::Delegate,
            &csv,
            true,
        )
        .await
        .unwrap();

        assert_eq!(outcome.success, 2);
        assert_eq!(outcome.emails_sent, 1);
        assert_eq!(outcome.emails_failed, 0);
        assert_eq!(mailer.sent_count(), 1);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].email, "john@test.com");
        assert!(sent[0].temp_password.is_some());
    }

    #[tokio::test]
    async fn test_email_failures_never_fail_the_row() {
        let (store, py, caller) = setup();
        let mailer = RecordingMailer::new();
        mailer.script(Ok(false));
        mailer.script(Err(MailError::Transport("smtp down".into())));

        let csv = format!(
            "{DELEGATE_HEADER}\n\
             One,Row,row1@test.com,,,,,\n\
             Two,Row,row2@test.com,,,,,"
        );
        let outcome = execute_import(
            &store,
            &Sha256PasswordHasher,
            &mailer,
            &caller,
            py.id,
            ParticipantKind::Delegate,
            &csv,
            true,
        )
        .await
        .unwrap();

        assert_eq!(outcome.success, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.emails_sent, 0);
        assert_eq!(outcome.emails_failed, 2);
        assert_eq!(store.delegate_count(py.id), 2);
    }

    #[tokio::test]
    async fn test_preconditions() {
        let (store, py, caller) = setup();

        let err = run_delegates_err(&store, &caller, Uuid::new_v4(), "a,b\n1,2").await;
        assert!(matches!(err, RequestError::NotFound(_)));

        let outsider = Caller::member(Uuid::new_v4());
        let err = run_delegates_err(&store, &outsider, py.id, "a,b\n1,2").await;
        assert!(matches!(err, RequestError::Forbidden(_)));

        let err = run_delegates_err(&store, &caller, py.id, "").await;
        assert!(matches!(err, RequestError::BadRequest(_)));
    }

    async fn run_delegates_err(
        store: &MemoryStore,
        caller: &Caller,
        year_id: Uuid,
        csv: &str,
    ) -> RequestError {
        execute_import(
            store,
            &Sha256PasswordHasher,
            &NullMailer,
            caller,
            year_id,
            ParticipantKind::Delegate,
            csv,
            false,
        )
        .await
        .unwrap_err()
    }
}
