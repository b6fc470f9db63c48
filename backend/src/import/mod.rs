//! Roster upload pipeline: dry-run preview and committing import.
//!
//! Both entry points share the same preconditions, resolved in order:
//!
//! 1. the program year must exist (`NotFound`)
//! 2. the caller must administer the owning program (`Forbidden`)
//! 3. the CSV text must yield at least one data row (`BadRequest`)
//!
//! After that, [`preview::preview_import`] only reads, while
//! [`executor::execute_import`] replays the same validation row by row and
//! writes, isolating each row's failures.

use uuid::Uuid;

use crate::auth::{ensure_program_admin, Caller};
use crate::error::{RequestError, RequestResult};
use crate::models::{ParticipantKind, ProgramYear};
use crate::parser::{parse_table, CsvTable, ImportRow, DEFAULT_DELIMITER};
use crate::reference::ReferenceMaps;
use crate::store::ProgramStore;
use crate::validation::{validate_delegate_row, validate_staff_row, RowValidation};

pub mod executor;
pub mod preview;

pub use executor::execute_import;
pub use preview::{preview_import, PREVIEW_ROW_LIMIT};

/// Resolved request state shared by preview and execution.
pub(crate) struct ImportContext {
    pub year: ProgramYear,
    pub table: CsvTable,
    pub refs: ReferenceMaps,
}

pub(crate) async fn resolve_context<S: ProgramStore>(
    store: &S,
    caller: &Caller,
    program_year_id: Uuid,
    csv_text: &str,
) -> RequestResult<ImportContext> {
    let year = store
        .find_program_year(program_year_id)
        .await?
        .ok_or_else(|| RequestError::NotFound(format!("program year {program_year_id}")))?;

    ensure_program_admin(caller, &year)?;

    if csv_text.trim().is_empty() {
        return Err(RequestError::BadRequest("CSV content is empty".into()));
    }
    let table = parse_table(csv_text, DEFAULT_DELIMITER);
    if table.is_empty() {
        return Err(RequestError::BadRequest("CSV contains no data rows".into()));
    }

    let refs = ReferenceMaps::load(store, program_year_id, &table.rows).await?;

    Ok(ImportContext { year, table, refs })
}

/// Run the kind-appropriate validator over one row.
pub(crate) fn validate_row(
    kind: ParticipantKind,
    row: &ImportRow,
    refs: &ReferenceMaps,
) -> RowValidation {
    match kind {
        ParticipantKind::Delegate => validate_delegate_row(row),
        ParticipantKind::Staff => validate_staff_row(row, refs),
    }
}
