//! Dry-run preview of a roster upload.
//!
//! Validates every row without touching storage and aggregates what an
//! import would do: valid/invalid totals, new versus existing accounts, new
//! parent records, and the flattened error/warning lists. The annotated row
//! listing is capped at [`PREVIEW_ROW_LIMIT`] entries; the counts always
//! cover the whole file.

use uuid::Uuid;

use crate::auth::Caller;
use crate::error::RequestResult;
use crate::logs::log_info;
use crate::models::{ImportPreview, ParticipantKind, PreviewRow, RowStatus};
use crate::store::ProgramStore;
use crate::validation::columns;

use super::{resolve_context, validate_row};

/// Hard cap on the annotated row listing. Not configurable: the preview is a
/// UI sanity check, the counts are the contract.
pub const PREVIEW_ROW_LIMIT: usize = 100;

/// Preview a roster upload without writing anything.
pub async fn preview_import<S: ProgramStore>(
    store: &S,
    caller: &Caller,
    program_year_id: Uuid,
    kind: ParticipantKind,
    csv_text: &str,
) -> RequestResult<ImportPreview> {
    let ctx = resolve_context(store, caller, program_year_id, csv_text).await?;
    let scope = program_year_id.to_string();

    let mut result = ImportPreview {
        total_rows: ctx.table.rows.len(),
        valid_rows: 0,
        new_users: 0,
        existing_users: 0,
        new_parents: 0,
        errors: Vec::new(),
        warnings: Vec::new(),
        preview: Vec::new(),
    };

    for row in &ctx.table.rows {
        let validation = validate_row(kind, row, &ctx.refs);
        let email = row.get(columns::EMAIL);
        let known = ctx.refs.is_known_email(email);

        if validation.valid {
            result.valid_rows += 1;
            if known {
                result.existing_users += 1;
            } else {
                result.new_users += 1;
            }
            // Counted per row occurrence: two rows naming the same new
            // parent email both count (deduplication happens at import).
            if kind == ParticipantKind::Delegate
                && row.has(columns::PARENT_EMAIL)
                && !ctx.refs.is_known_email(row.get(columns::PARENT_EMAIL))
            {
                result.new_parents += 1;
            }
        }

        result.errors.extend(validation.errors);
        result.warnings.extend(validation.warnings);

        if result.preview.len() < PREVIEW_ROW_LIMIT {
            result.preview.push(PreviewRow {
                row: row.row_number(),
                first_name: row.get(columns::FIRST_NAME).to_string(),
                last_name: row.get(columns::LAST_NAME).to_string(),
                email: email.to_string(),
                status: if known { RowStatus::Existing } else { RowStatus::New },
                valid: validation.valid,
            });
        }
    }

    log_info(
        &scope,
        format!(
            "Previewed {} roster: {} rows, {} valid, {} errors",
            kind.as_code(),
            result.total_rows,
            result.valid_rows,
            result.errors.len()
        ),
    );

    Ok(result)
}
