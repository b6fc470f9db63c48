//! Request-scoped caller identity and authorization checks.
//!
//! The caller is an explicit value threaded into every service entry point,
//! never ambient module state. Authorization here is a single question: may
//! this caller administer the program that owns the target program year?

use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{RequestError, RequestResult};
use crate::models::ProgramYear;

/// The authenticated operator making a request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Uuid,
    admin_programs: HashSet<Uuid>,
}

impl Caller {
    /// A caller with admin rights on the given programs.
    pub fn program_admin(user_id: Uuid, programs: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            user_id,
            admin_programs: programs.into_iter().collect(),
        }
    }

    /// A caller with no admin rights anywhere.
    pub fn member(user_id: Uuid) -> Self {
        Self {
            user_id,
            admin_programs: HashSet::new(),
        }
    }

    pub fn can_admin(&self, program_id: Uuid) -> bool {
        self.admin_programs.contains(&program_id)
    }
}

/// Fail with `Forbidden` unless the caller administers the year's program.
pub fn ensure_program_admin(caller: &Caller, year: &ProgramYear) -> RequestResult<()> {
    if caller.can_admin(year.program_id) {
        Ok(())
    } else {
        Err(RequestError::Forbidden(format!(
            "caller is not an administrator of {}",
            year.program_name
        )))
    }
}
