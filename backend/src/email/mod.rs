//! Welcome-email collaborator interface.
//!
//! Delivery is out of scope; the executor only needs a narrow seam. The
//! contract mirrors how the executor accounts for outcomes: `Ok(true)` is a
//! sent mail, while `Ok(false)` and `Err(_)` both count as failures and are
//! never fatal to the row that triggered them.

#![allow(async_fn_in_trait)]

use uuid::Uuid;

use crate::error::MailResult;
use crate::models::ParticipantKind;

/// Everything a welcome email is rendered from.
#[derive(Debug, Clone)]
pub struct WelcomeEmail {
    pub program_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub program_name: String,
    pub year: i32,
    pub kind: ParticipantKind,
    /// Staff role label, when the recipient is staff.
    pub role_label: Option<String>,
    /// Present when an account was created for the recipient this row.
    pub temp_password: Option<String>,
}

/// Sends welcome emails to newly imported participants.
pub trait WelcomeMailer {
    /// Attempt delivery. `Ok(false)` means the provider declined without
    /// raising an error; callers treat it like `Err(_)`.
    async fn send_welcome_email(&self, mail: &WelcomeEmail) -> MailResult<bool>;
}

/// Discards every mail and reports it as not sent.
#[derive(Debug, Default)]
pub struct NullMailer;

impl WelcomeMailer for NullMailer {
    async fn send_welcome_email(&self, _mail: &WelcomeEmail) -> MailResult<bool> {
        Ok(false)
    }
}
