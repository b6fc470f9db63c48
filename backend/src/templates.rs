//! CSV templates handed to operators.
//!
//! Embedded at compile time from `templates/`. The leading `#` lines are
//! instructions and examples; the parser strips them, so a template filled in
//! without deleting them still imports cleanly.

use crate::models::ParticipantKind;

/// The delegate roster template.
pub fn delegate_template() -> &'static str {
    include_str!("../templates/delegates.csv")
}

/// The staff roster template.
pub fn staff_template() -> &'static str {
    include_str!("../templates/staff.csv")
}

/// Template for a participant kind.
pub fn template_for(kind: ParticipantKind) -> &'static str {
    match kind {
        ParticipantKind::Delegate => delegate_template(),
        ParticipantKind::Staff => staff_template(),
    }
}
