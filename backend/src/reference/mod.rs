//! Per-year lookup tables for validation, import and assignment.
//!
//! [`ReferenceMaps`] is built once per request from three sources:
//!
//! - active groupings, filtered to the assignment level and deduplicated by
//!   grouping id (activation rows can be duplicated; the first occurrence
//!   wins and insertion order is preserved)
//! - active parties, deduplicated the same way
//! - the set of uploaded emails that already have accounts, lower-cased
//!
//! Name lookups are case-insensitive. The ordered grouping/party slices are
//! what the assignment engine iterates, so their order is the tie-break
//! order for balancing.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{GroupingRef, PartyRef};
use crate::parser::ImportRow;
use crate::store::ReferenceStore;
use crate::validation::columns;

/// Request-scoped lookup tables for one program year.
#[derive(Debug, Default)]
pub struct ReferenceMaps {
    groupings: Vec<GroupingRef>,
    grouping_index: HashMap<String, usize>,
    parties: Vec<PartyRef>,
    party_index: HashMap<String, usize>,
    known_emails: HashSet<String>,
}

impl ReferenceMaps {
    /// Build the maps for a program year.
    ///
    /// `rows` supplies the emails to classify as new/existing; pass `&[]`
    /// when only groupings and parties are needed (assignment runs).
    pub async fn load<S: ReferenceStore>(
        store: &S,
        program_year_id: Uuid,
        rows: &[ImportRow],
    ) -> StoreResult<Self> {
        let mut maps = Self::default();

        for grouping in store.list_active_groupings_for_year(program_year_id).await? {
            if grouping.is_assignment_level {
                maps.push_grouping(grouping);
            }
        }
        for party in store.list_active_parties_for_year(program_year_id).await? {
            maps.push_party(party);
        }

        let mut emails = Vec::new();
        for row in rows {
            for column in [columns::EMAIL, columns::PARENT_EMAIL] {
                if row.has(column) {
                    emails.push(row.get(column).to_lowercase());
                }
            }
        }
        if !emails.is_empty() {
            maps.known_emails = store.filter_known_emails(&emails).await?;
        }

        Ok(maps)
    }

    /// Add a grouping unless its id was already seen (first occurrence wins).
    pub fn push_grouping(&mut self, grouping: GroupingRef) {
        if self.groupings.iter().any(|g| g.grouping_id == grouping.grouping_id) {
            return;
        }
        let key = grouping.name.to_lowercase();
        let idx = self.groupings.len();
        self.groupings.push(grouping);
        self.grouping_index.entry(key).or_insert(idx);
    }

    /// Add a party unless its id was already seen (first occurrence wins).
    pub fn push_party(&mut self, party: PartyRef) {
        if self.parties.iter().any(|p| p.party_id == party.party_id) {
            return;
        }
        let key = party.name.to_lowercase();
        let idx = self.parties.len();
        self.parties.push(party);
        self.party_index.entry(key).or_insert(idx);
    }

    pub fn add_known_email(&mut self, email: &str) {
        self.known_emails.insert(email.to_lowercase());
    }

    /// Assignment-level groupings in activation order.
    pub fn groupings(&self) -> &[GroupingRef] {
        &self.groupings
    }

    /// Active parties in activation order.
    pub fn parties(&self) -> &[PartyRef] {
        &self.parties
    }

    pub fn grouping_by_name(&self, name: &str) -> Option<&GroupingRef> {
        self.grouping_index
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.groupings[i])
    }

    pub fn party_by_name(&self, name: &str) -> Option<&PartyRef> {
        self.party_index
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.parties[i])
    }

    /// True when this email already has an account.
    pub fn is_known_email(&self, email: &str) -> bool {
        self.known_emails.contains(&email.to_lowercase())
    }
}
