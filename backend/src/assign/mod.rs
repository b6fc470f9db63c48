//! Balanced random assignment of delegates to (grouping, party) pairs.
//!
//! Both entry points recompute everything fresh from storage: nothing is
//! carried between a preview and the commit that follows it.
//!
//! The algorithm: seed load counters from already-assigned delegates, shuffle
//! the unassigned pool uniformly (Fisher-Yates), then place each delegate
//! greedily into the globally least-loaded grouping and, within it, the
//! least-loaded party. Counters are incremented immediately, so every
//! decision sees the ones before it. Ties go to the first minimum in
//! activation order, which keeps a run reproducible for a fixed shuffle.
//!
//! The shuffle decides *which* delegate lands in a tie-broken slot, never the
//! final load distribution - that is fixed by the greedy rule.

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::auth::{ensure_program_admin, Caller};
use crate::error::{RequestError, RequestResult};
use crate::logs::{log_error, log_info, log_success};
use crate::models::{
    AssignmentFailure, AssignmentPreview, AssignmentResult, Delegate, DelegateStatus,
    GroupingLoad, GroupingRef, PartyLoad, PartyRef, PlannedAssignment,
};
use crate::reference::ReferenceMaps;
use crate::store::ProgramStore;

/// Hard cap on the per-delegate listing in previews; summaries always cover
/// the whole pool.
pub const ASSIGNMENT_PREVIEW_LIMIT: usize = 50;

/// Preview a balanced assignment pass without persisting anything.
pub async fn preview_assignment<S: ProgramStore>(
    store: &S,
    caller: &Caller,
    program_year_id: Uuid,
) -> RequestResult<AssignmentPreview> {
    let mut rng = rand::thread_rng();
    preview_with_rng(store, caller, program_year_id, &mut rng).await
}

/// Run a balanced assignment pass and persist every placement.
pub async fn commit_assignment<S: ProgramStore>(
    store: &S,
    caller: &Caller,
    program_year_id: Uuid,
) -> RequestResult<AssignmentResult> {
    let mut rng = rand::thread_rng();
    commit_with_rng(store, caller, program_year_id, &mut rng).await
}

async fn preview_with_rng<S: ProgramStore>(
    store: &S,
    caller: &Caller,
    program_year_id: Uuid,
    rng: &mut impl Rng,
) -> RequestResult<AssignmentPreview> {
    let plan = build_plan(store, caller, program_year_id, rng).await?;

    let assignments = plan
        .planned
        .iter()
        .take(ASSIGNMENT_PREVIEW_LIMIT)
        .map(|(delegate, gi, pi)| plan.planned_assignment(delegate, *gi, *pi))
        .collect();

    Ok(AssignmentPreview {
        already_assigned: plan.already_assigned,
        unassigned: plan.planned.len(),
        assignments,
        groupings: plan.grouping_loads(),
        parties: plan.party_loads(),
    })
}

async fn commit_with_rng<S: ProgramStore>(
    store: &S,
    caller: &Caller,
    program_year_id: Uuid,
    rng: &mut impl Rng,
) -> RequestResult<AssignmentResult> {
    let plan = build_plan(store, caller, program_year_id, rng).await?;
    let scope = program_year_id.to_string();
    log_info(
        &scope,
        format!(
            "Assigning {} delegates across {} groupings and {} parties",
            plan.planned.len(),
            plan.groupings.len(),
            plan.parties.len()
        ),
    );

    let mut assigned = 0;
    let mut failures = Vec::new();

    for (delegate, gi, pi) in &plan.planned {
        let grouping = &plan.groupings[*gi];
        let party = &plan.parties[*pi];
        // Placement activates pending delegates; anyone else keeps their
        // current status.
        let status = match delegate.status {
            DelegateStatus::PendingAssignment => DelegateStatus::Active,
            other => other,
        };

        match store
            .update_delegate_placement(delegate.id, grouping.grouping_id, party.party_id, status)
            .await
        {
            Ok(()) => {
                assigned += 1;
                log_info(
                    &scope,
                    format!(
                        "Assigned {} {} to {} / {}",
                        delegate.first_name, delegate.last_name, grouping.name, party.name
                    ),
                );
            }
            Err(e) => {
                failures.push(AssignmentFailure {
                    delegate_id: delegate.id,
                    email: delegate.email.clone(),
                    error: e.to_string(),
                });
                log_error(
                    &scope,
                    format!("Failed to assign {}", delegate.email),
                    Some(e.to_string()),
                );
            }
        }
    }

    log_success(
        &scope,
        format!("Assignment finished: {} assigned, {} failed", assigned, failures.len()),
    );

    Ok(AssignmentResult {
        assigned,
        failed: failures.len(),
        groupings: plan.grouping_loads(),
        parties: plan.party_loads(),
        failures,
    })
}

// =============================================================================
// Planning
// =============================================================================

struct Plan {
    groupings: Vec<GroupingRef>,
    parties: Vec<PartyRef>,
    /// Delegate plus indexes into `groupings` / `parties`.
    planned: Vec<(Delegate, usize, usize)>,
    already_assigned: usize,
    counters: LoadCounters,
}

async fn build_plan<S: ProgramStore>(
    store: &S,
    caller: &Caller,
    program_year_id: Uuid,
    rng: &mut impl Rng,
) -> RequestResult<Plan> {
    let year = store
        .find_program_year(program_year_id)
        .await?
        .ok_or_else(|| RequestError::NotFound(format!("program year {program_year_id}")))?;
    ensure_program_admin(caller, &year)?;

    let refs = ReferenceMaps::load(store, program_year_id, &[]).await?;
    let groupings = refs.groupings().to_vec();
    let parties = refs.parties().to_vec();
    if groupings.is_empty() {
        return Err(RequestError::BadRequest(
            "no assignment-level groupings are active for this program year".into(),
        ));
    }
    if parties.is_empty() {
        return Err(RequestError::BadRequest(
            "no parties are active for this program year".into(),
        ));
    }

    let delegates = store.list_delegates_for_year(program_year_id).await?;
    let (assigned, mut unassigned): (Vec<_>, Vec<_>) = delegates
        .into_iter()
        .filter(|d| d.status != DelegateStatus::Withdrawn)
        .partition(Delegate::is_assigned);

    if unassigned.is_empty() {
        return Err(RequestError::BadRequest(
            "no unassigned delegates in this program year".into(),
        ));
    }

    let mut counters = LoadCounters::new(&groupings, &parties);
    for delegate in &assigned {
        counters.seed(delegate);
    }

    unassigned.shuffle(rng);

    let planned = unassigned
        .into_iter()
        .map(|delegate| {
            let (gi, pi) = counters.place();
            (delegate, gi, pi)
        })
        .collect();

    Ok(Plan {
        groupings,
        parties,
        planned,
        already_assigned: assigned.len(),
        counters,
    })
}

impl Plan {
    fn planned_assignment(&self, delegate: &Delegate, gi: usize, pi: usize) -> PlannedAssignment {
        PlannedAssignment {
            delegate_id: delegate.id,
            first_name: delegate.first_name.clone(),
            last_name: delegate.last_name.clone(),
            email: delegate.email.clone(),
            grouping_id: self.groupings[gi].grouping_id,
            grouping_name: self.groupings[gi].name.clone(),
            party_id: self.parties[pi].party_id,
            party_name: self.parties[pi].name.clone(),
        }
    }

    fn grouping_loads(&self) -> Vec<GroupingLoad> {
        self.groupings
            .iter()
            .enumerate()
            .map(|(gi, grouping)| GroupingLoad {
                grouping_id: grouping.grouping_id,
                name: grouping.name.clone(),
                existing: self.counters.grouping_existing[gi],
                new: self.counters.grouping_new[gi],
                total: self.counters.grouping_total[gi],
            })
            .collect()
    }

    fn party_loads(&self) -> Vec<PartyLoad> {
        self.parties
            .iter()
            .enumerate()
            .map(|(pi, party)| PartyLoad {
                party_id: party.party_id,
                name: party.name.clone(),
                existing: self.counters.party_existing[pi],
                new: self.counters.party_new[pi],
                total: self.counters.party_existing[pi] + self.counters.party_new[pi],
            })
            .collect()
    }
}

// =============================================================================
// Load counters
// =============================================================================

/// Nested load counts, seeded from assigned delegates and mutated in place
/// as placements are made. Every active (grouping, party) pair has a cell,
/// even at zero.
struct LoadCounters {
    grouping_ids: Vec<Uuid>,
    party_ids: Vec<Uuid>,
    /// Total delegates per grouping, existing plus placed this run.
    grouping_total: Vec<usize>,
    /// Per-grouping, per-party counts.
    grouping_party: Vec<Vec<usize>>,
    grouping_existing: Vec<usize>,
    grouping_new: Vec<usize>,
    party_existing: Vec<usize>,
    party_new: Vec<usize>,
}

impl LoadCounters {
    fn new(groupings: &[GroupingRef], parties: &[PartyRef]) -> Self {
        Self {
            grouping_ids: groupings.iter().map(|g| g.grouping_id).collect(),
            party_ids: parties.iter().map(|p| p.party_id).collect(),
            grouping_total: vec![0; groupings.len()],
            grouping_party: vec![vec![0; parties.len()]; groupings.len()],
            grouping_existing: vec![0; groupings.len()],
            grouping_new: vec![0; groupings.len()],
            party_existing: vec![0; parties.len()],
            party_new: vec![0; parties.len()],
        }
    }

    /// Count one already-assigned delegate. Placements referencing inactive
    /// groupings or parties fall outside the counter cells and are ignored.
    fn seed(&mut self, delegate: &Delegate) {
        let gi = delegate
            .grouping_id
            .and_then(|id| self.grouping_ids.iter().position(|&g| g == id));
        let pi = delegate
            .party_id
            .and_then(|id| self.party_ids.iter().position(|&p| p == id));

        if let Some(gi) = gi {
            self.grouping_total[gi] += 1;
            self.grouping_existing[gi] += 1;
            if let Some(pi) = pi {
                self.grouping_party[gi][pi] += 1;
            }
        }
        if let Some(pi) = pi {
            self.party_existing[pi] += 1;
        }
    }

    /// Place one delegate: globally least-loaded grouping, then least-loaded
    /// party within it. First minimum wins; counters update immediately.
    fn place(&mut self) -> (usize, usize) {
        let gi = first_min(&self.grouping_total);
        let pi = first_min(&self.grouping_party[gi]);

        self.grouping_total[gi] += 1;
        self.grouping_party[gi][pi] += 1;
        self.grouping_new[gi] += 1;
        self.party_new[pi] += 1;

        (gi, pi)
    }
}

/// Index of the first minimum. Never called on an empty slice: eligibility
/// is checked before planning starts. Linear scan per placement; a heap
/// would not change the resulting distribution, only the scan cost.
fn first_min(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &count) in counts.iter().enumerate() {
        if count < counts[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProgramYear;
    use crate::store::{MemoryStore, NewDelegate, ParticipantStore};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn setup() -> (MemoryStore, ProgramYear, Caller) {
        let store = MemoryStore::new();
        let py = store.seed_program_year("Youth Assembly", 2026);
        let caller = Caller::program_admin(Uuid::new_v4(), [py.program_id]);
        (store, py, caller)
    }

    async fn add_delegate(
        store: &MemoryStore,
        py: &ProgramYear,
        email: &str,
        status: DelegateStatus,
    ) -> Delegate {
        store
            .create_delegate(NewDelegate {
                program_year_id: py.id,
                user_id: Uuid::new_v4(),
                first_name: "Test".into(),
                last_name: email.split('@').next().unwrap_or("x").to_string(),
                email: email.into(),
                phone: None,
                status,
            })
            .await
            .unwrap()
    }

    async fn grouping_totals(store: &MemoryStore, py: &ProgramYear) -> HashMap<Uuid, usize> {
        let mut totals = HashMap::new();
        for delegate in store.list_delegates_for_year(py.id).await.unwrap() {
            if let Some(g) = delegate.grouping_id {
                *totals.entry(g).or_insert(0) += 1;
            }
        }
        totals
    }

    #[tokio::test]
    async fn test_balanced_load_from_empty() {
        let (store, py, caller) = setup();
        for name in ["Franklin", "Hamilton", "Lincoln"] {
            store.activate_grouping(py.id, name, true);
        }
        store.activate_party(py.id, "Federalist", Some("#d22"));
        store.activate_party(py.id, "Nationalist", Some("#22d"));
        for i in 0..10 {
            add_delegate(&store, &py, &format!("d{i}@test.com"), DelegateStatus::PendingAssignment)
                .await;
        }

        let mut rng = StdRng::seed_from_u64(7);
        let result = commit_with_rng(&store, &caller, py.id, &mut rng).await.unwrap();
        assert_eq!(result.assigned, 10);
        assert_eq!(result.failed, 0);

        // Grouping totals differ by at most one.
        let totals = grouping_totals(&store, &py).await;
        assert_eq!(totals.values().sum::<usize>(), 10);
        let max = totals.values().max().unwrap();
        let min = totals.values().min().unwrap();
        assert!(max - min <= 1, "grouping totals skewed: {totals:?}");

        // Within every grouping, party counts differ by at most one, and
        // every delegate is active with both dimensions set.
        let mut party_per_grouping: HashMap<Uuid, HashMap<Uuid, usize>> = HashMap::new();
        for delegate in store.list_delegates_for_year(py.id).await.unwrap() {
            assert!(delegate.is_assigned());
            assert_eq!(delegate.status, DelegateStatus::Active);
            *party_per_grouping
                .entry(delegate.grouping_id.unwrap())
                .or_default()
                .entry(delegate.party_id.unwrap())
                .or_insert(0) += 1;
        }
        for (grouping, parties) in party_per_grouping {
            let max = parties.values().max().unwrap();
            let min = parties.values().min().unwrap();
            assert!(max - min <= 1, "party counts skewed in {grouping}: {parties:?}");
        }
    }

    #[tokio::test]
    async fn test_existing_load_is_respected() {
        let (store, py, caller) = setup();
        let full = store.activate_grouping(py.id, "Crowded", true);
        store.activate_grouping(py.id, "EmptyA", true);
        store.activate_grouping(py.id, "EmptyB", true);
        let party = store.activate_party(py.id, "Federalist", None);

        // Five delegates already sit in Crowded.
        for i in 0..5 {
            let d = add_delegate(&store, &py, &format!("old{i}@test.com"), DelegateStatus::Active)
                .await;
            store.place_delegate(d.id, Some(full.grouping_id), Some(party.party_id));
        }
        for i in 0..4 {
            add_delegate(&store, &py, &format!("new{i}@test.com"), DelegateStatus::PendingAssignment)
                .await;
        }

        let mut rng = StdRng::seed_from_u64(11);
        let result = commit_with_rng(&store, &caller, py.id, &mut rng).await.unwrap();
        assert_eq!(result.assigned, 4);

        // All four go to the empty groupings, two each.
        let totals = grouping_totals(&store, &py).await;
        assert_eq!(totals[&full.grouping_id], 5);
        let mut new_loads: Vec<usize> = totals
            .iter()
            .filter(|(id, _)| **id != full.grouping_id)
            .map(|(_, n)| *n)
            .collect();
        new_loads.sort_unstable();
        assert_eq!(new_loads, vec![2, 2]);

        let crowded = result.groupings.iter().find(|g| g.name == "Crowded").unwrap();
        assert_eq!(crowded.existing, 5);
        assert_eq!(crowded.new, 0);
    }

    #[tokio::test]
    async fn test_preview_is_pure_and_capped() {
        let (store, py, caller) = setup();
        store.activate_grouping(py.id, "Franklin", true);
        store.activate_party(py.id, "Federalist", None);
        for i in 0..60 {
            add_delegate(&store, &py, &format!("d{i}@test.com"), DelegateStatus::PendingAssignment)
                .await;
        }

        let mut rng = StdRng::seed_from_u64(3);
        let preview = preview_with_rng(&store, &caller, py.id, &mut rng).await.unwrap();

        assert_eq!(preview.unassigned, 60);
        assert_eq!(preview.already_assigned, 0);
        assert_eq!(preview.assignments.len(), ASSIGNMENT_PREVIEW_LIMIT);
        // Summaries cover the full pool despite the capped listing.
        assert_eq!(preview.groupings[0].new, 60);
        assert_eq!(preview.parties[0].total, 60);

        // Nothing was written.
        for delegate in store.list_delegates_for_year(py.id).await.unwrap() {
            assert!(!delegate.is_assigned());
            assert_eq!(delegate.status, DelegateStatus::PendingAssignment);
        }
    }

    #[tokio::test]
    async fn test_partially_assigned_counts_as_unassigned() {
        let (store, py, caller) = setup();
        let franklin = store.activate_grouping(py.id, "Franklin", true);
        store.activate_party(py.id, "Federalist", None);

        let half = add_delegate(&store, &py, "half@test.com", DelegateStatus::Active).await;
        store.place_delegate(half.id, Some(franklin.grouping_id), None);

        let mut rng = StdRng::seed_from_u64(5);
        let result = commit_with_rng(&store, &caller, py.id, &mut rng).await.unwrap();
        assert_eq!(result.assigned, 1);

        let delegate = store.find_delegate(py.id, "half@test.com").await.unwrap().unwrap();
        assert!(delegate.is_assigned());
        // Already-active delegates keep their status.
        assert_eq!(delegate.status, DelegateStatus::Active);
    }

    #[tokio::test]
    async fn test_withdrawn_delegates_are_ignored() {
        let (store, py, caller) = setup();
        store.activate_grouping(py.id, "Franklin", true);
        store.activate_party(py.id, "Federalist", None);
        add_delegate(&store, &py, "gone@test.com", DelegateStatus::Withdrawn).await;
        add_delegate(&store, &py, "here@test.com", DelegateStatus::PendingAssignment).await;

        let mut rng = StdRng::seed_from_u64(13);
        let result = commit_with_rng(&store, &caller, py.id, &mut rng).await.unwrap();
        assert_eq!(result.assigned, 1);

        let gone = store.find_delegate(py.id, "gone@test.com").await.unwrap().unwrap();
        assert!(!gone.is_assigned());
        assert_eq!(gone.status, DelegateStatus::Withdrawn);
    }

    #[tokio::test]
    async fn test_per_delegate_failure_isolation() {
        let (store, py, caller) = setup();
        store.activate_grouping(py.id, "Franklin", true);
        store.activate_party(py.id, "Federalist", None);
        for email in ["a@test.com", "b@test.com", "c@test.com"] {
            add_delegate(&store, &py, email, DelegateStatus::PendingAssignment).await;
        }
        store.fail_placement_for("b@test.com");

        let mut rng = StdRng::seed_from_u64(17);
        let result = commit_with_rng(&store, &caller, py.id, &mut rng).await.unwrap();

        assert_eq!(result.assigned, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].email, "b@test.com");

        let b = store.find_delegate(py.id, "b@test.com").await.unwrap().unwrap();
        assert!(!b.is_assigned());
    }

    #[tokio::test]
    async fn test_bad_request_preconditions() {
        let (store, py, caller) = setup();

        // No groupings activated yet.
        let err = preview_assignment(&store, &caller, py.id).await.unwrap_err();
        assert!(matches!(err, RequestError::BadRequest(_)));

        // Groupings but no parties.
        store.activate_grouping(py.id, "Franklin", true);
        let err = preview_assignment(&store, &caller, py.id).await.unwrap_err();
        assert!(matches!(err, RequestError::BadRequest(_)));

        // Everything active but nobody to assign.
        store.activate_party(py.id, "Federalist", None);
        let err = preview_assignment(&store, &caller, py.id).await.unwrap_err();
        assert!(matches!(err, RequestError::BadRequest(_)));

        // Non-assignment-level groupings do not count as eligibility.
        let err = {
            let store = MemoryStore::new();
            let py = store.seed_program_year("Youth Assembly", 2026);
            let caller = Caller::program_admin(Uuid::new_v4(), [py.program_id]);
            store.activate_grouping(py.id, "Region", false);
            store.activate_party(py.id, "Federalist", None);
            add_delegate(&store, &py, "d@test.com", DelegateStatus::PendingAssignment).await;
            preview_assignment(&store, &caller, py.id).await.unwrap_err()
        };
        assert!(matches!(err, RequestError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_unknown_year_and_forbidden() {
        let (store, py, _caller) = setup();

        let admin = Caller::program_admin(Uuid::new_v4(), [Uuid::new_v4()]);
        let err = preview_assignment(&store, &admin, py.id).await.unwrap_err();
        assert!(matches!(err, RequestError::Forbidden(_)));

        let caller = Caller::program_admin(Uuid::new_v4(), [py.program_id]);
        let err = preview_assignment(&store, &caller, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RequestError::NotFound(_)));
    }

    #[test]
    fn test_first_min_prefers_earliest() {
        assert_eq!(first_min(&[2, 1, 1, 3]), 1);
        assert_eq!(first_min(&[0, 0, 0]), 0);
        assert_eq!(first_min(&[5]), 0);
    }
}
