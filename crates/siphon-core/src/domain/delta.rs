//! Delta computation between a poll and the persisted history
//!
//! [`compute`] is a pure set difference: the ids reported by the latest poll
//! that are not yet in the historical set. An empty difference is its own
//! variant rather than an empty collection.

use std::collections::{BTreeSet, HashSet};

use super::newtypes::EventId;

/// Outcome of comparing a poll against the historical id set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaResult {
    /// Everything in the poll has already been persisted
    Empty,
    /// Ids present in the poll but absent from history (never empty)
    NewIds(BTreeSet<EventId>),
}

impl DeltaResult {
    /// Number of new ids (zero for `Empty`)
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::NewIds(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Returns the ids in `current` that are not in `historical`
///
/// Guarantees `NewIds ⊆ current` and `NewIds ∩ historical = ∅`.
pub fn compute<'a, I>(current: I, historical: &HashSet<EventId>) -> DeltaResult
where
    I: IntoIterator<Item = &'a EventId>,
{
    let new_ids: BTreeSet<EventId> = current
        .into_iter()
        .filter(|id| !historical.contains(id))
        .copied()
        .collect();

    if new_ids.is_empty() {
        DeltaResult::Empty
    } else {
        DeltaResult::NewIds(new_ids)
    }
}
