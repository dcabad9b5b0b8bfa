use crate::opportunity::Opportunity;

/// A tentative stage mutation held next to the last confirmed snapshot.
///
/// Board-style callers apply the move locally before the store accepts it:
/// show `tentative`, then `confirm` on success or `rollback` to the
/// confirmed snapshot when the write is rejected.
#[derive(Clone, Debug)]
pub struct DraftTransition {
    confirmed: Opportunity,
    tentative: Opportunity,
}

impl DraftTransition {
    pub fn new(confirmed: Opportunity, tentative: Opportunity) -> Self {
        Self {
            confirmed,
            tentative,
        }
    }

    /// The optimistic view shown while the write is in flight.
    pub fn tentative(&self) -> &Opportunity {
        &self.tentative
    }

    /// Keep the tentative state once the store accepted it.
    pub fn confirm(self) -> Opportunity {
        self.tentative
    }

    /// Restore the last confirmed snapshot after a rejected write.
    pub fn rollback(self) -> Opportunity {
        self.confirmed
    }
}
