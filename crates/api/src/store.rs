use std::collections::HashMap;

use parking_lot::RwLock;
use pipeline::{Opportunity, PipelineError, Quota, Stage};
use uuid::Uuid;

/// Base-state marker for optimistic commits. Stage plus history length is
/// enough to detect that someone else moved the record, because history is
/// append-only and the stage only changes when an entry is appended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Revision {
    stage: Stage,
    history_len: usize,
}

impl Revision {
    fn of(opportunity: &Opportunity) -> Self {
        Self {
            stage: opportunity.stage,
            history_len: opportunity.stage_history.len(),
        }
    }
}

/// In-memory stand-in for the external record store.
///
/// Reads hand out snapshots together with the revision they were taken at;
/// a write lands only while the stored revision still matches, so a stale
/// writer can never rebase another writer's history.
#[derive(Default)]
pub struct PipelineStore {
    opportunities: RwLock<HashMap<Uuid, Opportunity>>,
    quotas: RwLock<Vec<Quota>>,
}

impl PipelineStore {
    pub fn insert(&self, opportunity: Opportunity) {
        self.opportunities
            .write()
            .insert(opportunity.id, opportunity);
    }

    pub fn get(&self, id: Uuid) -> Option<(Opportunity, Revision)> {
        let map = self.opportunities.read();
        let opportunity = map.get(&id)?;
        Some((opportunity.clone(), Revision::of(opportunity)))
    }

    /// Write back an updated record, provided the stored one still matches
    /// the revision the caller read.
    pub fn commit(
        &self,
        updated: Opportunity,
        base: Revision,
    ) -> Result<Opportunity, PipelineError> {
        let mut map = self.opportunities.write();
        let current = map
            .get(&updated.id)
            .ok_or(PipelineError::ConcurrentModification)?;
        if Revision::of(current) != base {
            return Err(PipelineError::ConcurrentModification);
        }
        map.insert(updated.id, updated.clone());
        Ok(updated)
    }

    /// Snapshot of every opportunity, for the read-only aggregations.
    pub fn snapshot(&self) -> Vec<Opportunity> {
        let mut records: Vec<Opportunity> = self.opportunities.read().values().cloned().collect();
        records.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then(a.id.cmp(&b.id)));
        records
    }

    pub fn upsert_quota(&self, quota: Quota) {
        let mut quotas = self.quotas.write();
        match quotas.iter_mut().find(|existing| {
            existing.fiscal_year == quota.fiscal_year && existing.month == quota.month
        }) {
            Some(existing) => existing.amount = quota.amount,
            None => quotas.push(quota),
        }
    }

    pub fn quotas_for_year(&self, fiscal_year: i32) -> Vec<Quota> {
        let mut quotas: Vec<Quota> = self
            .quotas
            .read()
            .iter()
            .filter(|quota| quota.fiscal_year == fiscal_year)
            .cloned()
            .collect();
        quotas.sort_by_key(|quota| quota.month);
        quotas
    }
}
