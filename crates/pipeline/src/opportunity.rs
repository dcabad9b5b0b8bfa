use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stage::{Stage, StageRegistry};

/// One entry in an opportunity's append-only stage history. Entries are
/// chronological and the last entry's stage always equals the record's
/// current stage.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageHistoryEntry {
    pub stage: Stage,
    pub entered_at: DateTime<Utc>,
}

/// A deal moving through the pipeline.
///
/// `amount` is in minor currency units. The stage field is mutated only by
/// the transition engine; close metadata is written only by the closing
/// workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: Uuid,
    pub name: String,
    pub amount: i64,
    /// Win likelihood, 0-100.
    pub probability: i16,
    pub stage: Stage,
    pub expected_close_date: NaiveDate,
    pub actual_close_date: Option<DateTime<Utc>>,
    pub won_date: Option<DateTime<Utc>>,
    pub lost_date: Option<DateTime<Utc>>,
    pub win_reason: Option<String>,
    pub lost_reason: Option<String>,
    pub win_loss_notes: Option<String>,
    pub stage_history: Vec<StageHistoryEntry>,
}

impl Opportunity {
    /// New record in the first canonical stage with its initial history entry.
    pub fn new(
        name: impl Into<String>,
        amount: i64,
        expected_close_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        let registry = StageRegistry::global();
        let first = registry.first_stage();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            amount,
            probability: registry.definition(first).default_probability,
            stage: first,
            expected_close_date,
            actual_close_date: None,
            won_date: None,
            lost_date: None,
            win_reason: None,
            lost_reason: None,
            win_loss_notes: None,
            stage_history: vec![StageHistoryEntry {
                stage: first,
                entered_at: created_at,
            }],
        }
    }

    pub fn is_closed(&self) -> bool {
        StageRegistry::global().is_terminal(self.stage)
    }

    /// When the record entered the pipeline: its first history entry.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.stage_history.first().map(|entry| entry.entered_at)
    }

    /// When the record entered its current stage: its last history entry.
    pub fn current_stage_entered_at(&self) -> Option<DateTime<Utc>> {
        self.stage_history.last().map(|entry| entry.entered_at)
    }
}
