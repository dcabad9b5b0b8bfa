use chrono::{DateTime, Utc};
use tracing::debug;

use crate::closing::{ClosingWorkflowValidator, PendingClose};
use crate::error::PipelineError;
use crate::opportunity::{Opportunity, StageHistoryEntry};
use crate::stage::{Stage, StageRegistry};

/// Outcome of asking the engine to move an opportunity.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionOutcome {
    /// Stage changed and a history entry was appended.
    Moved(Opportunity),
    /// Target resolved to the current stage; nothing to do.
    Unchanged,
    /// Target is terminal; the closing workflow must confirm it before any
    /// mutation happens.
    CloseRequested(PendingClose),
}

/// The single point of mutation for an opportunity's stage.
pub struct StageTransitionEngine<'a> {
    registry: &'a StageRegistry,
}

impl<'a> StageTransitionEngine<'a> {
    pub fn new(registry: &'a StageRegistry) -> Self {
        Self { registry }
    }

    /// Validate and apply a stage change.
    ///
    /// The input record is untouched; a moved record comes back in the
    /// outcome with the history entry appended. Terminal targets are never
    /// finalized here, only staged for the closing workflow.
    pub fn transition(
        &self,
        opportunity: &Opportunity,
        target_label: &str,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, PipelineError> {
        let target = self.registry.normalize(target_label)?;
        if self.registry.is_terminal(opportunity.stage) {
            return Err(PipelineError::TerminalStageLocked);
        }
        if target == opportunity.stage {
            return Ok(TransitionOutcome::Unchanged);
        }
        if self.registry.is_terminal(target) {
            let is_win = self.registry.definition(target).is_won;
            let pending =
                ClosingWorkflowValidator::new(self.registry).request_close(opportunity, is_win)?;
            return Ok(TransitionOutcome::CloseRequested(pending));
        }
        let mut updated = opportunity.clone();
        apply_stage(&mut updated, target, now);
        debug!(opportunity = %updated.id, stage = target.as_str(), "stage moved");
        Ok(TransitionOutcome::Moved(updated))
    }
}

/// Set the stage and append the matching history entry. History is
/// append-only; no entry is ever rewritten or reordered.
pub(crate) fn apply_stage(opportunity: &mut Opportunity, target: Stage, now: DateTime<Utc>) {
    opportunity.stage = target;
    opportunity.stage_history.push(StageHistoryEntry {
        stage: target,
        entered_at: now,
    });
}
