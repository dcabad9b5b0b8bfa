use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::opportunity::Opportunity;
use crate::stage::{Stage, StageRegistry};
use crate::transition::apply_stage;

/// Token minted by `request_close`. It carries everything the confirmation
/// needs; the opportunity itself is not touched until `confirm_close`
/// succeeds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingClose {
    pub opportunity_id: Uuid,
    pub target: Stage,
    pub is_win: bool,
}

/// Two-phase protocol in front of the terminal stages: stage the close,
/// collect the reason, then finalize. A deal's stage only becomes terminal
/// through `confirm_close`.
pub struct ClosingWorkflowValidator<'a> {
    registry: &'a StageRegistry,
}

impl<'a> ClosingWorkflowValidator<'a> {
    pub fn new(registry: &'a StageRegistry) -> Self {
        Self { registry }
    }

    /// Phase 1: stage the close without mutating anything.
    pub fn request_close(
        &self,
        opportunity: &Opportunity,
        is_win: bool,
    ) -> Result<PendingClose, PipelineError> {
        if self.registry.is_terminal(opportunity.stage) {
            return Err(PipelineError::TerminalStageLocked);
        }
        let target = if is_win {
            self.registry.won_stage()
        } else {
            self.registry.lost_stage()
        };
        Ok(PendingClose {
            opportunity_id: opportunity.id,
            target,
            is_win,
        })
    }

    /// Phase 2: record the reason and finalize the terminal move.
    ///
    /// Fails with `MissingReason` on a blank reason; the token stays valid so
    /// the caller can retry. A token minted for another record, or a record
    /// that closed in the meantime, is a stale base.
    pub fn confirm_close(
        &self,
        opportunity: &Opportunity,
        pending: &PendingClose,
        reason: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Opportunity, PipelineError> {
        if pending.opportunity_id != opportunity.id {
            return Err(PipelineError::ConcurrentModification);
        }
        if self.registry.is_terminal(opportunity.stage) {
            return Err(PipelineError::TerminalStageLocked);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PipelineError::MissingReason);
        }
        let mut closed = opportunity.clone();
        if pending.is_win {
            closed.win_reason = Some(reason.to_string());
            closed.won_date = Some(now);
        } else {
            closed.lost_reason = Some(reason.to_string());
            closed.lost_date = Some(now);
        }
        closed.win_loss_notes = notes.map(str::to_string);
        closed.actual_close_date = Some(now);
        apply_stage(&mut closed, pending.target, now);
        debug!(opportunity = %closed.id, stage = pending.target.as_str(), "deal closed");
        Ok(closed)
    }

    /// Abandon a staged close; the opportunity was never touched.
    pub fn cancel_close(&self, pending: PendingClose) {
        debug!(opportunity = %pending.opportunity_id, "close abandoned");
    }
}
