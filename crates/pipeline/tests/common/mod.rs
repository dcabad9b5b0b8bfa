use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pipeline::{
    ClosingWorkflowValidator, Opportunity, StageRegistry, StageTransitionEngine, TransitionOutcome,
};

/// Fixed reference clock: offsets in days from the start of the scenario.
pub fn day(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).single().unwrap() + Duration::days(offset)
}

pub fn new_deal(name: &str, amount: i64) -> Opportunity {
    Opportunity::new(
        name,
        amount,
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        day(0),
    )
}

pub fn move_to(opportunity: &Opportunity, label: &str, at: DateTime<Utc>) -> Opportunity {
    let engine = StageTransitionEngine::new(StageRegistry::global());
    match engine.transition(opportunity, label, at).unwrap() {
        TransitionOutcome::Moved(updated) => updated,
        other => panic!("expected a move, got {other:?}"),
    }
}

pub fn close(
    opportunity: &Opportunity,
    is_win: bool,
    reason: &str,
    at: DateTime<Utc>,
) -> Opportunity {
    let validator = ClosingWorkflowValidator::new(StageRegistry::global());
    let pending = validator.request_close(opportunity, is_win).unwrap();
    validator
        .confirm_close(opportunity, &pending, reason, None, at)
        .unwrap()
}
