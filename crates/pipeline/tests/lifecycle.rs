mod common;

use common::{close, day, move_to, new_deal};
use pipeline::{
    ClosingWorkflowValidator, DraftTransition, PipelineError, Stage, StageRegistry,
    StageTransitionEngine, TransitionOutcome,
};

#[test]
fn new_records_start_in_the_first_stage() {
    let deal = new_deal("ACME Pilot", 120_000);
    assert_eq!(deal.stage, Stage::Lead);
    assert_eq!(deal.stage_history.len(), 1);
    assert_eq!(deal.stage_history[0].stage, Stage::Lead);
    assert_eq!(deal.created_at(), Some(day(0)));
    assert!(!deal.is_closed());
}

#[test]
fn history_appends_on_every_move() {
    let deal = new_deal("ACME Pilot", 120_000);
    let deal = move_to(&deal, "Qualified", day(5));
    let deal = move_to(&deal, "Proposal", day(12));

    assert_eq!(deal.stage, Stage::Proposal);
    assert_eq!(deal.stage_history.len(), 3);
    assert_eq!(deal.stage_history.last().unwrap().stage, deal.stage);
    assert!(deal
        .stage_history
        .windows(2)
        .all(|pair| pair[0].entered_at <= pair[1].entered_at));
}

#[test]
fn same_stage_transition_is_a_no_op() {
    let engine = StageTransitionEngine::new(StageRegistry::global());
    let deal = move_to(&new_deal("Retainer", 60_000), "Qualified", day(3));
    let outcome = engine.transition(&deal, "Qualified", day(9)).unwrap();
    assert_eq!(outcome, TransitionOutcome::Unchanged);
    assert_eq!(deal.stage_history.len(), 2);
}

#[test]
fn unknown_labels_are_rejected() {
    let engine = StageTransitionEngine::new(StageRegistry::global());
    let deal = new_deal("Retainer", 60_000);
    let err = engine.transition(&deal, "Discovery", day(1)).unwrap_err();
    assert_eq!(err, PipelineError::UnknownStage("Discovery".into()));
}

#[test]
fn legacy_labels_resolve_to_canonical_stages() {
    let registry = StageRegistry::global();
    assert_eq!(registry.normalize("Initial").unwrap(), Stage::Lead);
    assert_eq!(registry.normalize("Lead").unwrap(), Stage::Lead);
    assert_eq!(registry.normalize("Qualification").unwrap(), Stage::Qualified);
    assert_eq!(registry.normalize(" closed won ").unwrap(), Stage::ClosedWon);

    let deal = move_to(&new_deal("Renewal", 210_000), "Qualification", day(2));
    assert_eq!(deal.stage, Stage::Qualified);
    assert_eq!(deal.stage_history.last().unwrap().stage, Stage::Qualified);
}

#[test]
fn terminal_stages_require_the_closing_workflow() {
    let engine = StageTransitionEngine::new(StageRegistry::global());
    let deal = move_to(&new_deal("Expansion", 95_000), "Negotiation", day(4));
    let outcome = engine.transition(&deal, "Closed Won", day(10)).unwrap();
    let TransitionOutcome::CloseRequested(pending) = outcome else {
        panic!("terminal target must stage a close");
    };
    assert_eq!(pending.opportunity_id, deal.id);
    assert_eq!(pending.target, Stage::ClosedWon);
    assert!(pending.is_win);
    // Nothing has moved yet.
    assert_eq!(deal.stage, Stage::Negotiation);
    assert_eq!(deal.stage_history.len(), 2);
}

#[test]
fn confirm_close_sets_win_fields() {
    let validator = ClosingWorkflowValidator::new(StageRegistry::global());
    let deal = move_to(&new_deal("Expansion", 95_000), "Proposal", day(4));
    let pending = validator.request_close(&deal, true).unwrap();
    let closed = validator
        .confirm_close(&deal, &pending, "Good fit", Some("Signed on-site"), day(20))
        .unwrap();

    assert_eq!(closed.stage, Stage::ClosedWon);
    assert_eq!(closed.win_reason.as_deref(), Some("Good fit"));
    assert_eq!(closed.win_loss_notes.as_deref(), Some("Signed on-site"));
    assert_eq!(closed.won_date, Some(day(20)));
    assert_eq!(closed.actual_close_date, Some(day(20)));
    assert_eq!(closed.lost_reason, None);
    assert_eq!(closed.lost_date, None);
    assert_eq!(closed.stage_history.last().unwrap().stage, Stage::ClosedWon);
}

#[test]
fn confirm_close_requires_a_reason_and_keeps_the_token_valid() {
    let validator = ClosingWorkflowValidator::new(StageRegistry::global());
    let deal = move_to(&new_deal("Stalled Trial", 25_000), "Qualified", day(3));
    let pending = validator.request_close(&deal, false).unwrap();

    let err = validator
        .confirm_close(&deal, &pending, "   ", None, day(8))
        .unwrap_err();
    assert_eq!(err, PipelineError::MissingReason);
    assert_eq!(deal.stage, Stage::Qualified);
    assert_eq!(deal.stage_history.len(), 2);

    // Retry with the same token.
    let closed = validator
        .confirm_close(&deal, &pending, "Went dark", None, day(8))
        .unwrap();
    assert_eq!(closed.stage, Stage::ClosedLost);
    assert_eq!(closed.lost_reason.as_deref(), Some("Went dark"));
    assert_eq!(closed.lost_date, Some(day(8)));
}

#[test]
fn cancel_close_leaves_the_record_untouched() {
    let validator = ClosingWorkflowValidator::new(StageRegistry::global());
    let deal = move_to(&new_deal("Quick Win", 40_000), "Proposal", day(2));
    let before = deal.clone();
    let pending = validator.request_close(&deal, true).unwrap();
    validator.cancel_close(pending);
    assert_eq!(deal, before);
}

#[test]
fn closed_deals_are_locked() {
    let engine = StageTransitionEngine::new(StageRegistry::global());
    let validator = ClosingWorkflowValidator::new(StageRegistry::global());
    let deal = close(&new_deal("Quick Win", 40_000), true, "Fast approval", day(6));

    for target in ["Lead", "Qualified", "Closed Lost", "Closed Won"] {
        let err = engine.transition(&deal, target, day(9)).unwrap_err();
        assert_eq!(err, PipelineError::TerminalStageLocked, "target {target}");
    }
    let err = validator.request_close(&deal, false).unwrap_err();
    assert_eq!(err, PipelineError::TerminalStageLocked);
}

#[test]
fn confirm_close_rejects_a_token_for_another_record() {
    let validator = ClosingWorkflowValidator::new(StageRegistry::global());
    let deal = new_deal("Retainer", 60_000);
    let other = new_deal("Renewal", 210_000);
    let pending = validator.request_close(&other, true).unwrap();
    let err = validator
        .confirm_close(&deal, &pending, "Signed", None, day(5))
        .unwrap_err();
    assert_eq!(err, PipelineError::ConcurrentModification);
}

#[test]
fn stage_labels_round_trip_through_the_registry() {
    assert_eq!(
        serde_json::to_value(Stage::ClosedWon).unwrap(),
        serde_json::json!("Closed Won")
    );
    let parsed: Stage = serde_json::from_value(serde_json::json!("Initial")).unwrap();
    assert_eq!(parsed, Stage::Lead);
    assert!(serde_json::from_value::<Stage>(serde_json::json!("Discovery")).is_err());

    let deal = move_to(&new_deal("Round Trip", 10_000), "Qualified", day(1));
    let value = serde_json::to_value(&deal).unwrap();
    assert_eq!(value["stage"], "Qualified");
    assert_eq!(value["stageHistory"][0]["stage"], "Lead");
    let back: pipeline::Opportunity = serde_json::from_value(value).unwrap();
    assert_eq!(back, deal);
}

#[test]
fn draft_transition_rolls_back_to_the_confirmed_snapshot() {
    let deal = new_deal("Fresh Prospect", 55_000);
    let moved = move_to(&deal, "Qualified", day(1));
    let draft = DraftTransition::new(deal.clone(), moved.clone());

    assert_eq!(draft.tentative().stage, Stage::Qualified);
    assert_eq!(draft.clone().confirm(), moved);
    assert_eq!(draft.rollback(), deal);
}
