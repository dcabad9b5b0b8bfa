use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pipeline::{
    ClosingWorkflowValidator, Opportunity, Quota, Stage, StageHistoryEntry, StageRegistry,
};
use uuid::Uuid;

use crate::store::PipelineStore;

/// Load a small demo book of business so the analytics endpoints have
/// something to report on. Returns the seeded records in insertion order.
pub fn seed_demo(store: &PipelineStore) -> Vec<Opportunity> {
    let validator = ClosingWorkflowValidator::new(StageRegistry::global());

    let acme_pilot = deal(
        "ACME Pilot",
        120_000,
        25,
        naive_date(2025, 3, 5),
        &[
            (Stage::Lead, timestamp(2024, 12, 1)),
            (Stage::Qualified, timestamp(2024, 12, 15)),
        ],
    );

    let tooling = deal(
        "Rust Tooling Upgrade",
        75_000,
        50,
        naive_date(2025, 2, 15),
        &[
            (Stage::Lead, timestamp(2024, 12, 5)),
            (Stage::Qualified, timestamp(2024, 12, 12)),
            (Stage::Proposal, timestamp(2024, 12, 20)),
        ],
    );

    let renewal = deal(
        "NuFlights Annual",
        210_000,
        70,
        naive_date(2025, 3, 5),
        &[
            (Stage::Lead, timestamp(2024, 12, 10)),
            (Stage::Qualified, timestamp(2024, 12, 18)),
            (Stage::Proposal, timestamp(2025, 1, 3)),
            (Stage::Negotiation, timestamp(2025, 1, 12)),
        ],
    );

    let expansion = deal(
        "FossRust Expansion",
        95_000,
        100,
        naive_date(2025, 1, 20),
        &[
            (Stage::Lead, timestamp(2024, 12, 15)),
            (Stage::Qualified, timestamp(2024, 12, 22)),
            (Stage::Proposal, timestamp(2025, 1, 5)),
            (Stage::Negotiation, timestamp(2025, 1, 12)),
        ],
    );
    let pending = validator
        .request_close(&expansion, true)
        .expect("demo deal is open");
    let expansion = validator
        .confirm_close(
            &expansion,
            &pending,
            "Signed master services.",
            None,
            timestamp(2025, 1, 22),
        )
        .expect("demo close is valid");

    let quick_win = deal(
        "Quick Win",
        40_000,
        100,
        naive_date(2025, 2, 10),
        &[
            (Stage::Lead, timestamp(2025, 1, 5)),
            (Stage::Proposal, timestamp(2025, 1, 15)),
        ],
    );
    let pending = validator
        .request_close(&quick_win, true)
        .expect("demo deal is open");
    let quick_win = validator
        .confirm_close(
            &quick_win,
            &pending,
            "Fast track approval.",
            None,
            timestamp(2025, 2, 2),
        )
        .expect("demo close is valid");

    let stalled_trial = deal(
        "Stalled Trial",
        25_000,
        0,
        naive_date(2025, 1, 25),
        &[
            (Stage::Lead, timestamp(2024, 12, 18)),
            (Stage::Qualified, timestamp(2025, 1, 6)),
        ],
    );
    let pending = validator
        .request_close(&stalled_trial, false)
        .expect("demo deal is open");
    let stalled_trial = validator
        .confirm_close(
            &stalled_trial,
            &pending,
            "Went dark after trial.",
            Some("No response to three follow-ups."),
            timestamp(2025, 1, 25),
        )
        .expect("demo close is valid");

    let fresh_prospect = deal(
        "Fresh Prospect",
        55_000,
        10,
        naive_date(2025, 3, 15),
        &[(Stage::Lead, timestamp(2025, 1, 20))],
    );

    let records = vec![
        acme_pilot,
        tooling,
        renewal,
        expansion,
        quick_win,
        stalled_trial,
        fresh_prospect,
    ];
    for record in &records {
        store.insert(record.clone());
    }

    for (month, amount) in [(1, 100_000), (2, 100_000), (3, 150_000)] {
        store.upsert_quota(Quota {
            fiscal_year: 2025,
            month,
            amount,
        });
    }

    records
}

/// Assemble a demo record that has already walked the given stages.
fn deal(
    name: &str,
    amount: i64,
    probability: i16,
    expected_close_date: NaiveDate,
    path: &[(Stage, DateTime<Utc>)],
) -> Opportunity {
    let (stage, _) = path[path.len() - 1];
    Opportunity {
        id: Uuid::new_v4(),
        name: name.to_string(),
        amount,
        probability,
        stage,
        expected_close_date,
        actual_close_date: None,
        won_date: None,
        lost_date: None,
        win_reason: None,
        lost_reason: None,
        win_loss_notes: None,
        stage_history: path
            .iter()
            .map(|&(stage, entered_at)| StageHistoryEntry { stage, entered_at })
            .collect(),
    }
}

fn naive_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid seed date")
}

fn timestamp(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid seed timestamp")
}
