mod common;

use chrono::NaiveDate;
use common::{close, day, new_deal};
use pipeline::{forecast, Opportunity, Quota, Stage};

fn quota(fiscal_year: i32, month: u32, amount: i64) -> Quota {
    Quota {
        fiscal_year,
        month,
        amount,
    }
}

fn won_in(name: &str, amount: i64, days_from_reference: i64) -> Opportunity {
    close(
        &new_deal(name, amount),
        true,
        "Signed",
        day(days_from_reference),
    )
}

#[test]
fn achievement_compares_won_revenue_to_quota() {
    // Reference day 0 is 2025-03-01, so a close on day 10 lands in March.
    let deal = won_in("March Win", 12_000, 10);
    let summary = forecast(2025, &[deal], &[quota(2025, 3, 10_000)]);

    let march = &summary.monthly_data[2];
    assert_eq!(march.month, 3);
    assert_eq!(march.month_name, "March");
    assert_eq!(march.quota, 10_000);
    assert_eq!(march.closed_won, 12_000);
    assert_eq!(march.achievement_percent, 120.0);

    assert_eq!(summary.fiscal_year, 2025);
    assert_eq!(summary.total_quota, 10_000);
    assert_eq!(summary.total_closed_won, 12_000);
    assert_eq!(summary.achievement_percent, 120.0);
}

#[test]
fn zero_quota_never_divides() {
    let deal = won_in("Unplanned Win", 5_000, 10);
    let summary = forecast(2025, &[deal], &[]);
    assert_eq!(summary.monthly_data[2].closed_won, 5_000);
    assert_eq!(summary.monthly_data[2].achievement_percent, 0.0);
    assert_eq!(summary.total_quota, 0);
    assert_eq!(summary.achievement_percent, 0.0);
}

#[test]
fn open_deals_weight_into_their_expected_month() {
    let mut deal = new_deal("June Prospect", 50_000);
    deal.probability = 40;
    deal.expected_close_date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

    let summary = forecast(2025, &[deal], &[]);
    let june = &summary.monthly_data[5];
    assert_eq!(june.closed_won, 0);
    assert_eq!(june.pipeline_weighted, 20_000);
    assert_eq!(june.pipeline_total, 50_000);
    assert_eq!(summary.total_pipeline_weighted, 20_000);
}

#[test]
fn lost_deals_contribute_nothing() {
    let deal = close(&new_deal("Lost Deal", 70_000), false, "Priced out", day(10));
    assert_eq!(deal.stage, Stage::ClosedLost);
    let summary = forecast(2025, &[deal], &[quota(2025, 3, 10_000)]);
    assert!(summary
        .monthly_data
        .iter()
        .all(|month| month.closed_won == 0 && month.pipeline_total == 0));
}

#[test]
fn other_years_are_excluded() {
    let deal = won_in("This Year", 12_000, 10);
    let summary = forecast(2024, &[deal], &[quota(2024, 3, 10_000)]);
    assert_eq!(summary.total_closed_won, 0);
    assert_eq!(summary.monthly_data[2].achievement_percent, 0.0);
}

#[test]
fn every_month_is_reported_in_order() {
    let summary = forecast(2025, &[], &[]);
    assert_eq!(summary.monthly_data.len(), 12);
    assert_eq!(
        summary
            .monthly_data
            .iter()
            .map(|month| month.month)
            .collect::<Vec<_>>(),
        (1..=12).collect::<Vec<_>>()
    );
    assert_eq!(summary.monthly_data[0].month_name, "January");
    assert_eq!(summary.monthly_data[11].month_name, "December");
    assert_eq!(summary.total_quota, 0);
    assert_eq!(summary.achievement_percent, 0.0);
}
