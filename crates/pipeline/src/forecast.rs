use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::opportunity::Opportunity;
use crate::stage::StageRegistry;

/// Monthly sales target. Owned by quota settings; the core only reads it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quota {
    pub fiscal_year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    pub amount: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyForecast {
    pub month: u32,
    pub month_name: &'static str,
    pub quota: i64,
    pub closed_won: i64,
    pub pipeline_weighted: i64,
    pub pipeline_total: i64,
    pub achievement_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSummary {
    pub fiscal_year: i32,
    pub total_quota: i64,
    pub total_closed_won: i64,
    pub total_pipeline_weighted: i64,
    pub achievement_percent: f64,
    pub monthly_data: Vec<MonthlyForecast>,
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Quota-vs-actual-vs-pipeline summary for one fiscal year.
///
/// Won revenue lands in the month of `wonDate`; open deals are weighted by
/// probability into the month of `expectedCloseDate`; lost deals contribute
/// nothing. All division by quota is zero-guarded.
pub fn forecast(
    fiscal_year: i32,
    opportunities: &[Opportunity],
    quotas: &[Quota],
) -> ForecastSummary {
    let registry = StageRegistry::global();
    let mut monthly_data = Vec::with_capacity(12);
    for month in 1..=12u32 {
        let quota = quotas
            .iter()
            .find(|quota| quota.fiscal_year == fiscal_year && quota.month == month)
            .map(|quota| quota.amount)
            .unwrap_or(0);
        let mut closed_won = 0i64;
        let mut pipeline_weighted = 0i64;
        let mut pipeline_total = 0i64;
        for opportunity in opportunities {
            let definition = registry.definition(opportunity.stage);
            if definition.is_won {
                if let Some(won_at) = opportunity.won_date {
                    if won_at.year() == fiscal_year && won_at.month() == month {
                        closed_won += opportunity.amount;
                    }
                }
            } else if !definition.is_lost {
                let expected = opportunity.expected_close_date;
                if expected.year() == fiscal_year && expected.month() == month {
                    pipeline_weighted +=
                        opportunity.amount * i64::from(opportunity.probability) / 100;
                    pipeline_total += opportunity.amount;
                }
            }
        }
        monthly_data.push(MonthlyForecast {
            month,
            month_name: MONTH_NAMES[(month - 1) as usize],
            quota,
            closed_won,
            pipeline_weighted,
            pipeline_total,
            achievement_percent: percent_of(closed_won, quota),
        });
    }
    let total_quota: i64 = monthly_data.iter().map(|entry| entry.quota).sum();
    let total_closed_won: i64 = monthly_data.iter().map(|entry| entry.closed_won).sum();
    let total_pipeline_weighted: i64 = monthly_data
        .iter()
        .map(|entry| entry.pipeline_weighted)
        .sum();
    ForecastSummary {
        fiscal_year,
        total_quota,
        total_closed_won,
        total_pipeline_weighted,
        achievement_percent: percent_of(total_closed_won, total_quota),
        monthly_data,
    }
}

fn percent_of(actual: i64, target: i64) -> f64 {
    if target > 0 {
        actual as f64 / target as f64 * 100.0
    } else {
        0.0
    }
}
