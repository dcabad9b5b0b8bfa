use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::opportunity::Opportunity;
use crate::stage::{Stage, StageRegistry};

/// A stage is flagged as a bottleneck when its average dwell time exceeds
/// the pipeline-wide mean by this factor. Fixed policy, not configurable.
pub const BOTTLENECK_FACTOR: f64 = 1.5;

const SECONDS_PER_DAY: f64 = 86_400.0;
const CLOSE_WINDOW_DAYS: i64 = 30;

/// Dwell-time aggregate for one stage across the supplied snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageVelocityRecord {
    pub stage: Stage,
    pub avg_days_in_stage: f64,
    pub min_days: f64,
    pub max_days: f64,
    pub count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesCycleSummary {
    pub avg_sales_cycle: f64,
    pub deals_closed_30_days: usize,
    pub revenue_closed_30_days: i64,
    pub win_rate_30_days: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityTrend {
    pub period: String,
    pub avg_days: f64,
    pub deals_count: usize,
}

/// Per-stage dwell times over completed stage occupancies.
///
/// Every consecutive pair of history entries yields one sample for the
/// earlier entry's stage. The last occupancy is measured against
/// `actualCloseDate` once the deal has closed; open deals are still accruing
/// time in their current stage and contribute no sample for it, so
/// still-running intervals never bias the averages. Terminal stages mark the
/// end of the pipeline and are not reported.
pub fn stage_velocity(opportunities: &[Opportunity]) -> Vec<StageVelocityRecord> {
    let registry = StageRegistry::global();
    let mut samples: HashMap<Stage, Vec<f64>> = HashMap::new();
    for opportunity in opportunities {
        let history = &opportunity.stage_history;
        for pair in history.windows(2) {
            record_sample(&mut samples, pair[0].stage, pair[0].entered_at, pair[1].entered_at);
        }
        if let (Some(last), Some(closed_at)) = (history.last(), opportunity.actual_close_date) {
            record_sample(&mut samples, last.stage, last.entered_at, closed_at);
        }
    }
    let mut records: Vec<StageVelocityRecord> = samples
        .into_iter()
        .map(|(stage, days)| {
            let count = days.len();
            let sum: f64 = days.iter().sum();
            let min = days.iter().copied().fold(f64::INFINITY, f64::min);
            let max = days.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            StageVelocityRecord {
                stage,
                avg_days_in_stage: sum / count as f64,
                min_days: min,
                max_days: max,
                count,
            }
        })
        .collect();
    records.sort_by_key(|record| registry.position(record.stage));
    records
}

fn record_sample(
    samples: &mut HashMap<Stage, Vec<f64>>,
    stage: Stage,
    entered_at: DateTime<Utc>,
    left_at: DateTime<Utc>,
) {
    if StageRegistry::global().is_terminal(stage) {
        return;
    }
    let days = (left_at - entered_at).num_seconds() as f64 / SECONDS_PER_DAY;
    samples.entry(stage).or_default().push(days);
}

/// Stages whose average dwell time exceeds `BOTTLENECK_FACTOR` times the
/// mean average across all supplied records.
pub fn bottlenecks(records: &[StageVelocityRecord]) -> Vec<StageVelocityRecord> {
    if records.is_empty() {
        return Vec::new();
    }
    let mean: f64 = records
        .iter()
        .map(|record| record.avg_days_in_stage)
        .sum::<f64>()
        / records.len() as f64;
    let threshold = BOTTLENECK_FACTOR * mean;
    records
        .iter()
        .filter(|record| record.avg_days_in_stage > threshold)
        .cloned()
        .collect()
}

/// Overall cycle length plus the trailing 30-day close window.
pub fn sales_cycle(opportunities: &[Opportunity], now: DateTime<Utc>) -> SalesCycleSummary {
    let registry = StageRegistry::global();
    let window_start = now - Duration::days(CLOSE_WINDOW_DAYS);
    let mut cycles: Vec<f64> = Vec::new();
    let mut closed_in_window = 0usize;
    let mut revenue_in_window = 0i64;
    let mut won_in_window = 0usize;
    let mut lost_in_window = 0usize;
    for opportunity in opportunities {
        let Some(closed_at) = opportunity.actual_close_date else {
            continue;
        };
        if let Some(created_at) = opportunity.created_at() {
            cycles.push((closed_at - created_at).num_seconds() as f64 / SECONDS_PER_DAY);
        }
        if closed_at >= window_start && closed_at <= now {
            closed_in_window += 1;
            let definition = registry.definition(opportunity.stage);
            if definition.is_won {
                won_in_window += 1;
                revenue_in_window += opportunity.amount;
            } else if definition.is_lost {
                lost_in_window += 1;
            }
        }
    }
    let decided = won_in_window + lost_in_window;
    SalesCycleSummary {
        avg_sales_cycle: mean(&cycles),
        deals_closed_30_days: closed_in_window,
        revenue_closed_30_days: revenue_in_window,
        win_rate_30_days: if decided == 0 {
            0.0
        } else {
            won_in_window as f64 / decided as f64 * 100.0
        },
    }
}

/// Cycle-length trend over consecutive buckets of `period_months` calendar
/// months, keyed by `actualCloseDate` and ordered chronologically. Buckets
/// with no closed deals report zeroes.
pub fn trends(opportunities: &[Opportunity], period_months: u32) -> Vec<VelocityTrend> {
    let period_months = period_months.max(1);
    let mut closed: Vec<(NaiveDate, f64)> = Vec::new();
    for opportunity in opportunities {
        let (Some(closed_at), Some(created_at)) =
            (opportunity.actual_close_date, opportunity.created_at())
        else {
            continue;
        };
        closed.push((
            month_floor(closed_at.date_naive()),
            (closed_at - created_at).num_seconds() as f64 / SECONDS_PER_DAY,
        ));
    }
    let Some(first) = closed.iter().map(|(month, _)| *month).min() else {
        return Vec::new();
    };
    let last = closed
        .iter()
        .map(|(month, _)| *month)
        .max()
        .unwrap_or(first);
    let mut trends = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        let end = add_months(cursor, period_months);
        let samples: Vec<f64> = closed
            .iter()
            .filter(|(month, _)| *month >= cursor && *month < end)
            .map(|(_, days)| *days)
            .collect();
        trends.push(VelocityTrend {
            period: format!("{:04}-{:02}", cursor.year(), cursor.month()),
            avg_days: mean(&samples),
            deals_count: samples.len(),
        });
        cursor = end;
    }
    trends
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn month_floor(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).expect("valid month start")
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)
        .expect("valid month")
}
