use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, info_span};
use uuid::Uuid;

use pipeline::{
    bottlenecks, forecast, sales_cycle, stage_velocity, trends, ClosingWorkflowValidator,
    DraftTransition, ForecastSummary, Opportunity, PipelineError, Quota, SalesCycleSummary,
    StageRegistry, StageTransitionEngine, StageVelocityRecord, TransitionOutcome, VelocityTrend,
};

use crate::store::{PipelineStore, Revision};

pub type AppState = Arc<PipelineStore>;

pub fn router(store: AppState) -> Router {
    Router::new()
        .route(
            "/opportunities",
            get(list_opportunities).post(create_opportunity),
        )
        .route("/opportunities/velocity", get(velocity_summary))
        .route("/opportunities/stage-velocity", get(stage_velocity_report))
        .route("/opportunities/bottlenecks", get(bottleneck_report))
        .route("/opportunities/velocity-trends", get(velocity_trend_report))
        .route(
            "/opportunities/{id}",
            get(get_opportunity).put(update_opportunity),
        )
        .route("/forecast/{fiscal_year}", get(forecast_report))
        .route("/quotas/{fiscal_year}", get(list_quotas))
        .route("/quotas/{fiscal_year}/{month}", put(set_quota))
        .with_state(store)
}

/// Wire error shape: a status plus a machine-readable code, rendered as
/// `{"error": "<code>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
}

impl ApiError {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NotFound",
        }
    }

    fn validation() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "Validation",
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match err {
            PipelineError::ConcurrentModification => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            code: err.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.code }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOpportunity {
    name: String,
    amount: i64,
    probability: Option<i16>,
    expected_close_date: NaiveDate,
}

async fn create_opportunity(
    State(store): State<AppState>,
    Json(body): Json<NewOpportunity>,
) -> Result<(StatusCode, Json<Opportunity>), ApiError> {
    let name = body.name.trim();
    if name.is_empty() || body.amount < 0 {
        return Err(ApiError::validation());
    }
    if let Some(probability) = body.probability {
        if !(0..=100).contains(&probability) {
            return Err(ApiError::validation());
        }
    }
    let mut opportunity = Opportunity::new(name, body.amount, body.expected_close_date, Utc::now());
    if let Some(probability) = body.probability {
        opportunity.probability = probability;
    }
    store.insert(opportunity.clone());
    info!(opportunity = %opportunity.id, "opportunity created");
    Ok((StatusCode::CREATED, Json(opportunity)))
}

async fn list_opportunities(State(store): State<AppState>) -> Json<Vec<Opportunity>> {
    Json(store.snapshot())
}

async fn get_opportunity(
    State(store): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Opportunity>, ApiError> {
    store
        .get(id)
        .map(|(opportunity, _)| Json(opportunity))
        .ok_or_else(ApiError::not_found)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageUpdate {
    stage: String,
    win_reason: Option<String>,
    lost_reason: Option<String>,
    win_loss_notes: Option<String>,
    won_date: Option<DateTime<Utc>>,
    lost_date: Option<DateTime<Utc>>,
    actual_close_date: Option<DateTime<Utc>>,
}

async fn update_opportunity(
    State(store): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StageUpdate>,
) -> Result<Json<Opportunity>, ApiError> {
    let span = info_span!("pipeline.moveStage", opportunity = %id, target = body.stage.as_str());
    let _guard = span.enter();
    let registry = StageRegistry::global();
    let engine = StageTransitionEngine::new(registry);
    let (confirmed, base) = store.get(id).ok_or_else(ApiError::not_found)?;
    let now = Utc::now();
    match engine.transition(&confirmed, &body.stage, now)? {
        TransitionOutcome::Unchanged => Ok(Json(confirmed)),
        TransitionOutcome::Moved(updated) => {
            commit_draft(&store, DraftTransition::new(confirmed, updated), base)
        }
        TransitionOutcome::CloseRequested(pending) => {
            let validator = ClosingWorkflowValidator::new(registry);
            let reason = if pending.is_win {
                body.win_reason.as_deref()
            } else {
                body.lost_reason.as_deref()
            };
            let Some(reason) = reason else {
                validator.cancel_close(pending);
                return Err(PipelineError::MissingReason.into());
            };
            let closed_at = body
                .actual_close_date
                .or(body.won_date)
                .or(body.lost_date)
                .unwrap_or(now);
            let closed = validator.confirm_close(
                &confirmed,
                &pending,
                reason,
                body.win_loss_notes.as_deref(),
                closed_at,
            )?;
            commit_draft(&store, DraftTransition::new(confirmed, closed), base)
        }
    }
}

/// Tentative apply -> commit; a rejected write reverts to the confirmed
/// snapshot so the caller never sees the abandoned state.
fn commit_draft(
    store: &PipelineStore,
    draft: DraftTransition,
    base: Revision,
) -> Result<Json<Opportunity>, ApiError> {
    match store.commit(draft.tentative().clone(), base) {
        Ok(saved) => {
            let _ = draft.confirm();
            Ok(Json(saved))
        }
        Err(err) => {
            let confirmed = draft.rollback();
            info!(
                opportunity = %confirmed.id,
                stage = confirmed.stage.as_str(),
                "stage move rejected; reverted to confirmed state"
            );
            Err(err.into())
        }
    }
}

async fn velocity_summary(State(store): State<AppState>) -> Json<SalesCycleSummary> {
    Json(sales_cycle(&store.snapshot(), Utc::now()))
}

async fn stage_velocity_report(State(store): State<AppState>) -> Json<Vec<StageVelocityRecord>> {
    Json(stage_velocity(&store.snapshot()))
}

async fn bottleneck_report(State(store): State<AppState>) -> Json<Vec<StageVelocityRecord>> {
    let records = stage_velocity(&store.snapshot());
    Json(bottlenecks(&records))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendParams {
    period_months: Option<u32>,
}

async fn velocity_trend_report(
    State(store): State<AppState>,
    Query(params): Query<TrendParams>,
) -> Json<Vec<VelocityTrend>> {
    Json(trends(&store.snapshot(), params.period_months.unwrap_or(1)))
}

async fn forecast_report(
    State(store): State<AppState>,
    Path(fiscal_year): Path<i32>,
) -> Json<ForecastSummary> {
    Json(forecast(
        fiscal_year,
        &store.snapshot(),
        &store.quotas_for_year(fiscal_year),
    ))
}

async fn list_quotas(
    State(store): State<AppState>,
    Path(fiscal_year): Path<i32>,
) -> Json<Vec<Quota>> {
    Json(store.quotas_for_year(fiscal_year))
}

#[derive(Debug, Deserialize)]
struct QuotaBody {
    amount: i64,
}

async fn set_quota(
    State(store): State<AppState>,
    Path((fiscal_year, month)): Path<(i32, u32)>,
    Json(body): Json<QuotaBody>,
) -> Result<Json<Quota>, ApiError> {
    if !(1..=12).contains(&month) || body.amount < 0 {
        return Err(ApiError::validation());
    }
    let quota = Quota {
        fiscal_year,
        month,
        amount: body.amount,
    };
    store.upsert_quota(quota.clone());
    Ok(Json(quota))
}
