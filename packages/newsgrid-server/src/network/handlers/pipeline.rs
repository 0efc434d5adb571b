//! HTTP trigger endpoints for starting and inspecting pipeline runs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use newsgrid_core::{RunStatus, Tier};

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct TriggerRunRequest {
    /// Target date to process, `YYYY-MM-DD`. Defaults to today (UTC) when omitted.
    pub target_date: Option<NaiveDate>,
    /// Tier override for this run; falls back to the configured default tier.
    pub tier: Option<String>,
}

/// `POST /pipeline/run` -- starts a new ingest run for a target date.
///
/// Rejects the request with 409 if a non-terminal run already exists for
/// the same date within the configured staleness window.
///
/// # Errors
///
/// Returns [`ApiError::RunAlreadyActive`] or a database error.
pub async fn trigger_run_handler(
    State(state): State<AppState>,
    Json(req): Json<TriggerRunRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let target_date = req
        .target_date
        .unwrap_or_else(|| Utc::now().date_naive())
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc();

    if state
        .runs
        .has_active_run(target_date, state.app_config.stale_run_max_age_hours)
        .await?
    {
        return Err(ApiError::RunAlreadyActive);
    }

    let run_id = Uuid::new_v4().to_string();
    let tier_str = req.tier.unwrap_or_else(|| state.app_config.default_tier.to_string());
    let tier = tier_str.parse::<crate::config::TierArg>().map_err(anyhow::Error::msg)?.0;
    state.runs.create_run(&run_id, target_date, &tier_str).await?;

    let orchestrator = state.orchestrator.clone();
    let spawned_run_id = run_id.clone();
    tokio::spawn(async move {
        orchestrator.run_pipeline(spawned_run_id, target_date, tier).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "run_id": run_id, "target_date": target_date, "tier": tier_str })),
    ))
}

/// `GET /pipeline/runs/{id}` -- fetches a single run's status.
///
/// # Errors
///
/// Returns [`ApiError::RunNotFound`] if no run with this id exists.
pub async fn get_run_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunView>, ApiError> {
    let run = state
        .runs
        .get_run_by_id(&run_id)
        .await?
        .ok_or(ApiError::RunNotFound(run_id))?;

    Ok(Json(RunView::from(run)))
}

#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    pub date: NaiveDate,
}

/// `GET /pipeline/runs?date=YYYY-MM-DD` -- lists all runs for a date.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_runs_handler(
    State(state): State<AppState>,
    axum::extract::Query(query): axum::extract::Query<ListRunsQuery>,
) -> Result<Json<Vec<RunView>>, ApiError> {
    let target_date = query
        .date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc();

    let runs = state.runs.get_runs_by_date(target_date).await?;
    Ok(Json(runs.into_iter().map(RunView::from).collect()))
}

/// JSON view of a [`Run`](newsgrid_core::Run) returned by the trigger API.
#[derive(Debug, serde::Serialize)]
pub struct RunView {
    pub run_id: String,
    pub status: RunStatus,
    pub tier: Tier,
    pub entries_total: i64,
    pub entries_failed: i64,
}

impl From<newsgrid_core::Run> for RunView {
    fn from(run: newsgrid_core::Run) -> Self {
        Self {
            run_id: run.run_id,
            status: run.status,
            tier: run.tier,
            entries_total: run.entries_total,
            entries_failed: run.entries_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_run_request_deserializes_without_fields() {
        let req: TriggerRunRequest = serde_json::from_str("{}").unwrap();
        assert!(req.target_date.is_none());
        assert!(req.tier.is_none());
    }

    #[test]
    fn trigger_run_request_deserializes_with_fields() {
        let req: TriggerRunRequest =
            serde_json::from_str(r#"{"target_date":"2026-01-15","tier":"premium"}"#).unwrap();
        assert_eq!(req.target_date, Some(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()));
        assert_eq!(req.tier.as_deref(), Some("premium"));
    }
}
