//! Race-plan HTTP endpoints.
//!
//! - GET /api/v1/plan?hours=H&minutes=M
//! - GET /api/v1/plan/arrival?hours=H&minutes=M&km=K
//! - GET /api/v1/plan/itinerary?hours=H&minutes=M&runner_name=NAME
//! - GET /api/v1/plan/itinerary.txt?hours=H&minutes=M&runner_name=NAME
//!
//! Every response is computed from scratch for the request; nothing is stored.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::routes::AppState;
use crate::services::checkpoints::{assemble_checkpoints, Checkpoint};
use crate::services::itinerary::{build_itinerary, render_text, Itinerary};
use crate::services::pacing::{
    compute_arrival_at_distance, compute_segment_paces, elapsed_minutes_at_distance,
    ComputedSegment, TargetDuration,
};
use crate::services::summary::{compute_race_pace, RacePace};

/// Maximum accepted target duration (3 days).
const MAX_TARGET_MINUTES: u64 = 72 * 60;

fn default_hours() -> u32 {
    14
}

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct PlanQuery {
    /// Target hours (default 14)
    #[serde(default = "default_hours")]
    pub hours: u32,
    /// Target minutes (default 0)
    #[serde(default)]
    pub minutes: u32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ArrivalQuery {
    /// Target hours (default 14)
    #[serde(default = "default_hours")]
    pub hours: u32,
    /// Target minutes (default 0)
    #[serde(default)]
    pub minutes: u32,
    /// Distance from start in km; need not be a segment boundary
    pub km: f64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ItineraryQuery {
    /// Target hours (default 14)
    #[serde(default = "default_hours")]
    pub hours: u32,
    /// Target minutes (default 0)
    #[serde(default)]
    pub minutes: u32,
    /// Runner name printed on the itinerary
    pub runner_name: Option<String>,
}

/// Reject targets beyond `MAX_TARGET_MINUTES`.
///
/// Zero is accepted: the engine answers with its "no target" fallback.
fn target_from_query(hours: u32, minutes: u32) -> Result<TargetDuration, AppError> {
    let total = u64::from(hours) * 60 + u64::from(minutes);
    if total > MAX_TARGET_MINUTES {
        return Err(AppError::BadRequest(format!(
            "target duration must not exceed {} hours",
            MAX_TARGET_MINUTES / 60
        )));
    }
    // Both parts are bounded by MAX_TARGET_MINUTES here
    Ok(TargetDuration::new(hours as i32, minutes as i32))
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Full race plan for a target duration.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlanResponse {
    /// Course name
    pub course_name: String,
    /// Target finish time as entered
    pub target: TargetDuration,
    /// hours × 60 + minutes
    pub total_target_minutes: i64,
    /// Race start clock time (`HH:MM`)
    pub race_start: String,
    /// Course-wide summary paces
    pub race_pace: RacePace,
    /// Per-segment pace and arrival; projections absent when no target is set
    pub segments: Vec<ComputedSegment>,
    /// Checkpoint arrival times
    pub checkpoints: Vec<Checkpoint>,
    /// Projected minutes to the finish under the segment model
    pub projected_finish_minutes: Option<f64>,
    /// Whether the projected finish is inside the race cutoff.
    /// Null when no target is set or the course has no cutoff.
    pub within_cutoff: Option<bool>,
}

/// Arrival projection at a single distance.
#[derive(Debug, Serialize, ToSchema)]
pub struct ArrivalResponse {
    /// Queried distance in km
    pub km: f64,
    /// Minutes from race start; null when no target is set
    pub elapsed_minutes: Option<f64>,
    /// Clock time (`HH:MM`), "00:00" when no target is set
    pub arrival: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Get the race plan for a target finish time.
///
/// Computes per-segment paces and arrival times, checkpoint arrivals and the
/// summary paces. A zero target returns the segments without projections.
#[utoipa::path(
    get,
    path = "/api/v1/plan",
    tag = "Plan",
    params(PlanQuery),
    responses(
        (status = 200, description = "Race plan", body = PlanResponse),
        (status = 400, description = "Target duration out of range", body = ErrorResponse),
    )
)]
pub async fn get_plan(
    State(state): State<AppState>,
    Query(params): Query<PlanQuery>,
) -> Result<Json<PlanResponse>, AppError> {
    let target = target_from_query(params.hours, params.minutes)?;
    let course = &state.course;

    let projected_finish_minutes =
        elapsed_minutes_at_distance(course, target, course.total_distance_km());
    let within_cutoff = projected_finish_minutes
        .zip(course.cutoff_minutes())
        .map(|(finish, cutoff)| finish <= cutoff as f64);

    tracing::debug!(
        "Plan for {}h{:02}m: projected finish {:?} min",
        target.hours,
        target.minutes,
        projected_finish_minutes
    );

    Ok(Json(PlanResponse {
        course_name: course.name().to_string(),
        target,
        total_target_minutes: target.total_minutes(),
        race_start: course.race_start().format("%H:%M").to_string(),
        race_pace: compute_race_pace(course, target),
        segments: compute_segment_paces(course, target),
        checkpoints: assemble_checkpoints(course, target),
        projected_finish_minutes,
        within_cutoff,
    }))
}

/// Get the projected arrival at an arbitrary distance.
#[utoipa::path(
    get,
    path = "/api/v1/plan/arrival",
    tag = "Plan",
    params(ArrivalQuery),
    responses(
        (status = 200, description = "Arrival projection", body = ArrivalResponse),
        (status = 400, description = "Invalid distance or target", body = ErrorResponse),
    )
)]
pub async fn get_arrival(
    State(state): State<AppState>,
    Query(params): Query<ArrivalQuery>,
) -> Result<Json<ArrivalResponse>, AppError> {
    // NaN passes neither `< 0.0` nor `>= 0.0`, so check finiteness first
    if !params.km.is_finite() || params.km < 0.0 {
        return Err(AppError::BadRequest(
            "km must be a finite, non-negative number".to_string(),
        ));
    }
    let target = target_from_query(params.hours, params.minutes)?;

    Ok(Json(ArrivalResponse {
        km: params.km,
        elapsed_minutes: elapsed_minutes_at_distance(&state.course, target, params.km),
        arrival: compute_arrival_at_distance(&state.course, target, params.km),
    }))
}

/// Get the printable itinerary data.
#[utoipa::path(
    get,
    path = "/api/v1/plan/itinerary",
    tag = "Plan",
    params(ItineraryQuery),
    responses(
        (status = 200, description = "Itinerary", body = Itinerary),
        (status = 400, description = "Target duration out of range", body = ErrorResponse),
    )
)]
pub async fn get_itinerary(
    State(state): State<AppState>,
    Query(params): Query<ItineraryQuery>,
) -> Result<Json<Itinerary>, AppError> {
    let target = target_from_query(params.hours, params.minutes)?;
    Ok(Json(build_itinerary(
        &state.course,
        target,
        params.runner_name.as_deref(),
    )))
}

/// ASCII-only file name for the `Content-Disposition` header.
fn attachment_filename(filename: &str) -> String {
    let stem = filename.strip_suffix(".pdf").unwrap_or(filename);
    let safe: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.txt", safe)
}

/// Download the itinerary as plain text.
#[utoipa::path(
    get,
    path = "/api/v1/plan/itinerary.txt",
    tag = "Plan",
    params(ItineraryQuery),
    responses(
        (status = 200, description = "Plain-text itinerary attachment", body = String, content_type = "text/plain"),
        (status = 400, description = "Target duration out of range", body = ErrorResponse),
    )
)]
pub async fn download_itinerary(
    State(state): State<AppState>,
    Query(params): Query<ItineraryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let target = target_from_query(params.hours, params.minutes)?;
    let itinerary = build_itinerary(&state.course, target, params.runner_name.as_deref());
    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment_filename(&itinerary.filename)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        render_text(&itinerary),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_state;
    use axum::http::StatusCode;

    fn plan_query(hours: u32, minutes: u32) -> Query<PlanQuery> {
        Query(PlanQuery { hours, minutes })
    }

    #[tokio::test]
    async fn test_plan_fourteen_hours() {
        let Json(plan) = get_plan(State(test_state()), plan_query(14, 0))
            .await
            .unwrap();

        assert_eq!(plan.total_target_minutes, 840);
        assert_eq!(plan.race_start, "06:00");
        assert_eq!(plan.race_pace.avg, "8:24");
        assert_eq!(plan.segments.len(), 5);
        let first = plan.segments[0].projection.as_ref().unwrap();
        assert_eq!(first.pace, "7:59");
        assert_eq!(first.arrival_clock_time, "08:24");
        assert_eq!(plan.checkpoints[1].arrival, "08:24");
        // 913.92 min projected, well inside 24h
        assert_eq!(plan.within_cutoff, Some(true));
    }

    #[tokio::test]
    async fn test_plan_zero_target_falls_back() {
        let Json(plan) = get_plan(State(test_state()), plan_query(0, 0))
            .await
            .unwrap();

        assert!(plan.segments.iter().all(|s| s.projection.is_none()));
        assert_eq!(plan.race_pace.avg, "0:00");
        assert_eq!(plan.projected_finish_minutes, None);
        assert_eq!(plan.within_cutoff, None);
        assert_eq!(plan.checkpoints[0].arrival, "06:00");
        assert_eq!(plan.checkpoints[2].arrival, "00:00");
    }

    #[tokio::test]
    async fn test_plan_beyond_cutoff() {
        // 26h target → projected 1697.28 min under the segment model
        let Json(plan) = get_plan(State(test_state()), plan_query(26, 0))
            .await
            .unwrap();
        assert_eq!(plan.within_cutoff, Some(false));
    }

    #[tokio::test]
    async fn test_plan_rejects_huge_target() {
        let err = get_plan(State(test_state()), plan_query(73, 0))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_plan_minutes_overflowing_hour() {
        // 13h 60m is accepted and equals 14h
        let Json(a) = get_plan(State(test_state()), plan_query(13, 60))
            .await
            .unwrap();
        let Json(b) = get_plan(State(test_state()), plan_query(14, 0))
            .await
            .unwrap();
        assert_eq!(a.segments, b.segments);
    }

    #[tokio::test]
    async fn test_arrival_mid_segment() {
        let Json(arrival) = get_arrival(
            State(test_state()),
            Query(ArrivalQuery {
                hours: 14,
                minutes: 0,
                km: 45.0,
            }),
        )
        .await
        .unwrap();
        assert_eq!(arrival.arrival, "13:09");
        assert!((arrival.elapsed_minutes.unwrap() - 428.82).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_arrival_no_target() {
        let Json(arrival) = get_arrival(
            State(test_state()),
            Query(ArrivalQuery {
                hours: 0,
                minutes: 0,
                km: 50.0,
            }),
        )
        .await
        .unwrap();
        assert_eq!(arrival.arrival, "00:00");
        assert_eq!(arrival.elapsed_minutes, None);
    }

    #[tokio::test]
    async fn test_arrival_rejects_bad_km() {
        for km in [-1.0, f64::NAN, f64::INFINITY] {
            let result = get_arrival(
                State(test_state()),
                Query(ArrivalQuery {
                    hours: 14,
                    minutes: 0,
                    km,
                }),
            )
            .await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
    }

    #[tokio::test]
    async fn test_itinerary_filename() {
        let Json(it) = get_itinerary(
            State(test_state()),
            Query(ItineraryQuery {
                hours: 14,
                minutes: 0,
                runner_name: Some("marta".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(it.filename, "RacePlan_UltraHelike_MARTA.pdf");
    }

    #[tokio::test]
    async fn test_download_itinerary_headers() {
        let response = download_itinerary(
            State(test_state()),
            Query(ItineraryQuery {
                hours: 14,
                minutes: 0,
                runner_name: Some("josé".to_string()),
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(
            disposition,
            "attachment; filename=\"RacePlan_UltraHelike_JOS_.txt\""
        );
    }

    #[test]
    fn test_attachment_filename() {
        assert_eq!(
            attachment_filename("RacePlan_UltraHelike_PRO.pdf"),
            "RacePlan_UltraHelike_PRO.txt"
        );
        assert_eq!(
            attachment_filename("RacePlan_UltraHelike_ANA GIL.pdf"),
            "RacePlan_UltraHelike_ANA_GIL.txt"
        );
    }
}
