use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::AppState;
use crate::services::course::{CheckpointSpec, ElevationPoint, Segment};

/// Response type for GET /api/v1/course.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourseResponse {
    /// Race name (e.g. "Ultra Helike 100km")
    pub name: String,
    /// Race start clock time (`HH:MM`)
    pub race_start: String,
    /// Finish cutoff in minutes from the start, if any
    pub cutoff_minutes: Option<i64>,
    /// Total distance in km (end of the last segment)
    pub total_distance_km: f64,
    /// Ordered, contiguous segments
    pub segments: Vec<Segment>,
    /// Fixed checkpoints along the course
    pub checkpoints: Vec<CheckpointSpec>,
    /// Elevation profile points, ordered by km
    pub elevation_profile: Vec<ElevationPoint>,
}

/// Get the course model: segments, checkpoints and elevation profile.
#[utoipa::path(
    get,
    path = "/api/v1/course",
    tag = "Course",
    responses(
        (status = 200, description = "The race course", body = CourseResponse),
    )
)]
pub async fn get_course(State(state): State<AppState>) -> Json<CourseResponse> {
    let course = &state.course;
    Json(CourseResponse {
        name: course.name().to_string(),
        race_start: course.race_start().format("%H:%M").to_string(),
        cutoff_minutes: course.cutoff_minutes(),
        total_distance_km: course.total_distance_km(),
        segments: course.segments().to_vec(),
        checkpoints: course.checkpoints().to_vec(),
        elevation_profile: course.elevation_profile().to_vec(),
    })
}
