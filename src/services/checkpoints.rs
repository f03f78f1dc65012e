//! Checkpoint arrival times.
//!
//! Maps the course's fixed checkpoint list through the point-projection
//! engine. The start checkpoint always shows the race start clock time,
//! whether or not a target is set.

use serde::Serialize;
use utoipa::ToSchema;

use crate::services::course::{CheckpointKind, CheckpointSpec, Course};
use crate::services::pacing::{
    compute_arrival_at_distance, elapsed_minutes_at_distance, TargetDuration,
};

/// A checkpoint with its projected arrival.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Checkpoint {
    /// Checkpoint name (e.g. "MARINA")
    pub name: String,
    /// Distance from start in km
    pub km: f64,
    /// Start, aid station, landmark or finish
    pub kind: CheckpointKind,
    /// Short note shown next to the checkpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Projected clock time of arrival (`HH:MM`), "00:00" when no target is set
    pub arrival: String,
    /// Minutes from race start; absent when no target is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_minutes: Option<f64>,
}

/// Project arrival times for all of the course's checkpoints.
pub fn assemble_checkpoints(course: &Course, target: TargetDuration) -> Vec<Checkpoint> {
    course
        .checkpoints()
        .iter()
        .map(|spec| assemble_checkpoint(course, target, spec))
        .collect()
}

fn assemble_checkpoint(
    course: &Course,
    target: TargetDuration,
    spec: &CheckpointSpec,
) -> Checkpoint {
    let (arrival, elapsed_minutes) = match spec.kind {
        CheckpointKind::Start => (
            course.race_start().format("%H:%M").to_string(),
            Some(0.0),
        ),
        _ => (
            compute_arrival_at_distance(course, target, spec.km),
            elapsed_minutes_at_distance(course, target, spec.km),
        ),
    };

    Checkpoint {
        name: spec.name.clone(),
        km: spec.km,
        kind: spec.kind,
        description: spec.description.clone(),
        arrival,
        elapsed_minutes,
    }
}
