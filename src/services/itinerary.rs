//! Downloadable race itinerary.
//!
//! Bundles the same computed data the plan endpoint serves (summary paces,
//! segments, checkpoints) with the runner's name and the export file name.
//! `render_text` produces a printable plain-text version.

use serde::Serialize;
use std::fmt::Write;
use utoipa::ToSchema;

use crate::services::checkpoints::{assemble_checkpoints, Checkpoint};
use crate::services::course::Course;
use crate::services::pacing::{compute_segment_paces, ComputedSegment, TargetDuration};
use crate::services::summary::{compute_race_pace, RacePace};

/// Runner label used when no name was given.
const DEFAULT_RUNNER_LABEL: &str = "PRO";

/// Everything needed to print a race plan.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Itinerary {
    /// Course name
    pub course_name: String,
    /// Runner name, upper-cased; absent when not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_name: Option<String>,
    /// Suggested download file name
    pub filename: String,
    /// Target finish time
    pub target: TargetDuration,
    /// Race start clock time (`HH:MM`)
    pub race_start: String,
    /// Course-wide summary paces
    pub race_pace: RacePace,
    /// Checkpoint arrival strip
    pub checkpoints: Vec<Checkpoint>,
    /// Segment strategy table
    pub segments: Vec<ComputedSegment>,
}

/// Normalize a runner name for display: trimmed and upper-cased, `None` if blank.
fn normalize_runner_name(runner_name: Option<&str>) -> Option<String> {
    runner_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_uppercase)
}

/// `RacePlan_UltraHelike_<RUNNER_NAME_OR_PRO>.pdf`
pub fn export_filename(runner_name: Option<&str>) -> String {
    let label =
        normalize_runner_name(runner_name).unwrap_or_else(|| DEFAULT_RUNNER_LABEL.to_string());
    format!("RacePlan_UltraHelike_{}.pdf", label)
}

/// Build the itinerary for a target and (optional) runner name.
pub fn build_itinerary(
    course: &Course,
    target: TargetDuration,
    runner_name: Option<&str>,
) -> Itinerary {
    Itinerary {
        course_name: course.name().to_string(),
        runner_name: normalize_runner_name(runner_name),
        filename: export_filename(runner_name),
        target,
        race_start: course.race_start().format("%H:%M").to_string(),
        race_pace: compute_race_pace(course, target),
        checkpoints: assemble_checkpoints(course, target),
        segments: compute_segment_paces(course, target),
    }
}

/// Render the itinerary as plain text.
pub fn render_text(itinerary: &Itinerary) -> String {
    let mut out = String::new();
    write_text(&mut out, itinerary).expect("writing to a String cannot fail");
    out
}

fn write_text(out: &mut String, it: &Itinerary) -> std::fmt::Result {
    writeln!(out, "{}", it.course_name.to_uppercase())?;
    writeln!(
        out,
        "Runner: {}",
        it.runner_name.as_deref().unwrap_or(DEFAULT_RUNNER_LABEL)
    )?;
    writeln!(
        out,
        "Target: {}h {:02}m | Start {}",
        it.target.hours, it.target.minutes, it.race_start
    )?;
    writeln!(
        out,
        "Paces: avg {} | flat {} | uphill {} | downhill {}",
        it.race_pace.avg, it.race_pace.flat, it.race_pace.uphill, it.race_pace.downhill
    )?;

    writeln!(out)?;
    writeln!(out, "CHECKPOINTS")?;
    for cp in &it.checkpoints {
        writeln!(out, "  {:<12} KM {:>5.1}  {}", cp.name, cp.km, cp.arrival)?;
    }

    writeln!(out)?;
    writeln!(out, "SEGMENTS")?;
    for computed in &it.segments {
        let seg = &computed.segment;
        let (pace, arrival) = computed
            .projection
            .as_ref()
            .map(|p| (p.pace.as_str(), p.arrival_clock_time.as_str()))
            .unwrap_or(("-", "-"));
        writeln!(
            out,
            "  {}. {} (km {}-{}, {}) pace {}/km, arrive {}",
            seg.id, seg.name, seg.start_km, seg.end_km, seg.elevation, pace, arrival
        )?;
        writeln!(out, "     {}", seg.strategy)?;
    }

    Ok(())
}
