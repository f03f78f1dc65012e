//! Pace and arrival-time projection.
//!
//! Given a target finish duration, every segment runs at the course-wide
//! average pace scaled by its terrain factor:
//!
//!   avg_pace = target_minutes / total_distance_km
//!   seg_pace = avg_pace * terrain_factor
//!
//! Elapsed time is accumulated segment by segment from the race start. Note
//! that with terrain factors that don't average out to 1.0 over distance the
//! projected finish differs from the target; that is the intended model.
//!
//! Everything here is a pure function of (course, target[, km]). Nothing is
//! cached between calls.

use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::{format_clock_time, format_duration, format_pace};
use crate::services::course::{Course, Segment};

/// Returned by `compute_arrival_at_distance` when no target is set.
pub const NO_TARGET_ARRIVAL: &str = "00:00";

/// The runner's goal finish time.
///
/// Not validated: minutes may exceed 59 and either part may be negative.
/// Only the total matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TargetDuration {
    pub hours: i32,
    pub minutes: i32,
}

impl TargetDuration {
    pub fn new(hours: i32, minutes: i32) -> Self {
        Self { hours, minutes }
    }

    /// hours × 60 + minutes.
    pub fn total_minutes(&self) -> i64 {
        i64::from(self.hours) * 60 + i64::from(self.minutes)
    }

    /// Whether a positive target has been entered.
    pub fn is_set(&self) -> bool {
        self.total_minutes() > 0
    }
}

/// Pace and timing for one segment under a given target.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SegmentProjection {
    /// Segment pace in decimal minutes per km
    pub pace_min_per_km: f64,
    /// Segment pace as `M:SS` per km
    pub pace: String,
    /// Time spent in this segment, in minutes
    pub duration_minutes: f64,
    /// Time spent in this segment as `H:MM`
    pub duration: String,
    /// Minutes from race start to the end of this segment
    pub elapsed_minutes: f64,
    /// Clock time at the end of this segment (`HH:MM`)
    pub arrival_clock_time: String,
}

/// A segment together with its projection, if a target is set.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ComputedSegment {
    #[serde(flatten)]
    pub segment: Segment,
    /// Absent when no target duration is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<SegmentProjection>,
}

/// Average pace over the whole course, in decimal minutes per km.
///
/// `None` when the target is not set (≤ 0 minutes).
pub fn average_pace(course: &Course, target: TargetDuration) -> Option<f64> {
    if !target.is_set() {
        return None;
    }
    Some(target.total_minutes() as f64 / course.total_distance_km())
}

/// Project pace and arrival time for every segment of the course.
///
/// Output has the same length and order as the course's segments. When the
/// target is not set, segments come back without a projection so callers can
/// still show terrain and strategy.
pub fn compute_segment_paces(course: &Course, target: TargetDuration) -> Vec<ComputedSegment> {
    let Some(avg_pace) = average_pace(course, target) else {
        return course
            .segments()
            .iter()
            .cloned()
            .map(|segment| ComputedSegment {
                segment,
                projection: None,
            })
            .collect();
    };

    let mut accumulated_minutes = 0.0;
    course
        .segments()
        .iter()
        .map(|seg| {
            let pace_min_per_km = avg_pace * seg.terrain_factor;
            let duration_minutes = pace_min_per_km * seg.distance_km();
            accumulated_minutes += duration_minutes;

            ComputedSegment {
                segment: seg.clone(),
                projection: Some(SegmentProjection {
                    pace_min_per_km,
                    pace: format_pace(pace_min_per_km),
                    duration_minutes,
                    duration: format_duration(duration_minutes),
                    elapsed_minutes: accumulated_minutes,
                    arrival_clock_time: format_clock_time(course.race_start(), accumulated_minutes),
                }),
            }
        })
        .collect()
}

/// Minutes from the race start until the runner reaches `query_km`.
///
/// `query_km` need not fall on a segment boundary: the segment containing it
/// is consumed proportionally. Distances past the finish clamp to the finish
/// time; distances ≤ 0 are the start (0 minutes). `None` when the target is
/// not set.
pub fn elapsed_minutes_at_distance(
    course: &Course,
    target: TargetDuration,
    query_km: f64,
) -> Option<f64> {
    let avg_pace = average_pace(course, target)?;

    let mut accumulated_minutes = 0.0;
    let mut remaining_km = query_km;
    for seg in course.segments() {
        if remaining_km <= 0.0 {
            break;
        }
        let km_in_segment = remaining_km.min(seg.distance_km());
        accumulated_minutes += km_in_segment * avg_pace * seg.terrain_factor;
        remaining_km -= km_in_segment;
    }

    Some(accumulated_minutes)
}

/// Clock time (`HH:MM`) at which the runner reaches `query_km`.
///
/// Returns the `"00:00"` sentinel when the target is not set.
pub fn compute_arrival_at_distance(
    course: &Course,
    target: TargetDuration,
    query_km: f64,
) -> String {
    match elapsed_minutes_at_distance(course, target, query_km) {
        Some(minutes) => format_clock_time(course.race_start(), minutes),
        None => NO_TARGET_ARRIVAL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn fourteen_hours() -> TargetDuration {
        TargetDuration::new(14, 0)
    }

    #[test]
    fn test_total_minutes() {
        assert_eq!(TargetDuration::new(14, 0).total_minutes(), 840);
        assert_eq!(TargetDuration::new(0, 90).total_minutes(), 90);
        assert_eq!(TargetDuration::new(1, -90).total_minutes(), -30);
        assert!(!TargetDuration::new(0, 0).is_set());
        assert!(!TargetDuration::new(1, -60).is_set());
    }

    #[test]
    fn test_target_duration_serializes_as_entered() {
        let json = serde_json::to_value(TargetDuration::new(13, 75)).unwrap();
        assert_eq!(json, serde_json::json!({ "hours": 13, "minutes": 75 }));
    }

    #[test]
    fn test_average_pace_fourteen_hours() {
        let course = Course::ultra_helike();
        let avg = average_pace(&course, fourteen_hours()).unwrap();
        assert!((avg - 8.4).abs() < EPS);
    }

    #[test]
    fn test_first_segment_fourteen_hours() {
        let course = Course::ultra_helike();
        let segments = compute_segment_paces(&course, fourteen_hours());
        let first = segments[0].projection.as_ref().unwrap();

        assert!((first.pace_min_per_km - 7.98).abs() < EPS);
        assert_eq!(first.pace, "7:59");
        assert!((first.duration_minutes - 143.64).abs() < EPS);
        assert!((first.elapsed_minutes - 143.64).abs() < EPS);
        assert_eq!(first.arrival_clock_time, "08:24");
    }

    #[test]
    fn test_all_segments_fourteen_hours() {
        let course = Course::ultra_helike();
        let segments = compute_segment_paces(&course, fourteen_hours());
        let paces: Vec<&str> = segments
            .iter()
            .map(|s| s.projection.as_ref().unwrap().pace.as_str())
            .collect();
        // 8.4 × {0.95, 1.35, 1.10, 1.05, 1.0}
        assert_eq!(paces, vec!["7:59", "11:20", "9:14", "8:49", "8:24"]);

        // 143.64 + 192.78 + 231 + 220.5 + 126 = 913.92 min → 06:00 + 15:14
        let last = segments[4].projection.as_ref().unwrap();
        assert!((last.elapsed_minutes - 913.92).abs() < 1e-6);
        assert_eq!(last.arrival_clock_time, "21:14");
    }

    #[test]
    fn test_segment_paces_preserve_order_and_length() {
        let course = Course::ultra_helike();
        let segments = compute_segment_paces(&course, fourteen_hours());
        assert_eq!(segments.len(), course.segments().len());
        for (computed, original) in segments.iter().zip(course.segments()) {
            assert_eq!(&computed.segment, original);
        }
    }

    #[test]
    fn test_segment_paces_no_target() {
        let course = Course::ultra_helike();
        let segments = compute_segment_paces(&course, TargetDuration::new(0, 0));
        assert_eq!(segments.len(), 5);
        assert!(segments.iter().all(|s| s.projection.is_none()));
    }

    #[test]
    fn test_segment_paces_negative_target() {
        let course = Course::ultra_helike();
        let segments = compute_segment_paces(&course, TargetDuration::new(0, -30));
        assert!(segments.iter().all(|s| s.projection.is_none()));
    }

    #[test]
    fn test_segment_paces_idempotent() {
        let course = Course::ultra_helike();
        let a = serde_json::to_string(&compute_segment_paces(&course, fourteen_hours())).unwrap();
        let b = serde_json::to_string(&compute_segment_paces(&course, fourteen_hours())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_arrival_at_start_is_race_start() {
        let course = Course::ultra_helike();
        assert_eq!(compute_arrival_at_distance(&course, fourteen_hours(), 0.0), "06:00");
        assert_eq!(
            compute_arrival_at_distance(&course, TargetDuration::new(20, 30), 0.0),
            "06:00"
        );
    }

    #[test]
    fn test_arrival_at_segment_boundary() {
        let course = Course::ultra_helike();
        assert_eq!(compute_arrival_at_distance(&course, fourteen_hours(), 18.0), "08:24");
    }

    #[test]
    fn test_arrival_mid_segment_is_proportional() {
        let course = Course::ultra_helike();
        // km 9 is half of segment 1 → 71.82 min
        let minutes = elapsed_minutes_at_distance(&course, fourteen_hours(), 9.0).unwrap();
        assert!((minutes - 71.82).abs() < EPS);

        // km 45 = all of segments 1-2 plus 10 km of segment 3 (9.24 min/km)
        let minutes = elapsed_minutes_at_distance(&course, fourteen_hours(), 45.0).unwrap();
        assert!((minutes - (143.64 + 192.78 + 92.4)).abs() < 1e-6);
        assert_eq!(compute_arrival_at_distance(&course, fourteen_hours(), 45.0), "13:09");
    }

    #[test]
    fn test_arrival_past_finish_clamps() {
        let course = Course::ultra_helike();
        let finish = elapsed_minutes_at_distance(&course, fourteen_hours(), 100.0).unwrap();
        let beyond = elapsed_minutes_at_distance(&course, fourteen_hours(), 250.0).unwrap();
        assert!((finish - beyond).abs() < EPS);
        assert_eq!(
            compute_arrival_at_distance(&course, fourteen_hours(), 250.0),
            compute_arrival_at_distance(&course, fourteen_hours(), 100.0)
        );
    }

    #[test]
    fn test_arrival_negative_km_is_start() {
        let course = Course::ultra_helike();
        let minutes = elapsed_minutes_at_distance(&course, fourteen_hours(), -5.0).unwrap();
        assert_eq!(minutes, 0.0);
    }

    #[test]
    fn test_arrival_no_target_sentinel() {
        let course = Course::ultra_helike();
        let zero = TargetDuration::new(0, 0);
        assert_eq!(compute_arrival_at_distance(&course, zero, 50.0), NO_TARGET_ARRIVAL);
        assert_eq!(compute_arrival_at_distance(&course, zero, 0.0), "00:00");
        assert!(elapsed_minutes_at_distance(&course, zero, 50.0).is_none());
    }

    #[test]
    fn test_segment_sum_matches_point_query_at_finish() {
        let course = Course::ultra_helike();
        let segments = compute_segment_paces(&course, fourteen_hours());
        let sum: f64 = segments
            .iter()
            .map(|s| s.projection.as_ref().unwrap().duration_minutes)
            .sum();
        let last_elapsed = segments.last().unwrap().projection.as_ref().unwrap().elapsed_minutes;
        let at_finish =
            elapsed_minutes_at_distance(&course, fourteen_hours(), course.total_distance_km())
                .unwrap();
        assert!((sum - last_elapsed).abs() < 1e-6);
        assert!((sum - at_finish).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_arrival_is_monotonic(
            hours in 1i32..48,
            minutes in 0i32..60,
            a in 0.0f64..120.0,
            b in 0.0f64..120.0,
        ) {
            let course = Course::ultra_helike();
            let target = TargetDuration::new(hours, minutes);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let t_lo = elapsed_minutes_at_distance(&course, target, lo).unwrap();
            let t_hi = elapsed_minutes_at_distance(&course, target, hi).unwrap();
            prop_assert!(t_lo <= t_hi + 1e-9);
        }

        #[test]
        fn prop_segment_sum_round_trips(hours in 1i32..48, minutes in 0i32..60) {
            let course = Course::ultra_helike();
            let target = TargetDuration::new(hours, minutes);
            let segments = compute_segment_paces(&course, target);
            let mut previous = 0.0;
            for s in &segments {
                let p = s.projection.as_ref().unwrap();
                prop_assert!(p.elapsed_minutes >= previous);
                previous = p.elapsed_minutes;
            }
            let at_finish = elapsed_minutes_at_distance(&course, target, 100.0).unwrap();
            prop_assert!((previous - at_finish).abs() < 1e-6);
        }

        #[test]
        fn prop_unset_target_always_sentinel(minutes in -600i32..=0, km in 0.0f64..150.0) {
            let course = Course::ultra_helike();
            let target = TargetDuration::new(0, minutes);
            prop_assert_eq!(compute_arrival_at_distance(&course, target, km), NO_TARGET_ARRIVAL);
        }
    }
}
