//! Course-wide pace summary.
//!
//! Answers "what pace should I run on flat / climbing / descending terrain in
//! general" for a target, using fixed heuristic factors. Deliberately separate
//! from the per-segment terrain factors in the course model.

use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::format_pace;
use crate::services::course::Course;
use crate::services::pacing::{average_pace, TargetDuration};

/// Flat terrain runs slightly faster than the average.
const FLAT_FACTOR: f64 = 0.95;
/// Climbs (and sand) run much slower than the average.
const UPHILL_FACTOR: f64 = 1.30;
const DOWNHILL_FACTOR: f64 = 0.90;

/// Summary paces, each formatted as `M:SS` per km.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RacePace {
    /// Overall average pace
    pub avg: String,
    /// Flat / asphalt pace
    pub flat: String,
    /// Uphill / sand pace
    pub uphill: String,
    /// Downhill pace
    pub downhill: String,
}

impl Default for RacePace {
    fn default() -> Self {
        Self {
            avg: "0:00".to_string(),
            flat: "0:00".to_string(),
            uphill: "0:00".to_string(),
            downhill: "0:00".to_string(),
        }
    }
}

/// Compute the summary paces over the course's total distance.
///
/// All four are "0:00" when the target is not set.
pub fn compute_race_pace(course: &Course, target: TargetDuration) -> RacePace {
    let Some(avg) = average_pace(course, target) else {
        return RacePace::default();
    };

    RacePace {
        avg: format_pace(avg),
        flat: format_pace(avg * FLAT_FACTOR),
        uphill: format_pace(avg * UPHILL_FACTOR),
        downhill: format_pace(avg * DOWNHILL_FACTOR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_pace_fourteen_hours() {
        let pace = compute_race_pace(&Course::ultra_helike(), TargetDuration::new(14, 0));
        assert_eq!(
            pace,
            RacePace {
                avg: "8:24".to_string(),
                flat: "7:59".to_string(),
                uphill: "10:55".to_string(),
                downhill: "7:34".to_string(),
            }
        );
    }

    #[test]
    fn test_race_pace_ten_hours() {
        // 6.0 min/km average
        let pace = compute_race_pace(&Course::ultra_helike(), TargetDuration::new(10, 0));
        assert_eq!(pace.avg, "6:00");
        assert_eq!(pace.flat, "5:42");
        assert_eq!(pace.uphill, "7:48");
        assert_eq!(pace.downhill, "5:24");
    }

    #[test]
    fn test_race_pace_unset_target() {
        let pace = compute_race_pace(&Course::ultra_helike(), TargetDuration::new(0, 0));
        assert_eq!(pace, RacePace::default());
    }

    #[test]
    fn test_race_pace_ignores_segment_factors() {
        // Segment 2 is 1.35 in the course model; the summary uphill stays at 1.30
        let pace = compute_race_pace(&Course::ultra_helike(), TargetDuration::new(14, 0));
        assert_ne!(pace.uphill, "11:20");
    }
}
