//! Course model for the race.
//!
//! A course is an ordered, contiguous list of segments (each with its own
//! terrain factor), the fixed checkpoints along it and a coarse elevation
//! profile. Courses are validated once at construction so the pacing engine
//! never has to defend against malformed data per call.
//!
//! The built-in course is the Ultra Helike 100km; a different race can be
//! supplied as a JSON file with the same shape (see `load_course_file`).

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use utoipa::ToSchema;

/// Tolerance when checking that consecutive segments share a boundary.
const BOUNDARY_EPSILON_KM: f64 = 1e-9;

/// Errors that can occur while loading or validating a course.
#[derive(Debug, Error)]
pub enum CourseError {
    #[error("IO error reading course file: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Course must contain at least one segment")]
    EmptySegments,
    #[error("Duplicate segment id {0}")]
    DuplicateSegmentId(u32),
    #[error("Segment {id} has invalid bounds {start_km}..{end_km}")]
    InvalidSegmentBounds { id: u32, start_km: f64, end_km: f64 },
    #[error("Segment {id} starts at {found_km} km but the previous segment ends at {expected_km} km")]
    NotContiguous {
        id: u32,
        expected_km: f64,
        found_km: f64,
    },
    #[error("Segment {id} has non-positive terrain factor {factor}")]
    InvalidTerrainFactor { id: u32, factor: f64 },
    #[error("Checkpoint '{name}' at {km} km lies outside the course (0..{total_km} km)")]
    CheckpointOutOfRange { name: String, km: f64, total_km: f64 },
    #[error("Elevation point at {km} km is out of range or out of order")]
    InvalidElevationPoint { km: f64 },
}

/// Surface type of a segment. Descriptive only; the engine uses `terrain_factor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Asphalt,
    Mountain,
    Sand,
    Track,
    MixedAsphalt,
    Urban,
}

/// A contiguous distance interval of the course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Segment {
    /// Unique ordinal identifier
    pub id: u32,
    /// Display label (e.g. "Sierra y Pantano")
    pub name: String,
    /// Distance from start where the segment begins, in km
    pub start_km: f64,
    /// Distance from start where the segment ends, in km
    pub end_km: f64,
    /// Surface type
    pub terrain: Terrain,
    /// Multiplier on the average pace: 1.0 = average, >1.0 = slower, <1.0 = faster
    pub terrain_factor: f64,
    /// Elevation delta as display text (e.g. "+600m")
    pub elevation: String,
    /// Strategy note for the runner
    pub strategy: String,
    /// Display accent
    pub color: String,
}

impl Segment {
    /// Length of the segment in km.
    pub fn distance_km(&self) -> f64 {
        self.end_km - self.start_km
    }
}

/// Role of a checkpoint along the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    Start,
    Aid,
    Landmark,
    Finish,
}

/// A named fixed-distance point on the course (before arrival times are known).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckpointSpec {
    /// Checkpoint name (e.g. "PANTANO")
    pub name: String,
    /// Distance from start in km
    pub km: f64,
    /// Start, aid station, landmark or finish
    pub kind: CheckpointKind,
    /// Short note shown next to the checkpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One point of the elevation profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ElevationPoint {
    /// Distance from start in km
    pub km: f64,
    /// Altitude in metres above sea level
    pub altitude_m: f64,
    /// Optional place label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Course document as read from disk, before validation.
#[derive(Debug, Deserialize)]
struct CourseFile {
    name: String,
    race_start: NaiveTime,
    #[serde(default)]
    cutoff_minutes: Option<i64>,
    segments: Vec<Segment>,
    #[serde(default)]
    checkpoints: Vec<CheckpointSpec>,
    #[serde(default)]
    elevation_profile: Vec<ElevationPoint>,
}

/// A validated race course.
///
/// Fields are private so a `Course` can only exist in its validated form.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    name: String,
    race_start: NaiveTime,
    cutoff_minutes: Option<i64>,
    segments: Vec<Segment>,
    checkpoints: Vec<CheckpointSpec>,
    elevation_profile: Vec<ElevationPoint>,
}

impl Course {
    /// Build a course, rejecting malformed segment data up front.
    pub fn new(
        name: impl Into<String>,
        race_start: NaiveTime,
        cutoff_minutes: Option<i64>,
        segments: Vec<Segment>,
        checkpoints: Vec<CheckpointSpec>,
        elevation_profile: Vec<ElevationPoint>,
    ) -> Result<Self, CourseError> {
        validate_segments(&segments)?;
        let total_km = segments.last().map(|s| s.end_km).unwrap_or(0.0);

        for cp in &checkpoints {
            if !cp.km.is_finite() || cp.km < 0.0 || cp.km > total_km + BOUNDARY_EPSILON_KM {
                return Err(CourseError::CheckpointOutOfRange {
                    name: cp.name.clone(),
                    km: cp.km,
                    total_km,
                });
            }
        }

        let mut previous_km = f64::NEG_INFINITY;
        for point in &elevation_profile {
            if !point.km.is_finite()
                || point.km < 0.0
                || point.km > total_km + BOUNDARY_EPSILON_KM
                || point.km < previous_km
            {
                return Err(CourseError::InvalidElevationPoint { km: point.km });
            }
            previous_km = point.km;
        }

        Ok(Self {
            name: name.into(),
            race_start,
            cutoff_minutes,
            segments,
            checkpoints,
            elevation_profile,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wall-clock time of day the race starts.
    pub fn race_start(&self) -> NaiveTime {
        self.race_start
    }

    /// Finish cutoff in minutes from the start, if the race has one.
    pub fn cutoff_minutes(&self) -> Option<i64> {
        self.cutoff_minutes
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn checkpoints(&self) -> &[CheckpointSpec] {
        &self.checkpoints
    }

    pub fn elevation_profile(&self) -> &[ElevationPoint] {
        &self.elevation_profile
    }

    /// Total course distance: the last segment's end.
    pub fn total_distance_km(&self) -> f64 {
        self.segments.last().map(|s| s.end_km).unwrap_or(0.0)
    }

    /// The Ultra Helike 100km (Elche), starting at 06:00 with a 24h cutoff.
    pub fn ultra_helike() -> Self {
        let segments = vec![
            segment(
                1,
                "Salida y Vinalopó",
                (0.0, 18.0),
                Terrain::Track,
                0.95,
                "+250m",
                "No te calientes. Ritmo fluido y constante.",
                "amber",
            ),
            segment(
                2,
                "Sierra y Pantano",
                (18.0, 35.0),
                Terrain::Mountain,
                1.35,
                "+600m",
                "Zona técnica. Usa bastones. Bebe isotónico.",
                "red",
            ),
            segment(
                3,
                "Bajada a Costa",
                (35.0, 60.0),
                Terrain::Sand,
                1.10,
                "-400m",
                "Paso corto en arena. Cuidado ampollas.",
                "blue",
            ),
            segment(
                4,
                "El Muro (Clot/Altet)",
                (60.0, 85.0),
                Terrain::MixedAsphalt,
                1.05,
                "+150m",
                "Juego mental. Come sólido. Corre-anda.",
                "slate",
            ),
            segment(
                5,
                "Gloria (Vuelta)",
                (85.0, 100.0),
                Terrain::Urban,
                1.0,
                "-50m",
                "Vacía el tanque. Visualiza la meta.",
                "emerald",
            ),
        ];

        let checkpoints = vec![
            checkpoint("SALIDA", 0.0, CheckpointKind::Start, Some("Frontal ON")),
            checkpoint("PANTANO", 18.0, CheckpointKind::Aid, Some("Inicio zona técnica")),
            checkpoint(
                "MARINA",
                45.0,
                CheckpointKind::Aid,
                Some("Base de vida / comida caliente"),
            ),
            checkpoint("ALTET", 65.0, CheckpointKind::Aid, None),
            checkpoint(
                "TORRELLANO",
                82.0,
                CheckpointKind::Aid,
                Some("Última carga sólida"),
            ),
            checkpoint("META", 100.0, CheckpointKind::Finish, None),
        ];

        let elevation_profile = [
            (0.0, 86.0, Some("ELCHE")),
            (10.0, 120.0, None),
            (18.0, 250.0, Some("PANTANO")),
            (25.0, 320.0, None),
            (35.0, 150.0, None),
            (45.0, 5.0, Some("LA MARINA")),
            (55.0, 10.0, None),
            (65.0, 80.0, Some("ALTET")),
            (75.0, 110.0, None),
            (85.0, 90.0, Some("PARQUE EMP.")),
            (95.0, 86.0, None),
            (100.0, 86.0, Some("META")),
        ]
        .into_iter()
        .map(|(km, altitude_m, label)| ElevationPoint {
            km,
            altitude_m,
            label: label.map(str::to_string),
        })
        .collect();

        Self {
            name: "Ultra Helike 100km".to_string(),
            race_start: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
            cutoff_minutes: Some(24 * 60),
            segments,
            checkpoints,
            elevation_profile,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn segment(
    id: u32,
    name: &str,
    (start_km, end_km): (f64, f64),
    terrain: Terrain,
    terrain_factor: f64,
    elevation: &str,
    strategy: &str,
    color: &str,
) -> Segment {
    Segment {
        id,
        name: name.to_string(),
        start_km,
        end_km,
        terrain,
        terrain_factor,
        elevation: elevation.to_string(),
        strategy: strategy.to_string(),
        color: color.to_string(),
    }
}

fn checkpoint(
    name: &str,
    km: f64,
    kind: CheckpointKind,
    description: Option<&str>,
) -> CheckpointSpec {
    CheckpointSpec {
        name: name.to_string(),
        km,
        kind,
        description: description.map(str::to_string),
    }
}

fn validate_segments(segments: &[Segment]) -> Result<(), CourseError> {
    if segments.is_empty() {
        return Err(CourseError::EmptySegments);
    }

    let mut seen_ids = HashSet::new();
    let mut previous_end: Option<f64> = None;

    for seg in segments {
        if !seen_ids.insert(seg.id) {
            return Err(CourseError::DuplicateSegmentId(seg.id));
        }
        if !seg.start_km.is_finite()
            || !seg.end_km.is_finite()
            || seg.start_km < 0.0
            || seg.start_km >= seg.end_km
        {
            return Err(CourseError::InvalidSegmentBounds {
                id: seg.id,
                start_km: seg.start_km,
                end_km: seg.end_km,
            });
        }
        if !seg.terrain_factor.is_finite() || seg.terrain_factor <= 0.0 {
            return Err(CourseError::InvalidTerrainFactor {
                id: seg.id,
                factor: seg.terrain_factor,
            });
        }
        if let Some(expected_km) = previous_end {
            if (seg.start_km - expected_km).abs() > BOUNDARY_EPSILON_KM {
                return Err(CourseError::NotContiguous {
                    id: seg.id,
                    expected_km,
                    found_km: seg.start_km,
                });
            }
        }
        previous_end = Some(seg.end_km);
    }

    Ok(())
}

/// Parse a course document from JSON and validate it.
pub fn parse_course(json: &str) -> Result<Course, CourseError> {
    let file: CourseFile = serde_json::from_str(json)?;
    Course::new(
        file.name,
        file.race_start,
        file.cutoff_minutes,
        file.segments,
        file.checkpoints,
        file.elevation_profile,
    )
}

/// Read a course JSON file from disk and validate it.
pub fn load_course_file(path: &Path) -> Result<Course, CourseError> {
    let json = std::fs::read_to_string(path)?;
    parse_course(&json)
}
