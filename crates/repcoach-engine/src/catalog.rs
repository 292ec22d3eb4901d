//! Exercise catalog: built-in definitions and file loading.
//!
//! The original coaching app shipped every exercise as its own hand-written
//! screen; here each one is an [`ExerciseDefinition`] value. A few common
//! movements are built in, the rest load from serde documents. Every
//! definition passes [`ExerciseDefinition::validate`] before it is admitted.

use std::collections::HashMap;

use repcoach_core::{Error, Joint, Result};

use crate::definition::{
    CheckRule, CheckSpec, Comparator, ConfirmSpec, ExerciseDefinition, FeatureKind, FeatureSpec,
    Severity, StageSpec, TransitionSpec, ViolationPolicy,
};

/// Named collection of validated exercise definitions
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    definitions: HashMap<String, ExerciseDefinition>,
}

/// On-disk catalog document
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CatalogDocument {
    exercises: Vec<ExerciseDefinition>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in movements
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for def in [squat(), biceps_curl(), overhead_press()] {
            catalog
                .insert(def)
                .expect("built-in definitions are valid");
        }
        catalog
    }

    /// Validate and admit a definition, replacing any same-named entry
    pub fn insert(&mut self, def: ExerciseDefinition) -> Result<()> {
        def.validate()?;
        self.definitions.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ExerciseDefinition> {
        self.definitions.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Load a catalog document (JSON/TOML/YAML by extension), layered with
    /// `REPCOACH_`-prefixed environment overrides.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("REPCOACH"))
            .build()
            .map_err(|e| Error::Catalog(e.to_string()))?;

        let document: CatalogDocument = settings
            .try_deserialize()
            .map_err(|e| Error::Catalog(e.to_string()))?;

        let mut catalog = Self::empty();
        for def in document.exercises {
            catalog.insert(def)?;
        }
        tracing::info!("loaded {} exercise definitions from {}", catalog.len(), path);
        Ok(catalog)
    }
}

fn angle(name: &str, a: Joint, vertex: Joint, c: Joint, window: usize) -> FeatureSpec {
    FeatureSpec {
        name: name.to_string(),
        kind: FeatureKind::Angle { a, vertex, c },
        window,
    }
}

fn bodyline(name: &str, p: Joint, q: Joint, window: usize) -> FeatureSpec {
    FeatureSpec {
        name: name.to_string(),
        kind: FeatureKind::VerticalDeviation { p, q },
        window,
    }
}

fn edge(feature: &str, comparator: Comparator, enter: f64, to: &str) -> TransitionSpec {
    TransitionSpec {
        feature: feature.to_string(),
        comparator,
        enter,
        confirm: None,
        to: to.to_string(),
    }
}

fn held_edge(
    feature: &str,
    comparator: Comparator,
    enter: f64,
    confirm: f64,
    hold_ms: i64,
    to: &str,
) -> TransitionSpec {
    TransitionSpec {
        confirm: Some(ConfirmSpec {
            threshold: confirm,
            hold_ms,
        }),
        ..edge(feature, comparator, enter, to)
    }
}

fn stage(name: &str, feedback: Option<&str>, transitions: Vec<TransitionSpec>) -> StageSpec {
    StageSpec {
        name: name.to_string(),
        feedback: feedback.map(str::to_string),
        announce: None,
        transitions,
    }
}

/// Bodyweight squat: depth gated by a short hold at the bottom, torso kept
/// upright, both knees tracking together.
fn squat() -> ExerciseDefinition {
    ExerciseDefinition {
        name: "squat".to_string(),
        features: vec![
            angle("left_knee", Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle, 4),
            angle("right_knee", Joint::RightHip, Joint::RightKnee, Joint::RightAnkle, 4),
            bodyline("torso_lean", Joint::LeftShoulder, Joint::LeftHip, 8),
        ],
        stages: vec![
            stage(
                "standing",
                Some("sit back and down"),
                vec![edge("left_knee", Comparator::Below, 120.0, "descent")],
            ),
            stage(
                "descent",
                Some("keep going to depth"),
                vec![held_edge(
                    "left_knee",
                    Comparator::Below,
                    95.0,
                    90.0,
                    250,
                    "bottom",
                )],
            ),
            StageSpec {
                announce: Some("drive up".to_string()),
                ..stage(
                    "bottom",
                    None,
                    vec![edge("left_knee", Comparator::Above, 160.0, "standing")],
                )
            },
        ],
        start_stage: "standing".to_string(),
        checks: vec![
            CheckSpec {
                name: "torso_upright".to_string(),
                severity: Severity::Blocking,
                message: "chest up, back straight".to_string(),
                rule: CheckRule::RangeClamp {
                    feature: "torso_lean".to_string(),
                    min: 0.0,
                    max: 50.0,
                },
            },
            CheckSpec {
                name: "knee_symmetry".to_string(),
                severity: Severity::Advisory,
                message: "bend both knees together".to_string(),
                rule: CheckRule::Symmetry {
                    left: "left_knee".to_string(),
                    right: "right_knee".to_string(),
                    max_diff: 18.0,
                },
            },
        ],
        min_rep_interval_ms: 1500,
        on_violation: ViolationPolicy::Freeze,
        min_visibility: 0.5,
        rep_announce: Some("{count}".to_string()),
    }
}

/// Left-arm biceps curl: elbow flexion with the upper arm pinned and the
/// shoulder kept away from the ear.
fn biceps_curl() -> ExerciseDefinition {
    ExerciseDefinition {
        name: "biceps_curl".to_string(),
        features: vec![
            angle("elbow", Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist, 4),
            bodyline("upper_arm_sway", Joint::LeftShoulder, Joint::LeftElbow, 6),
            FeatureSpec {
                name: "shoulder_to_ear".to_string(),
                kind: FeatureKind::NormalizedDistance {
                    p: Joint::LeftEar,
                    q: Joint::LeftShoulder,
                    ref_a: Joint::LeftShoulder,
                    ref_b: Joint::LeftHip,
                },
                window: 8,
            },
        ],
        stages: vec![
            stage(
                "extended",
                Some("curl up"),
                vec![held_edge("elbow", Comparator::Below, 70.0, 60.0, 200, "curled")],
            ),
            StageSpec {
                announce: Some("squeeze".to_string()),
                ..stage(
                    "curled",
                    Some("lower under control"),
                    vec![edge("elbow", Comparator::Above, 150.0, "extended")],
                )
            },
        ],
        start_stage: "extended".to_string(),
        checks: vec![
            CheckSpec {
                name: "shoulder_hike".to_string(),
                severity: Severity::Blocking,
                message: "relax your shoulder".to_string(),
                rule: CheckRule::BaselineDeviation {
                    feature: "shoulder_to_ear".to_string(),
                    primary: "elbow".to_string(),
                    resting_min: 140.0,
                    resting_max: 180.0,
                    max_deviation: 0.08,
                },
            },
            CheckSpec {
                name: "arm_sway".to_string(),
                severity: Severity::Advisory,
                message: "keep your elbow pinned to your side".to_string(),
                rule: CheckRule::RangeClamp {
                    feature: "upper_arm_sway".to_string(),
                    min: 0.0,
                    max: 25.0,
                },
            },
        ],
        min_rep_interval_ms: 1200,
        on_violation: ViolationPolicy::Freeze,
        min_visibility: 0.5,
        rep_announce: Some("{count}".to_string()),
    }
}

/// Overhead press: drive to a held lockout, guarding against a hard elbow
/// snap. A violation resets the attempt rather than freezing it.
fn overhead_press() -> ExerciseDefinition {
    ExerciseDefinition {
        name: "overhead_press".to_string(),
        features: vec![
            angle("elbow", Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist, 5),
            bodyline("forearm_tilt", Joint::LeftElbow, Joint::LeftWrist, 6),
        ],
        stages: vec![
            stage(
                "rack",
                Some("press overhead"),
                vec![held_edge("elbow", Comparator::Above, 165.0, 170.0, 250, "lockout")],
            ),
            StageSpec {
                announce: Some("lockout".to_string()),
                ..stage(
                    "lockout",
                    Some("lower to your shoulders"),
                    vec![edge("elbow", Comparator::Below, 100.0, "rack")],
                )
            },
        ],
        start_stage: "rack".to_string(),
        checks: vec![
            CheckSpec {
                name: "elbow_snap".to_string(),
                severity: Severity::Blocking,
                message: "don't slam the lockout".to_string(),
                rule: CheckRule::RangeClamp {
                    feature: "elbow".to_string(),
                    min: 0.0,
                    max: 178.0,
                },
            },
            CheckSpec {
                name: "wrist_stack".to_string(),
                severity: Severity::Advisory,
                message: "stack your wrist over your elbow".to_string(),
                rule: CheckRule::RangeClamp {
                    feature: "forearm_tilt".to_string(),
                    min: 0.0,
                    max: 30.0,
                },
            },
        ],
        min_rep_interval_ms: 1500,
        on_violation: ViolationPolicy::Reset,
        min_visibility: 0.5,
        rep_announce: Some("{count}".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_presets_validate() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 3);
        for name in ["squat", "biceps_curl", "overhead_press"] {
            let def = catalog.get(name).expect("preset present");
            def.validate().expect("preset valid");
        }
        assert!(catalog.get("deadlift").is_none());
    }

    #[test]
    fn test_insert_rejects_invalid_definition() {
        let mut bad = squat();
        bad.start_stage = "nowhere".to_string();

        let mut catalog = Catalog::empty();
        assert!(catalog.insert(bad).is_err());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_catalog_document_parses() {
        let def = biceps_curl();
        let json = serde_json::to_string(&CatalogDocument {
            exercises: vec![def],
        })
        .expect("serialize document");

        let document: CatalogDocument = serde_json::from_str(&json).expect("parse document");
        let mut catalog = Catalog::empty();
        for def in document.exercises {
            catalog.insert(def).expect("document definitions valid");
        }
        assert!(catalog.get("biceps_curl").is_some());
    }
}
