//! Declarative exercise definitions.
//!
//! An [`ExerciseDefinition`] carries everything exercise-specific: derived
//! features, the stage graph, auxiliary safety checks, debounce, and prose.
//! Definitions are plain serde documents; [`ExerciseDefinition::validate`] is
//! the load-time gate, so a malformed definition can never reach a session.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use repcoach_core::{Error, Joint, Result};

/// Named derived quantity computed from a landmark frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,

    #[serde(flatten)]
    pub kind: FeatureKind,

    /// Moving-average window, in frames. 8–10 suits isometric holds,
    /// 4–6 responsive movement detection.
    #[serde(default = "default_window")]
    pub window: usize,
}

fn default_window() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Inner angle at `vertex`, degrees in [0, 180]
    Angle { a: Joint, vertex: Joint, c: Joint },

    /// |p - q| as a ratio of the `ref_a`..`ref_b` segment length
    NormalizedDistance {
        p: Joint,
        q: Joint,
        ref_a: Joint,
        ref_b: Joint,
    },

    /// Tilt of the `p`..`q` segment away from vertical, degrees in [0, 90]
    VerticalDeviation { p: Joint, q: Joint },
}

/// Threshold comparison direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Below,
    Above,
}

impl Comparator {
    pub fn matches(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Below => value < threshold,
            Comparator::Above => value > threshold,
        }
    }
}

/// Stricter confirmation band a feature must dwell in before the edge fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmSpec {
    pub threshold: f64,
    pub hold_ms: i64,
}

/// Outgoing edge of a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub feature: String,
    pub comparator: Comparator,
    pub enter: f64,

    #[serde(default)]
    pub confirm: Option<ConfirmSpec>,

    pub to: String,
}

/// Named phase of the movement cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,

    /// Feedback shown while the stage is active
    #[serde(default)]
    pub feedback: Option<String>,

    /// Spoken once when the stage is entered
    #[serde(default)]
    pub announce: Option<String>,

    /// Evaluated in declaration order; first match wins
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Halts all stage progress while violated
    Blocking,
    /// Surfaces feedback only
    Advisory,
}

/// Auxiliary form-safety rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSpec {
    pub name: String,
    pub severity: Severity,
    pub message: String,

    #[serde(flatten)]
    pub rule: CheckRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CheckRule {
    /// |left - right| must stay within `max_diff`
    Symmetry {
        left: String,
        right: String,
        max_diff: f64,
    },

    /// `feature` must stay within `max_deviation` of a baseline captured
    /// once, lazily: the first frame the session sits in the start stage with
    /// `primary` inside `resting_min..=resting_max`.
    BaselineDeviation {
        feature: String,
        primary: String,
        resting_min: f64,
        resting_max: f64,
        max_deviation: f64,
    },

    /// `feature` must stay inside the absolute `min..=max` safe range
    RangeClamp { feature: String, min: f64, max: f64 },
}

impl CheckRule {
    pub(crate) fn features(&self) -> Vec<&str> {
        match self {
            CheckRule::Symmetry { left, right, .. } => vec![left, right],
            CheckRule::BaselineDeviation {
                feature, primary, ..
            } => vec![feature, primary],
            CheckRule::RangeClamp { feature, .. } => vec![feature],
        }
    }
}

/// What a blocking violation does to stage progress.
///
/// The source exercises disagreed on this, so it is a per-definition choice
/// rather than engine behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationPolicy {
    /// Freeze progress in place; resume from the same stage once cleared
    #[default]
    Freeze,
    /// Snap back to the start stage (no rep awarded)
    Reset,
}

/// Complete declarative description of one exercise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    pub name: String,

    pub features: Vec<FeatureSpec>,
    pub stages: Vec<StageSpec>,
    pub start_stage: String,

    #[serde(default)]
    pub checks: Vec<CheckSpec>,

    /// Minimum time between two accepted repetition increments
    #[serde(default = "default_min_rep_interval_ms")]
    pub min_rep_interval_ms: i64,

    #[serde(default)]
    pub on_violation: ViolationPolicy,

    /// Landmarks below this detector confidence count as missing
    #[serde(default = "default_min_visibility")]
    pub min_visibility: f32,

    /// Spoken when a repetition is accepted; `{count}` expands to the total
    #[serde(default)]
    pub rep_announce: Option<String>,
}

fn default_min_rep_interval_ms() -> i64 {
    1000
}

fn default_min_visibility() -> f32 {
    0.5
}

impl ExerciseDefinition {
    /// Load-time validation. Every referenced feature and stage must exist,
    /// every stage must be reachable from the start stage, and windows,
    /// holds, and debounce must be sane. A definition that fails here must
    /// never reach a session.
    pub fn validate(&self) -> Result<()> {
        let mut feature_names = HashSet::new();
        for feature in &self.features {
            if !feature_names.insert(feature.name.as_str()) {
                return Err(Error::DuplicateFeature {
                    definition: self.name.clone(),
                    name: feature.name.clone(),
                });
            }
            if feature.window == 0 || feature.window > 32 {
                return Err(Error::InvalidWindow {
                    definition: self.name.clone(),
                    feature: feature.name.clone(),
                    window: feature.window,
                });
            }
        }

        let mut stage_names = HashSet::new();
        for stage in &self.stages {
            if !stage_names.insert(stage.name.as_str()) {
                return Err(Error::DuplicateStage {
                    definition: self.name.clone(),
                    name: stage.name.clone(),
                });
            }
        }

        if !stage_names.contains(self.start_stage.as_str()) {
            return Err(Error::UnknownStartStage {
                definition: self.name.clone(),
                start: self.start_stage.clone(),
            });
        }

        for stage in &self.stages {
            for edge in &stage.transitions {
                if !feature_names.contains(edge.feature.as_str()) {
                    return Err(Error::UnknownFeature {
                        definition: self.name.clone(),
                        referenced_by: format!("stage '{}'", stage.name),
                        feature: edge.feature.clone(),
                    });
                }
                if !stage_names.contains(edge.to.as_str()) {
                    return Err(Error::DanglingEdge {
                        definition: self.name.clone(),
                        from: stage.name.clone(),
                        to: edge.to.clone(),
                    });
                }
                if let Some(confirm) = &edge.confirm {
                    if confirm.hold_ms <= 0 {
                        return Err(Error::InvalidHold {
                            definition: self.name.clone(),
                            hold_ms: confirm.hold_ms,
                        });
                    }
                    // The confirm band must be at least as strict as enter
                    let strict = match edge.comparator {
                        Comparator::Below => confirm.threshold <= edge.enter,
                        Comparator::Above => confirm.threshold >= edge.enter,
                    };
                    if !strict {
                        return Err(Error::InvalidConfirm {
                            definition: self.name.clone(),
                            from: stage.name.clone(),
                            feature: edge.feature.clone(),
                        });
                    }
                }
            }
        }

        for check in &self.checks {
            for feature in check.rule.features() {
                if !feature_names.contains(feature) {
                    return Err(Error::UnknownFeature {
                        definition: self.name.clone(),
                        referenced_by: format!("check '{}'", check.name),
                        feature: feature.to_string(),
                    });
                }
            }
        }

        if self.min_rep_interval_ms < 0 {
            return Err(Error::InvalidDebounce {
                definition: self.name.clone(),
                interval_ms: self.min_rep_interval_ms,
            });
        }

        self.check_reachability()?;
        Ok(())
    }

    fn check_reachability(&self) -> Result<()> {
        let start = self
            .stage_index(&self.start_stage)
            .expect("start stage declared");

        let mut seen = vec![false; self.stages.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;

        while let Some(idx) = queue.pop_front() {
            for edge in &self.stages[idx].transitions {
                let to = self.stage_index(&edge.to).expect("edge target declared");
                if !seen[to] {
                    seen[to] = true;
                    queue.push_back(to);
                }
            }
        }

        if let Some(unreachable) = seen.iter().position(|reached| !reached) {
            return Err(Error::UnreachableStage {
                definition: self.name.clone(),
                stage: self.stages[unreachable].name.clone(),
                start: self.start_stage.clone(),
            });
        }
        Ok(())
    }

    pub fn stage_index(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == name)
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elbow_feature(name: &str) -> FeatureSpec {
        FeatureSpec {
            name: name.to_string(),
            kind: FeatureKind::Angle {
                a: Joint::LeftShoulder,
                vertex: Joint::LeftElbow,
                c: Joint::LeftWrist,
            },
            window: 4,
        }
    }

    fn two_stage_definition() -> ExerciseDefinition {
        ExerciseDefinition {
            name: "test".to_string(),
            features: vec![elbow_feature("elbow")],
            stages: vec![
                StageSpec {
                    name: "rest".to_string(),
                    feedback: None,
                    announce: None,
                    transitions: vec![TransitionSpec {
                        feature: "elbow".to_string(),
                        comparator: Comparator::Below,
                        enter: 60.0,
                        confirm: None,
                        to: "flex".to_string(),
                    }],
                },
                StageSpec {
                    name: "flex".to_string(),
                    feedback: None,
                    announce: None,
                    transitions: vec![TransitionSpec {
                        feature: "elbow".to_string(),
                        comparator: Comparator::Above,
                        enter: 150.0,
                        confirm: None,
                        to: "rest".to_string(),
                    }],
                },
            ],
            start_stage: "rest".to_string(),
            checks: Vec::new(),
            min_rep_interval_ms: 1000,
            on_violation: ViolationPolicy::Freeze,
            min_visibility: 0.5,
            rep_announce: None,
        }
    }

    #[test]
    fn test_valid_definition_passes() {
        two_stage_definition().validate().expect("valid");
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let mut def = two_stage_definition();
        def.stages[1].transitions[0].to = "nowhere".to_string();
        assert!(matches!(
            def.validate(),
            Err(Error::DanglingEdge { to, .. }) if to == "nowhere"
        ));
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let mut def = two_stage_definition();
        def.stages[0].transitions[0].feature = "hip".to_string();
        assert!(matches!(def.validate(), Err(Error::UnknownFeature { .. })));
    }

    #[test]
    fn test_unreachable_stage_rejected() {
        let mut def = two_stage_definition();
        def.stages.push(StageSpec {
            name: "island".to_string(),
            feedback: None,
            announce: None,
            transitions: Vec::new(),
        });
        assert!(matches!(
            def.validate(),
            Err(Error::UnreachableStage { stage, .. }) if stage == "island"
        ));
    }

    #[test]
    fn test_unknown_start_stage_rejected() {
        let mut def = two_stage_definition();
        def.start_stage = "warmup".to_string();
        assert!(matches!(def.validate(), Err(Error::UnknownStartStage { .. })));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut def = two_stage_definition();
        def.features[0].window = 0;
        assert!(matches!(def.validate(), Err(Error::InvalidWindow { .. })));
    }

    #[test]
    fn test_loose_confirm_rejected() {
        let mut def = two_stage_definition();
        // Below edge with a confirm threshold above enter is looser, not stricter
        def.stages[0].transitions[0].confirm = Some(ConfirmSpec {
            threshold: 70.0,
            hold_ms: 300,
        });
        assert!(matches!(def.validate(), Err(Error::InvalidConfirm { .. })));
    }

    #[test]
    fn test_check_feature_reference_validated() {
        let mut def = two_stage_definition();
        def.checks.push(CheckSpec {
            name: "sym".to_string(),
            severity: Severity::Advisory,
            message: "keep it even".to_string(),
            rule: CheckRule::Symmetry {
                left: "elbow".to_string(),
                right: "missing".to_string(),
                max_diff: 10.0,
            },
        });
        assert!(matches!(def.validate(), Err(Error::UnknownFeature { .. })));
    }

    #[test]
    fn test_definition_serde_document() {
        let def = two_stage_definition();
        let json = serde_json::to_string(&def).expect("serialize");
        let back: ExerciseDefinition = serde_json::from_str(&json).expect("deserialize");
        back.validate().expect("round-tripped definition still valid");
        assert_eq!(back.stages.len(), def.stages.len());
    }
}
