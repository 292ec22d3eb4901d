//! Per-frame feature extraction and smoothing.

use std::collections::HashMap;

use repcoach_core::{geometry, LandmarkFrame};

use crate::definition::{ExerciseDefinition, FeatureKind, FeatureSpec};
use crate::smoother::SmoothedFeature;

/// Smoothed feature values for one frame, keyed by feature name
pub type FeatureTable = HashMap<String, f64>;

/// Per-session smoother bank, one [`SmoothedFeature`] per spec
#[derive(Debug, Clone)]
pub struct FeatureBank {
    smoothers: HashMap<String, SmoothedFeature>,
}

impl FeatureBank {
    pub fn for_definition(def: &ExerciseDefinition) -> Self {
        let smoothers = def
            .features
            .iter()
            .map(|spec| (spec.name.clone(), SmoothedFeature::new(spec.window)))
            .collect();
        Self { smoothers }
    }

    /// Compute every feature's raw value, feed the smoothers, and return the
    /// smoothed table.
    ///
    /// Returns `None` (a frame skip) when any required joint is missing,
    /// below the visibility floor, or geometrically degenerate. Skipped
    /// frames leave the smoothers untouched, so the next tick simply
    /// supersedes them.
    pub fn ingest(
        &mut self,
        def: &ExerciseDefinition,
        frame: &LandmarkFrame,
    ) -> Option<FeatureTable> {
        let mut raws = Vec::with_capacity(def.features.len());
        for spec in &def.features {
            let raw = raw_value(spec, frame, def.min_visibility)?;
            if raw.is_nan() {
                return None;
            }
            raws.push((spec.name.as_str(), raw));
        }

        let mut table = FeatureTable::with_capacity(raws.len());
        for (name, raw) in raws {
            let smoother = self
                .smoothers
                .get_mut(name)
                .expect("bank built from the same definition");
            table.insert(name.to_string(), smoother.push(raw));
        }
        Some(table)
    }
}

fn raw_value(spec: &FeatureSpec, frame: &LandmarkFrame, min_visibility: f32) -> Option<f64> {
    let point = |joint| {
        frame
            .visible(joint, min_visibility)
            .map(|landmark| landmark.point2())
    };

    let value = match spec.kind {
        FeatureKind::Angle { a, vertex, c } => {
            geometry::angle_between(point(a)?, point(vertex)?, point(c)?)
        }
        FeatureKind::NormalizedDistance { p, q, ref_a, ref_b } => {
            geometry::normalized_distance(point(p)?, point(q)?, point(ref_a)?, point(ref_b)?)
        }
        FeatureKind::VerticalDeviation { p, q } => {
            geometry::vertical_deviation(point(p)?, point(q)?)
        }
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repcoach_core::{Joint, Landmark, Timestamp};

    fn angle_only_definition(window: usize) -> ExerciseDefinition {
        let json = serde_json::json!({
            "name": "bank-test",
            "features": [{
                "name": "elbow",
                "kind": "angle",
                "a": "LeftShoulder",
                "vertex": "LeftElbow",
                "c": "LeftWrist",
                "window": window,
            }],
            "stages": [{ "name": "rest" }],
            "start_stage": "rest",
        });
        serde_json::from_value(json).expect("definition document")
    }

    fn right_angle_frame(t: i64) -> LandmarkFrame {
        let mut frame = LandmarkFrame::new(Timestamp::from_millis(t));
        frame.set(Joint::LeftShoulder, Landmark::new(0.0, 1.0));
        frame.set(Joint::LeftElbow, Landmark::new(0.0, 0.0));
        frame.set(Joint::LeftWrist, Landmark::new(1.0, 0.0));
        frame
    }

    #[test]
    fn test_ingest_computes_smoothed_angle() {
        let def = angle_only_definition(1);
        let mut bank = FeatureBank::for_definition(&def);

        let table = bank.ingest(&def, &right_angle_frame(0)).expect("complete frame");
        assert!((table["elbow"] - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_joint_skips_frame_without_touching_smoothers() {
        let def = angle_only_definition(2);
        let mut bank = FeatureBank::for_definition(&def);

        bank.ingest(&def, &right_angle_frame(0)).expect("complete frame");

        // Wrist dropped by the detector
        let mut incomplete = LandmarkFrame::new(Timestamp::from_millis(33));
        incomplete.set(Joint::LeftShoulder, Landmark::new(0.0, 1.0));
        incomplete.set(Joint::LeftElbow, Landmark::new(0.0, 0.0));
        assert!(bank.ingest(&def, &incomplete).is_none());

        // One sample in the window, not two
        assert_eq!(bank.smoothers["elbow"].len(), 1);
    }

    #[test]
    fn test_low_visibility_counts_as_missing() {
        let def = angle_only_definition(1);
        let mut bank = FeatureBank::for_definition(&def);

        let mut frame = right_angle_frame(0);
        frame.set(Joint::LeftWrist, Landmark::with_visibility(1.0, 0.0, 0.1));
        assert!(bank.ingest(&def, &frame).is_none());
    }

    #[test]
    fn test_degenerate_geometry_skips_frame() {
        let def = angle_only_definition(1);
        let mut bank = FeatureBank::for_definition(&def);

        let mut frame = right_angle_frame(0);
        // Wrist collapses onto the elbow: NaN angle, treated as a sensing gap
        frame.set(Joint::LeftWrist, Landmark::new(0.0, 0.0));
        assert!(bank.ingest(&def, &frame).is_none());
    }
}
