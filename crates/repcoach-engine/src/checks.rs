//! Auxiliary form-safety checks.
//!
//! Three recurring shapes: symmetry between a left/right feature pair,
//! deviation from a lazily calibrated baseline (shoulder-hike, pelvic-drop),
//! and an absolute range clamp on unsafe depth or lockout. Evaluation is pure
//! over the smoothed feature table; the mutable part is the per-check
//! [`CheckState`] holding the latched violation flag and captured baseline.

use crate::definition::{CheckRule, CheckSpec};
use crate::features::FeatureTable;

/// Mutable per-session state for one check
#[derive(Debug, Clone, Default)]
pub struct CheckState {
    /// Set while the rule is violated, cleared the frame it recovers
    pub violated: bool,
    /// Reference value captured once for baseline-deviation rules
    pub baseline: Option<f64>,
}

/// Result of evaluating one check on one frame
#[derive(Debug, Clone, Copy)]
pub struct CheckOutcome {
    pub violated: bool,
    /// True only on the first violated frame of a continuous interval
    pub rising: bool,
}

/// Evaluate `spec` against the frame's smoothed features, updating the
/// latched flag and (for baseline rules) capturing the reference on the first
/// eligible start-stage frame.
pub fn evaluate(
    spec: &CheckSpec,
    state: &mut CheckState,
    table: &FeatureTable,
    in_start_stage: bool,
) -> CheckOutcome {
    let violated = match &spec.rule {
        CheckRule::Symmetry {
            left,
            right,
            max_diff,
        } => (table[left.as_str()] - table[right.as_str()]).abs() > *max_diff,

        CheckRule::BaselineDeviation {
            feature,
            primary,
            resting_min,
            resting_max,
            max_deviation,
        } => {
            if state.baseline.is_none() && in_start_stage {
                let primary_value = table[primary.as_str()];
                if (*resting_min..=*resting_max).contains(&primary_value) {
                    state.baseline = Some(table[feature.as_str()]);
                }
            }
            match state.baseline {
                Some(baseline) => (table[feature.as_str()] - baseline).abs() > *max_deviation,
                // Nothing to compare against until calibration
                None => false,
            }
        }

        CheckRule::RangeClamp { feature, min, max } => {
            let value = table[feature.as_str()];
            value < *min || value > *max
        }
    };

    let rising = violated && !state.violated;
    state.violated = violated;
    CheckOutcome { violated, rising }
}
