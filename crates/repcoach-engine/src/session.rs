//! Per-frame session evaluation.
//!
//! [`SessionState`] is an explicit value with a single writer: the host calls
//! [`advance`] once per detector tick, synchronously to completion. Ending a
//! session is discarding the state; there is no other cancellation.

use serde::{Deserialize, Serialize};

use repcoach_core::{LandmarkFrame, Timestamp};

use crate::checks::{self, CheckState};
use crate::definition::{ExerciseDefinition, Severity, ViolationPolicy};
use crate::features::FeatureBank;

/// Engine output for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub stage: String,
    pub rep_count: u32,
    /// 1 on the frame a repetition is accepted, else 0
    pub rep_increment: u32,
    /// Names of the checks violated on this frame
    pub active_warnings: Vec<String>,
    pub feedback_text: Option<String>,
    /// Spoken cues: rising-edge warnings, rep cues, stage announcements
    pub announcements: Vec<String>,
}

/// Dwell clock for an edge serving its confirm hold
#[derive(Debug, Clone, Copy)]
struct HoldClock {
    edge: usize,
    started_at: Timestamp,
}

/// Mutable state of one running exercise session
#[derive(Debug, Clone)]
pub struct SessionState {
    stage: usize,
    start_stage: usize,
    rep_count: u32,
    hold: Option<HoldClock>,
    last_rep_at: Option<Timestamp>,
    bank: FeatureBank,
    checks: Vec<CheckState>,
    /// Steady-state view returned verbatim on skipped frames
    last_update: SessionUpdate,
}

impl SessionState {
    /// Requires a definition that already passed
    /// [`ExerciseDefinition::validate`]; sessions never start on a malformed
    /// one.
    pub fn new(def: &ExerciseDefinition) -> Self {
        let start = def
            .stage_index(&def.start_stage)
            .expect("definition validated before session start");

        let last_update = SessionUpdate {
            stage: def.start_stage.clone(),
            rep_count: 0,
            rep_increment: 0,
            active_warnings: Vec::new(),
            feedback_text: def.stages[start].feedback.clone(),
            announcements: Vec::new(),
        };

        Self {
            stage: start,
            start_stage: start,
            rep_count: 0,
            hold: None,
            last_rep_at: None,
            bank: FeatureBank::for_definition(def),
            checks: vec![CheckState::default(); def.checks.len()],
            last_update,
        }
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn last_update(&self) -> &SessionUpdate {
        &self.last_update
    }

    fn finish(
        &mut self,
        def: &ExerciseDefinition,
        rep_increment: u32,
        active_warnings: Vec<String>,
        feedback_text: Option<String>,
        announcements: Vec<String>,
    ) -> SessionUpdate {
        let update = SessionUpdate {
            stage: def.stages[self.stage].name.clone(),
            rep_count: self.rep_count,
            rep_increment,
            active_warnings,
            feedback_text,
            announcements,
        };

        // Cache with the edge-triggered fields quiesced: a skipped frame must
        // not replay an increment or an announcement.
        self.last_update = SessionUpdate {
            rep_increment: 0,
            announcements: Vec::new(),
            ..update.clone()
        };
        update
    }
}

/// Evaluate one landmark frame against the exercise definition.
///
/// Frames with missing, low-confidence, or geometrically degenerate joints
/// are skipped silently: the previous update is returned and the next tick
/// supersedes the gap.
pub fn advance(
    state: &mut SessionState,
    frame: &LandmarkFrame,
    def: &ExerciseDefinition,
    now: Timestamp,
) -> SessionUpdate {
    let Some(table) = state.bank.ingest(def, frame) else {
        return state.last_update.clone();
    };

    // Every check runs every frame so flags latch and clear; the first
    // blocking violation then freezes (or resets) stage progress.
    let mut warnings = Vec::new();
    let mut announcements = Vec::new();
    let mut blocking_message: Option<&String> = None;
    let mut advisory_message: Option<&String> = None;

    let in_start = state.stage == state.start_stage;
    for (spec, check_state) in def.checks.iter().zip(state.checks.iter_mut()) {
        let outcome = checks::evaluate(spec, check_state, &table, in_start);
        if !outcome.violated {
            continue;
        }
        warnings.push(spec.name.clone());
        if outcome.rising {
            announcements.push(spec.message.clone());
            if spec.severity == Severity::Blocking {
                tracing::warn!("{}: blocking violation '{}'", def.name, spec.name);
            }
        }
        match spec.severity {
            Severity::Blocking => blocking_message = blocking_message.or(Some(&spec.message)),
            Severity::Advisory => advisory_message = advisory_message.or(Some(&spec.message)),
        }
    }

    if let Some(message) = blocking_message {
        state.hold = None;
        if def.on_violation == ViolationPolicy::Reset && state.stage != state.start_stage {
            tracing::debug!(
                "{}: snapped back to '{}' on violation",
                def.name,
                def.start_stage
            );
            state.stage = state.start_stage;
        }
        let message = message.clone();
        return state.finish(def, 0, warnings, Some(message), announcements);
    }

    // Edges in declaration order; the first whose enter threshold matches is
    // the candidate, whether it fires now or is still serving its hold.
    let stage = &def.stages[state.stage];
    let candidate = stage
        .transitions
        .iter()
        .enumerate()
        .find(|(_, edge)| edge.comparator.matches(table[edge.feature.as_str()], edge.enter));

    let mut fired = None;
    match candidate {
        None => state.hold = None,
        Some((idx, edge)) => {
            // A different edge's partial hold never carries over
            if state.hold.is_some_and(|hold| hold.edge != idx) {
                state.hold = None;
            }
            match &edge.confirm {
                None => fired = Some(idx),
                Some(confirm) => {
                    if edge
                        .comparator
                        .matches(table[edge.feature.as_str()], confirm.threshold)
                    {
                        let started = state
                            .hold
                            .get_or_insert(HoldClock {
                                edge: idx,
                                started_at: now,
                            })
                            .started_at;
                        if now.millis_since(started) >= confirm.hold_ms {
                            fired = Some(idx);
                        }
                    } else {
                        // Left the confirm band: no partial credit
                        state.hold = None;
                    }
                }
            }
        }
    }

    let mut rep_increment = 0;
    if let Some(idx) = fired {
        state.hold = None;
        let edge = &stage.transitions[idx];
        let next = def.stage_index(&edge.to).expect("edge target validated");
        tracing::debug!("{}: {} -> {}", def.name, stage.name, edge.to);

        // A full cycle is a return to the start stage from elsewhere; the
        // session's creation there does not count, and neither does a
        // self-loop.
        if next == state.start_stage && state.stage != state.start_stage {
            let debounced = state
                .last_rep_at
                .is_some_and(|at| now.millis_since(at) < def.min_rep_interval_ms);
            if !debounced {
                state.rep_count += 1;
                rep_increment = 1;
                state.last_rep_at = Some(now);
                tracing::debug!("{}: rep {}", def.name, state.rep_count);
                if let Some(template) = &def.rep_announce {
                    announcements.push(template.replace("{count}", &state.rep_count.to_string()));
                }
            }
        }

        state.stage = next;
        if let Some(cue) = &def.stages[next].announce {
            announcements.push(cue.clone());
        }
    }

    let feedback = advisory_message
        .cloned()
        .or_else(|| def.stages[state.stage].feedback.clone());
    state.finish(def, rep_increment, warnings, feedback, announcements)
}
