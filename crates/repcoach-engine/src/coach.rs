//! Host-facing coaching service.
//!
//! Owns the active sessions for a host that may show several exercise screens
//! over its lifetime. Each frame is evaluated synchronously by
//! [`session::advance`]; the service only adds the registry, logging, and the
//! voice hand-off.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use repcoach_core::{Error, LandmarkFrame, Result, SessionId};

use crate::catalog::Catalog;
use crate::definition::ExerciseDefinition;
use crate::session::{self, SessionState, SessionUpdate};
use crate::voice::Announcer;

struct ActiveSession {
    definition: Arc<ExerciseDefinition>,
    state: SessionState,
}

/// Session registry and engine front door
pub struct CoachService {
    catalog: Catalog,
    announcer: Arc<dyn Announcer>,
    sessions: RwLock<HashMap<SessionId, ActiveSession>>,
}

impl CoachService {
    pub fn new(catalog: Catalog, announcer: Arc<dyn Announcer>) -> Self {
        Self {
            catalog,
            announcer,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Begin a session for a cataloged exercise
    pub async fn start_session(&self, exercise: &str) -> Result<SessionId> {
        let definition = self
            .catalog
            .get(exercise)
            .ok_or_else(|| Error::UnknownExercise(exercise.to_string()))?;

        let session_id = SessionId::new();
        let active = ActiveSession {
            state: SessionState::new(definition),
            definition: Arc::new(definition.clone()),
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, active);
        tracing::info!("session {} started for '{}'", session_id, exercise);
        Ok(session_id)
    }

    /// Evaluate one detector frame; spoken cues go straight to the announcer.
    pub async fn process_frame(
        &self,
        session_id: SessionId,
        frame: &LandmarkFrame,
    ) -> Result<SessionUpdate> {
        let mut sessions = self.sessions.write().await;
        let active = sessions
            .get_mut(&session_id)
            .ok_or(Error::UnknownSession(session_id))?;

        let update = session::advance(
            &mut active.state,
            frame,
            &active.definition,
            frame.timestamp,
        );
        for cue in &update.announcements {
            self.announcer.announce(cue);
        }
        Ok(update)
    }

    /// Most recent steady-state update for a session
    pub async fn latest_update(&self, session_id: SessionId) -> Option<SessionUpdate> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .map(|active| active.state.last_update().clone())
    }

    /// Discard a session's state, returning its final update. Dropping the
    /// state is the only cancellation mechanism the engine has.
    pub async fn end_session(&self, session_id: SessionId) -> Option<SessionUpdate> {
        let mut sessions = self.sessions.write().await;
        let ended = sessions.remove(&session_id);
        if let Some(active) = &ended {
            tracing::info!(
                "session {} ended with {} reps",
                session_id,
                active.state.rep_count()
            );
        }
        ended.map(|active| active.state.last_update().clone())
    }

    pub async fn active_sessions(&self) -> Vec<SessionId> {
        let sessions = self.sessions.read().await;
        sessions.keys().copied().collect()
    }
}
