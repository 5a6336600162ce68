// src/session.rs
//! Per-session UI state: current prompt, current library page, last successful
//! generation and the in-flight flag that blocks re-entrant submissions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{VeoError, VeoResult};
use crate::models::{AspectRatio, GenerationRequest, VideoRef, DEFAULT_PROMPT};

pub type SessionId = String;

/// A clip generated for this session, with the settings that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub video: VideoRef,
    pub prompt: String,
    pub duration_seconds: u8,
    pub aspect_ratio: AspectRatio,
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn new(request: &GenerationRequest, video: VideoRef) -> Self {
        Self {
            video,
            prompt: request.prompt().to_string(),
            duration_seconds: request.duration_seconds(),
            aspect_ratio: request.aspect_ratio(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub prompt: String,
    pub page: usize,
    pub last_result: Option<GenerationResult>,
    pub in_flight: bool,
    pub last_seen: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            page: 1,
            last_result: None,
            in_flight: false,
            last_seen: Utc::now(),
        }
    }
}

/// All live sessions. Locks are never held across an `.await`.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, SessionState>> {
        self.sessions.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, SessionState>> {
        self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut sessions = self.write();
        let state = sessions.entry(session_id.to_string()).or_default();
        state.last_seen = Utc::now();
        f(state)
    }

    /// Current state of a session; unknown sessions report defaults.
    pub fn snapshot(&self, session_id: &str) -> SessionState {
        self.read().get(session_id).cloned().unwrap_or_default()
    }

    pub fn set_prompt(&self, session_id: &str, prompt: &str) {
        self.update(session_id, |state| state.prompt = prompt.to_string());
    }

    pub fn set_page(&self, session_id: &str, page: usize) {
        self.update(session_id, |state| state.page = page.max(1));
    }

    /// Marks a generation as in flight. The flag is cleared when the guard drops.
    pub fn begin_generation(&self, session_id: &str, request: &GenerationRequest) -> VeoResult<InFlightGuard<'_>> {
        self.update(session_id, |state| {
            if state.in_flight {
                return Err(VeoError::GenerationInFlight(session_id.to_string()));
            }
            state.in_flight = true;
            state.prompt = request.prompt().to_string();
            Ok(())
        })?;

        tracing::info!("🎬 Generation started for session {}", session_id);
        Ok(InFlightGuard {
            store: self,
            session_id: session_id.to_string(),
        })
    }

    pub fn record_result(&self, session_id: &str, result: GenerationResult) {
        self.update(session_id, |state| state.last_result = Some(result));
    }

    /// Forgets sessions idle for longer than `max_age` that have nothing in flight.
    pub fn cleanup_idle(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, state| state.in_flight || state.last_seen >= cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!("🗑️ Cleaned up {} idle sessions", removed);
        }
        removed
    }
}

/// Holds a session's in-flight flag for the lifetime of one generation.
pub struct InFlightGuard<'a> {
    store: &'a SessionStore,
    session_id: SessionId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.store.update(&self.session_id, |state| state.in_flight = false);
        tracing::debug!("Generation finished for session {}", self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(prompt, 5, AspectRatio::Landscape).unwrap()
    }

    #[test]
    fn test_unknown_session_has_defaults() {
        let store = SessionStore::new();
        let state = store.snapshot("nobody");
        assert_eq!(state.prompt, DEFAULT_PROMPT);
        assert_eq!(state.page, 1);
        assert!(!state.in_flight);
        assert!(state.last_result.is_none());
    }

    #[test]
    fn test_second_submission_is_rejected_while_in_flight() {
        let store = SessionStore::new();
        let guard = store.begin_generation("s", &request("cat")).unwrap();
        assert!(store.snapshot("s").in_flight);
        assert_eq!(store.snapshot("s").prompt, "cat");

        let err = store.begin_generation("s", &request("dog")).err().unwrap();
        assert!(matches!(err, VeoError::GenerationInFlight(_)));
        assert!(store.begin_generation("other", &request("dog")).is_ok());

        drop(guard);
        assert!(!store.snapshot("s").in_flight);
        assert!(store.begin_generation("s", &request("dog")).is_ok());
    }

    #[test]
    fn test_flag_clears_after_failure_path() {
        let store = SessionStore::new();
        let outcome: VeoResult<()> = (|| {
            let _guard = store.begin_generation("s", &request("cat"))?;
            Err(VeoError::Timeout { attempts: 40 })
        })();
        assert!(outcome.is_err());
        assert!(!store.snapshot("s").in_flight);
    }

    #[test]
    fn test_record_result_and_page() {
        let store = SessionStore::new();
        let req = request("cat");
        store.record_result("s", GenerationResult::new(&req, VideoRef::new("gs://b/v.mp4")));
        store.set_page("s", 0);

        let state = store.snapshot("s");
        assert_eq!(state.page, 1);
        let result = state.last_result.unwrap();
        assert_eq!(result.video.uri, "gs://b/v.mp4");
        assert_eq!(result.duration_seconds, 5);
    }

    #[test]
    fn test_cleanup_keeps_in_flight_sessions() {
        let store = SessionStore::new();
        store.set_prompt("idle", "x");
        let _guard = store.begin_generation("busy", &request("cat")).unwrap();

        let removed = store.cleanup_idle(chrono::Duration::seconds(-1));
        assert_eq!(removed, 1);
        assert!(store.read().contains_key("busy"));
        assert!(!store.read().contains_key("idle"));
    }
}
