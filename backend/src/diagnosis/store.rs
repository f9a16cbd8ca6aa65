use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use shared::SessionId;

use super::session::SessionResult;

/// In-memory results keyed by session. Each session holds at most one
/// result; a new analysis replaces the previous one wholesale.
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Arc<SessionResult>>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<SessionResult>>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn replace(&self, result: SessionResult) -> Arc<SessionResult> {
        let result = Arc::new(result);
        let mut sessions = self.lock();
        sessions.insert(result.id(), Arc::clone(&result));

        while sessions.len() > self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(id, _)| **id != result.id())
                .min_by_key(|(_, session)| session.created_at())
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    log::debug!("Evicting session {}", id);
                    sessions.remove(&id);
                }
                None => break,
            }
        }
        result
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionResult>> {
        self.lock().get(id).cloned()
    }

    /// Returns whether anything was discarded.
    pub fn reset(&self, id: &SessionId) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::solid;
    use shared::Diagnosis;

    fn result(id: SessionId, label: &str) -> SessionResult {
        SessionResult::original_only(id, solid(2, 2, [1, 1, 1]), Diagnosis::new(label, 0.5))
    }

    #[test]
    fn replace_overwrites_the_previous_result() {
        let store = SessionStore::new(8);
        let id = SessionId::new();
        store.replace(result(id, "Tomato_Leaf_Mold"));
        store.replace(result(id, "Tomato_healthy"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().original().label, "Tomato_healthy");
    }

    #[test]
    fn reset_is_idempotent() {
        let store = SessionStore::new(8);
        let id = SessionId::new();
        store.replace(result(id, "Tomato_healthy"));

        assert!(store.reset(&id));
        assert!(!store.reset(&id));
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn oldest_session_is_evicted_past_the_limit() {
        let store = SessionStore::new(2);
        let first = SessionId::new();
        let second = SessionId::new();
        let third = SessionId::new();
        store.replace(result(first, "a"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.replace(result(second, "b"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.replace(result(third, "c"));

        assert_eq!(store.len(), 2);
        assert!(store.get(&first).is_none());
        assert!(store.get(&second).is_some());
        assert!(store.get(&third).is_some());
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new(8);
        let a = SessionId::new();
        let b = SessionId::new();
        store.replace(result(a, "Tomato_Bacterial_spot"));
        store.replace(result(b, "Potato___healthy"));
        store.reset(&a);

        assert_eq!(store.get(&b).unwrap().original().label, "Potato___healthy");
    }
}
