use std::collections::HashMap;
use std::sync::RwLock;

use tracing::warn;

/// Session-scoped string attributes. Last write wins.
pub trait SessionStore: Send + Sync {
    fn get_attribute(&self, session_key: &str, name: &str) -> Option<String>;

    fn set_attribute(&self, session_key: &str, name: &str, value: &str);
}

/// Process-local session store keyed by `account/user`.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_attribute(&self, session_key: &str, name: &str) -> Option<String> {
        let sessions = self.sessions.read().ok()?;
        sessions.get(session_key)?.get(name).cloned()
    }

    fn set_attribute(&self, session_key: &str, name: &str, value: &str) {
        match self.sessions.write() {
            Ok(mut sessions) => {
                sessions
                    .entry(session_key.to_string())
                    .or_default()
                    .insert(name.to_string(), value.to_string());
            }
            Err(_) => warn!("Session store lock poisoned; dropping attribute '{}'", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_isolated_per_session() {
        let store = InMemorySessionStore::new();
        store.set_attribute("demo/", "date_tz", "US/Pacific");
        store.set_attribute("demo/", "date_tz", "Europe/Paris");
        store.set_attribute("other/", "date_tz", "GMT");

        assert_eq!(store.get_attribute("demo/", "date_tz").as_deref(), Some("Europe/Paris"));
        assert_eq!(store.get_attribute("other/", "date_tz").as_deref(), Some("GMT"));
        assert_eq!(store.get_attribute("demo/", "device"), None);
        assert_eq!(store.get_attribute("missing/", "date_tz"), None);
    }
}
