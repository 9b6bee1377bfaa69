//! The roster of registered sessions.

use super::session::{PlayerData, Session};
use crate::error::ProtocolError;

/// Sessions in join order. Names are unique at all times.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: Vec<Session>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session, refusing empty or already taken names.
    ///
    /// On refusal the session is handed back so the caller can close it.
    pub fn insert(&mut self, session: Session) -> Result<(), (Session, ProtocolError)> {
        if session.name().trim().is_empty() {
            return Err((session, ProtocolError::EmptyName));
        }
        if self.contains(session.name()) {
            let name = session.name().to_string();
            return Err((session, ProtocolError::DuplicateName(name)));
        }
        self.sessions.push(session);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Session> {
        let pos = self.sessions.iter().position(|s| s.name() == name)?;
        Some(self.sessions.remove(pos))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sessions.iter().any(|s| s.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.name() == name)
    }

    pub fn player(&self, name: &str) -> Option<&PlayerData> {
        self.get(name).map(|s| &s.data)
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut PlayerData> {
        self.get_mut(name).map(|s| &mut s.data)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerData> {
        self.sessions.iter().map(|s| &s.data)
    }

    pub fn sessions_mut(&mut self) -> &mut [Session] {
        &mut self.sessions
    }

    pub fn names(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(name: &str) -> Session {
        Session::new(name, Box::new(tokio::io::sink()))
    }

    #[test]
    fn test_names_are_unique() {
        let mut registry = Registry::new();
        assert!(registry.insert(session("alice")).is_ok());
        let (refused, err) = registry.insert(session("alice")).unwrap_err();
        assert_eq!(refused.name(), "alice");
        assert!(matches!(err, ProtocolError::DuplicateName(name) if name == "alice"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_names_are_refused() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.insert(session("  ")),
            Err((_, ProtocolError::EmptyName))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_join_order_is_kept_across_removal() {
        let mut registry = Registry::new();
        for name in ["a", "b", "c"] {
            registry.insert(session(name)).unwrap();
        }
        assert!(registry.remove("b").is_some());
        assert!(registry.remove("b").is_none());
        assert_eq!(registry.names(), vec!["a".to_string(), "c".to_string()]);
    }
}
