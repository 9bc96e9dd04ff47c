use crate::domain::entry::RequestEntry;
use std::collections::HashMap;

// Authoritative per-user view of the current ticket, independent of queue
// membership. Serves the polling front-end and the engine's duplicate check.
#[derive(Debug, Default)]
pub struct StatusPool {
    entries: HashMap<String, RequestEntry>,
}

impl StatusPool {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, entry: RequestEntry) {
        self.entries.insert(entry.user_id.clone(), entry);
    }

    pub fn poll_for_match(&self, user_id: &str) -> Option<&RequestEntry> {
        self.entries.get(user_id)
    }

    pub fn get_mut(&mut self, user_id: &str) -> Option<&mut RequestEntry> {
        self.entries.get_mut(user_id)
    }

    pub fn remove(&mut self, user_id: &str) -> Option<RequestEntry> {
        self.entries.remove(user_id)
    }

    pub fn retain<P>(&mut self, keep: P)
    where
        P: Fn(&RequestEntry) -> bool,
    {
        self.entries.retain(|_, entry| keep(entry));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
