//! Per-day user presence sets

use std::collections::HashSet;

/// Set of users seen on a single day.
///
/// Implementations may be approximate. Event-level dedup happens before a
/// record reaches the set, so `insert` only has to answer "is this user new".
pub trait PresenceSet: Default + Send + Sync + 'static {
    /// Records `user_id`; returns `true` if it was not present yet.
    fn insert(&mut self, user_id: &str) -> bool;

    /// Number of distinct users recorded.
    fn count(&self) -> u64;
}

/// Exact presence backed by a `HashSet`.
#[derive(Debug, Default, Clone)]
pub struct ExactPresence {
    users: HashSet<String>,
}

impl PresenceSet for ExactPresence {
    fn insert(&mut self, user_id: &str) -> bool {
        self.users.insert(user_id.to_owned())
    }

    fn count(&self) -> u64 {
        self.users.len() as u64
    }
}
