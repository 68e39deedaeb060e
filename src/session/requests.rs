//! Pending request table.
//!
//! Maps wire request ids to in-flight commands. One-shot entries are removed
//! after their first response or error; subscriptions stay until they are
//! unsubscribed or the table is cleared on socket close.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::command::ServiceCommand;
use crate::error::{Error, Result};
use crate::protocol::RequestId;

// ============================================================================
// Types
// ============================================================================

/// Shared handle to a command stored in the table.
pub type SharedCommand = Arc<dyn ServiceCommand>;

// ============================================================================
// RequestTable
// ============================================================================

/// In-flight commands keyed by request id.
#[derive(Default)]
pub struct RequestTable {
    entries: FxHashMap<RequestId, SharedCommand>,
}

impl RequestTable {
    /// Creates an empty table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id from `counter` that is not currently in flight.
    ///
    /// The counter wraps around at `u32::MAX`.
    pub fn next_id(&self, counter: &mut RequestId) -> RequestId {
        loop {
            let id = *counter;
            *counter = counter.wrapping_add(1);
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    /// Registers `command` under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `id` is already in flight.
    pub fn register(&mut self, id: RequestId, command: SharedCommand) -> Result<()> {
        if self.entries.contains_key(&id) {
            return Err(Error::protocol(format!("request id {id} already in flight")));
        }
        self.entries.insert(id, command);
        Ok(())
    }

    /// Looks up the command registered under `id`.
    #[must_use]
    pub fn resolve(&self, id: RequestId) -> Option<SharedCommand> {
        self.entries.get(&id).cloned()
    }

    /// Removes `id` unless it belongs to a subscription.
    pub fn complete(&mut self, id: RequestId) {
        if self
            .entries
            .get(&id)
            .is_some_and(|command| !command.is_subscription())
        {
            self.entries.remove(&id);
        }
    }

    /// Removes `id` unconditionally.
    pub fn remove(&mut self, id: RequestId) -> Option<SharedCommand> {
        self.entries.remove(&id)
    }

    /// Finds the id under which `command` is registered, by identity.
    #[must_use]
    pub fn find<C: ?Sized>(&self, command: &Arc<C>) -> Option<RequestId> {
        let target = Arc::as_ptr(command);
        self.entries
            .iter()
            .find(|(_, entry)| std::ptr::addr_eq(Arc::as_ptr(entry), target))
            .map(|(id, _)| *id)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of in-flight entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is in flight.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Subscription, ignore, raw_payload};

    fn request() -> SharedCommand {
        Arc::new(Command::new("ssap://audio/volumeUp", None, raw_payload(), ignore()))
    }

    fn subscription() -> SharedCommand {
        Arc::new(Subscription::new(
            "ssap://audio/getVolume",
            None,
            raw_payload(),
            ignore(),
        ))
    }

    #[test]
    fn test_next_id_skips_in_flight() {
        let mut table = RequestTable::new();
        table.register(1, request()).expect("register");
        table.register(2, request()).expect("register");

        let mut counter = 1;
        assert_eq!(table.next_id(&mut counter), 3);
        assert_eq!(counter, 4);
    }

    #[test]
    fn test_next_id_wraps() {
        let table = RequestTable::new();
        let mut counter = RequestId::MAX;
        assert_eq!(table.next_id(&mut counter), RequestId::MAX);
        assert_eq!(table.next_id(&mut counter), 0);
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut table = RequestTable::new();
        table.register(7, request()).expect("register");
        assert!(matches!(
            table.register(7, request()),
            Err(Error::Protocol { .. })
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_complete_removes_one_shot_only() {
        let mut table = RequestTable::new();
        table.register(1, request()).expect("register");
        table.register(2, subscription()).expect("register");

        table.complete(1);
        table.complete(2);

        assert!(table.resolve(1).is_none());
        assert!(table.resolve(2).is_some());
    }

    #[test]
    fn test_find_by_identity() {
        let mut table = RequestTable::new();
        let first = subscription();
        let second = subscription();
        table.register(10, Arc::clone(&first)).expect("register");
        table.register(11, Arc::clone(&second)).expect("register");

        assert_eq!(table.find(&first), Some(10));
        assert_eq!(table.find(&second), Some(11));
        assert_eq!(table.find(&subscription()), None);
    }

    #[test]
    fn test_find_with_concrete_type() {
        let mut table = RequestTable::new();
        let concrete = Arc::new(Subscription::new(
            "ssap://audio/getMute",
            None,
            raw_payload(),
            ignore(),
        ));
        let erased: SharedCommand = concrete.clone();
        table.register(4, erased).expect("register");

        assert_eq!(table.find(&concrete), Some(4));
    }

    #[test]
    fn test_clear() {
        let mut table = RequestTable::new();
        table.register(1, request()).expect("register");
        table.register(2, subscription()).expect("register");
        table.clear();
        assert!(table.is_empty());
    }
}
