//! RegistrySnapshot - Snapshot Reader output
//!
//! The set of connections captured once per broadcast.

use std::collections::HashSet;

use crate::RecipientId;

/// Unordered, deduplicated set of recipients read from the registry.
///
/// Immutable after capture. A recipient may disconnect between capture and
/// delivery; the dispatcher handles that as a stale outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    recipients: HashSet<RecipientId>,
}

impl RegistrySnapshot {
    pub fn new(recipients: impl IntoIterator<Item = RecipientId>) -> Self {
        recipients.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.recipients.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecipientId> {
        self.recipients.iter()
    }

    /// Every recipient except `sender`
    ///
    /// The sender does not have to be part of the snapshot.
    pub fn delivery_set(&self, sender: &RecipientId) -> Vec<RecipientId> {
        self.recipients
            .iter()
            .filter(|id| *id != sender)
            .cloned()
            .collect()
    }
}

impl FromIterator<RecipientId> for RegistrySnapshot {
    fn from_iter<I: IntoIterator<Item = RecipientId>>(iter: I) -> Self {
        Self {
            recipients: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for RegistrySnapshot {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(RecipientId::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse() {
        let snapshot: RegistrySnapshot = ["a", "b", "a", "c", "b"].into_iter().collect();
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn test_delivery_set_excludes_sender() {
        let snapshot: RegistrySnapshot = ["a", "b", "c"].into_iter().collect();
        let mut set = snapshot.delivery_set(&"a".into());
        set.sort();
        assert_eq!(set, vec!["b", "c"]);
    }

    #[test]
    fn test_delivery_set_sender_not_registered() {
        let snapshot: RegistrySnapshot = ["a", "b"].into_iter().collect();
        assert_eq!(snapshot.delivery_set(&"z".into()).len(), 2);
    }

    #[test]
    fn test_only_sender_gives_empty_set() {
        let snapshot: RegistrySnapshot = ["a"].into_iter().collect();
        assert!(snapshot.delivery_set(&"a".into()).is_empty());
        assert!(RegistrySnapshot::default().delivery_set(&"a".into()).is_empty());
    }
}
