//! RecipientId - connection identifier shared by registry, transport and dispatcher
//!
//! Backed by `Arc<str>`: one snapshot read allocates each id once, and every
//! delivery attempt, outcome and cleanup request clones it for free.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Opaque identifier of one registered connection.
///
/// # Examples
/// ```
/// use contracts::RecipientId;
///
/// let id: RecipientId = "L2pDbcHgoAMCKvQ=".into();
/// assert_eq!(id, "L2pDbcHgoAMCKvQ=");
/// assert!(!id.is_blank());
/// ```
#[derive(Clone)]
pub struct RecipientId(Arc<str>);

impl RecipientId {
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for empty or whitespace-only ids, which no registry should hand out
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Deref for RecipientId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RecipientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets HashSet<RecipientId> be looked up by &str
impl Borrow<str> for RecipientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecipientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecipientId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<&RecipientId> for RecipientId {
    fn from(id: &RecipientId) -> Self {
        id.clone()
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecipientId({:?})", self.0)
    }
}

impl PartialEq for RecipientId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for RecipientId {}

impl PartialEq<str> for RecipientId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for RecipientId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl PartialEq<String> for RecipientId {
    fn eq(&self, other: &String) -> bool {
        &*self.0 == other.as_str()
    }
}

impl PartialOrd for RecipientId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecipientId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

// Must hash exactly like str for the Borrow<str> lookups above
impl Hash for RecipientId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for RecipientId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecipientId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_clone_shares_allocation() {
        let a: RecipientId = "conn-1".into();
        let b = a.clone();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }

    #[test]
    fn test_set_lookup_by_str() {
        let ids: HashSet<RecipientId> = ["conn-1", "conn-2", "conn-1"]
            .into_iter()
            .map(RecipientId::from)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("conn-2"));
        assert!(!ids.contains("conn-3"));
    }

    #[test]
    fn test_blank_ids() {
        assert!(RecipientId::from("").is_blank());
        assert!(RecipientId::from("  ").is_blank());
        assert!(!RecipientId::from("x").is_blank());
    }

    #[test]
    fn test_ordering_follows_str() {
        let mut ids: Vec<RecipientId> = vec!["c".into(), "a".into(), "b".into()];
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id: RecipientId = "conn-1".into();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"conn-1\"");
        let back: RecipientId = serde_json::from_str("\"conn-1\"").unwrap();
        assert_eq!(back, id);
    }
}
