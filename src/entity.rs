//! Identity model shared by the registry and the dispatch queue. The queue
//! never stores entities, only the [`EntityId`] handles the registry hands out,
//! so edits made through the registry stay visible to every pending entry.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Scheduling weight carried by every queue entry. Composite priorities such
/// as a date plus a time of day are folded into a single integer.
pub type Priority = i64;

/// Stable handle to an entity owned by a [`crate::Registry`].
///
/// The generation guards against slot reuse: a handle kept around after its
/// entity was deleted resolves to nothing instead of to whatever entity took
/// the slot afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Which end of the priority range the queue serves first. Chosen once when a
/// queue is built and never toggled afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Lowest priority value first (earliest departure slot).
    #[default]
    Min,
    /// Highest priority value first (longest route, fullest battery).
    Max,
}

impl Order {
    /// True when `a` must be served strictly before `b`.
    pub fn prefers(self, a: Priority, b: Priority) -> bool {
        match self {
            Order::Min => a < b,
            Order::Max => a > b,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Order::Min => "min",
            Order::Max => "max",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Order {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(Order::Min),
            "max" => Ok(Order::Max),
            _ => Err(ConfigError::InvalidValue {
                name: "order",
                value: raw.to_string(),
                expected: "min or max",
            }),
        }
    }
}

/// A record the registry can own and the queue can schedule.
pub trait Entity {
    /// Primary key. Uniqueness is enforced by the registry; composite keys
    /// compare field by field in declaration order.
    type Key: Ord + Clone + fmt::Debug + fmt::Display;

    /// Singular label used in log lines and the UI ("train", "flight", ...).
    const KIND: &'static str;

    fn key(&self) -> &Self::Key;

    /// Write access to the key. The registry uses it to restore a key that an
    /// edit tried to move onto one already taken.
    fn key_mut(&mut self) -> &mut Self::Key;

    /// Priority used when the entity is scheduled without an explicit one.
    fn priority(&self) -> Priority;

    /// Ordering policy this kind of entity is normally dispatched with.
    fn default_order() -> Order {
        Order::Min
    }

    /// Descriptive payload as `(label, value)` pairs, in display order.
    fn fields(&self) -> Vec<(&'static str, String)>;

    /// Case-insensitive substring match against the key and every field.
    fn matches_text(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.key().to_string().to_lowercase().contains(&needle)
            || self
                .fields()
                .iter()
                .any(|(_, value)| value.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_prefers_is_strict() {
        assert!(Order::Min.prefers(1, 2));
        assert!(!Order::Min.prefers(2, 2));
        assert!(Order::Max.prefers(3, 2));
        assert!(!Order::Max.prefers(2, 2));
    }

    #[test]
    fn test_order_parses_case_insensitively() {
        assert_eq!("MAX".parse::<Order>().unwrap(), Order::Max);
        assert_eq!(" min ".parse::<Order>().unwrap(), Order::Min);
        assert!("lowest".parse::<Order>().is_err());
    }
}
