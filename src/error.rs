//! Error types for the registry, the dispatch queue and the configuration
//! layer. Every failure the core can produce is an explicit value; an empty
//! queue is not one of them and shows up as `None` instead.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::entity::EntityId;

/// Returned by [`crate::Registry::insert`] when the key is already taken. The
/// rejected entity travels back to the caller untouched.
#[derive(Debug, Error)]
#[error("an entity with key `{key}` is already registered")]
pub struct DuplicateKey<E> {
    key: String,
    entity: E,
}

impl<E> DuplicateKey<E> {
    pub(crate) fn new(key: String, entity: E) -> Self {
        Self { key, entity }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    /// Take back ownership of the entity that was not inserted.
    pub fn into_inner(self) -> E {
        self.entity
    }
}

/// Reasons a registry deletion is refused. The registry is unchanged in both
/// cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteError {
    #[error("no entity registered under `{key}`")]
    NotFound { key: String },

    #[error("cannot delete `{key}` while it is scheduled for dispatch ({pending} pending)")]
    StillScheduled {
        key: String,
        id: EntityId,
        pending: usize,
    },
}

/// Reasons an in-place edit is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error("no entity registered under `{key}`")]
    NotFound { key: String },

    #[error("entity handle {id} is stale")]
    Stale { id: EntityId },

    /// The edit moved the key onto one already registered. The old key is
    /// back in place; every other field keeps the edit.
    #[error("cannot re-key `{from}` to `{to}`: that key is already registered")]
    KeyTaken { from: String, to: String },
}

/// Fatal queue failures. Running out of entries is not one of them.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("could not allocate room for {capacity} dispatch entries")]
    AllocationFailure {
        capacity: usize,
        #[source]
        source: TryReserveError,
    },
}

/// Failures when scheduling through a [`crate::Dispatcher`].
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("cannot schedule `{key}`: it is not registered")]
    NotFound { key: String },

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Invalid configuration values read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {name} `{value}`: expected {expected}")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("could not locate home directory")]
    NoHomeDirectory,
}
