//! The dispatch desk: one registry and the queue that schedules work against
//! it. Callers speak in keys; the desk turns them into handles, keeps the
//! queue pointing at live entities, and refuses to retire anything still
//! waiting for dispatch.

use std::borrow::Borrow;
use std::fmt;

use tracing::{debug, info, warn};

use crate::dispatch::{DispatchQueue, Entry, SortedDrain};
use crate::entity::{Entity, EntityId, Order, Priority};
use crate::error::{DeleteError, DuplicateKey, QueueError, ScheduleError, UpdateError};
use crate::registry::Registry;

/// A queue entry resolved against the registry.
#[derive(Debug)]
pub struct Scheduled<'a, E> {
    pub id: EntityId,
    pub priority: Priority,
    pub entity: &'a E,
}

pub struct Dispatcher<E: Entity> {
    registry: Registry<E>,
    queue: DispatchQueue,
}

impl<E: Entity> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new(E::default_order())
    }
}

impl<E: Entity> Dispatcher<E> {
    pub fn new(order: Order) -> Self {
        Self {
            registry: Registry::new(),
            queue: DispatchQueue::new(order),
        }
    }

    /// Desk whose queue has room for `capacity` entries before it first grows.
    pub fn with_capacity(order: Order, capacity: usize) -> Result<Self, QueueError> {
        Ok(Self {
            registry: Registry::new(),
            queue: DispatchQueue::with_capacity(order, capacity)?,
        })
    }

    pub fn registry(&self) -> &Registry<E> {
        &self.registry
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    pub fn register(&mut self, entity: E) -> Result<EntityId, DuplicateKey<E>> {
        self.registry.insert(entity)
    }

    pub fn lookup<Q>(&self, key: &Q) -> Option<&E>
    where
        E::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.registry.find(key)
    }

    /// Edit a registered entity in place; see [`Registry::update`]. Pending
    /// queue entries follow the entity even when its key changes.
    pub fn amend<Q, R>(&mut self, key: &Q, edit: impl FnOnce(&mut E) -> R) -> Result<R, UpdateError>
    where
        E::Key: Borrow<Q>,
        Q: Ord + fmt::Display + ?Sized,
    {
        let id = self
            .registry
            .id_of(key)
            .ok_or_else(|| UpdateError::NotFound {
                key: key.to_string(),
            })?;
        self.registry.update(id, edit)
    }

    /// Queue the entity under `key` at its own priority.
    pub fn schedule<Q>(&mut self, key: &Q) -> Result<EntityId, ScheduleError>
    where
        E::Key: Borrow<Q>,
        Q: Ord + fmt::Display + ?Sized,
    {
        let priority = self
            .registry
            .find(key)
            .map(|entity| entity.priority())
            .ok_or_else(|| ScheduleError::NotFound {
                key: key.to_string(),
            })?;
        self.schedule_at(key, priority)
    }

    /// Queue the entity under `key` at a caller-chosen priority.
    pub fn schedule_at<Q>(&mut self, key: &Q, priority: Priority) -> Result<EntityId, ScheduleError>
    where
        E::Key: Borrow<Q>,
        Q: Ord + fmt::Display + ?Sized,
    {
        let id = self
            .registry
            .id_of(key)
            .ok_or_else(|| ScheduleError::NotFound {
                key: key.to_string(),
            })?;
        self.queue.insert(id, priority)?;
        debug!(kind = E::KIND, %key, priority, queued = self.queue.len(), "scheduled");
        Ok(id)
    }

    /// The entry that would be dispatched next.
    pub fn next(&self) -> Option<Scheduled<'_, E>> {
        self.queue.peek().and_then(|entry| self.resolve(*entry))
    }

    /// Pop the next entry. The entity stays registered and can be retired
    /// afterwards if nothing else references it.
    ///
    /// Entries whose handle no longer resolves are dropped with a warning,
    /// so `None` always means the queue ran dry.
    pub fn dispatch(&mut self) -> Option<Scheduled<'_, E>> {
        let entry = loop {
            let entry = self.queue.extract_best()?;
            if self.registry.get(entry.entity).is_some() {
                break entry;
            }
            warn!(
                kind = E::KIND,
                entity = %entry.entity,
                priority = entry.priority,
                "dropped queue entry for an entity that is gone"
            );
        };
        let scheduled = self.resolve(entry)?;
        info!(
            kind = E::KIND,
            key = %scheduled.entity.key(),
            priority = scheduled.priority,
            remaining = self.queue.len(),
            "dispatched"
        );
        Some(scheduled)
    }

    /// Delete the entity under `key` from the registry.
    pub fn retire<Q>(&mut self, key: &Q) -> Result<E, DeleteError>
    where
        E::Key: Borrow<Q>,
        Q: Ord + fmt::Display + ?Sized,
    {
        let retired = self.registry.delete(key, &self.queue)?;
        info!(kind = E::KIND, %key, "retired");
        Ok(retired)
    }

    /// Every pending entry in dispatch order. The live queue is not touched.
    pub fn plan(&self) -> Plan<'_, E> {
        Plan {
            registry: &self.registry,
            drain: self.queue.drain_sorted(),
        }
    }

    /// Pending entries in heap layout order, root first.
    pub fn pending(&self) -> impl Iterator<Item = Scheduled<'_, E>> + '_ {
        self.queue
            .entries()
            .iter()
            .filter_map(|entry| self.resolve(*entry))
    }

    pub fn is_scheduled(&self, id: EntityId) -> bool {
        self.queue.contains(id)
    }

    fn resolve(&self, entry: Entry) -> Option<Scheduled<'_, E>> {
        self.registry.get(entry.entity).map(|entity| Scheduled {
            id: entry.entity,
            priority: entry.priority,
            entity,
        })
    }
}

/// Iterator returned by [`Dispatcher::plan`].
pub struct Plan<'a, E: Entity> {
    registry: &'a Registry<E>,
    drain: SortedDrain,
}

impl<'a, E: Entity> Iterator for Plan<'a, E> {
    type Item = Scheduled<'a, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let registry = self.registry;
        self.drain.find_map(|entry| {
            registry.get(entry.entity).map(|entity| Scheduled {
                id: entry.entity,
                priority: entry.priority,
                entity,
            })
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.drain.size_hint().1)
    }
}

impl<E: Entity + fmt::Debug> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registered", &self.registry.len())
            .field("queued", &self.queue.len())
            .field("order", &self.queue.order())
            .finish()
    }
}
