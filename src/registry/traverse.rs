//! Lazy in-order walks over a [`Registry`]. Each walk keeps its own explicit
//! stack, so starting a new one never disturbs another and deep degenerate
//! trees cannot overflow the call stack.

use std::cmp::Ordering;
use std::iter::FusedIterator;

use super::Registry;
use crate::entity::{Entity, EntityId};

impl<E: Entity> Registry<E> {
    /// Every entity in ascending key order.
    pub fn traverse_in_order(&self) -> InOrder<'_, E> {
        InOrder {
            inner: self.entries(),
        }
    }

    /// Entities in ascending key order that satisfy `predicate`.
    pub fn traverse_filtered<'a, P>(&'a self, mut predicate: P) -> impl Iterator<Item = &'a E> + 'a
    where
        P: FnMut(&E) -> bool + 'a,
    {
        self.traverse_in_order()
            .filter(move |entity| predicate(*entity))
    }

    /// Like [`Registry::traverse_in_order`], paired with each entity's handle.
    pub fn entries(&self) -> Entries<'_, E> {
        let mut walk = Entries {
            registry: self,
            stack: Vec::new(),
        };
        walk.descend_left(self.root);
        walk
    }

    /// Pruned in-order walk over a contiguous band of keys.
    ///
    /// `place` positions a key relative to the band: `Less` when the key sorts
    /// before it, `Equal` inside, `Greater` after. It must be monotone in key
    /// order; subtrees that lie wholly outside the band are never visited.
    pub fn traverse_band<P>(&self, place: P) -> Band<'_, E, P>
    where
        P: FnMut(&E::Key) -> Ordering,
    {
        let mut walk = Band {
            registry: self,
            stack: Vec::new(),
            place,
        };
        walk.descend(self.root);
        walk
    }
}

/// Iterator over `(EntityId, &E)` in key order.
pub struct Entries<'a, E: Entity> {
    registry: &'a Registry<E>,
    stack: Vec<usize>,
}

impl<'a, E: Entity> Entries<'a, E> {
    fn descend_left(&mut self, mut cursor: Option<usize>) {
        while let Some(index) = cursor {
            self.stack.push(index);
            cursor = self.registry.nodes[index].left;
        }
    }
}

impl<'a, E: Entity> Iterator for Entries<'a, E> {
    type Item = (EntityId, &'a E);

    fn next(&mut self) -> Option<Self::Item> {
        let registry = self.registry;
        let index = self.stack.pop()?;
        let node = registry.nodes[index];
        self.descend_left(node.right);
        Some((node.entity, registry.resolve(node.entity)))
    }
}

impl<E: Entity> FusedIterator for Entries<'_, E> {}

/// Iterator over `&E` in key order.
pub struct InOrder<'a, E: Entity> {
    inner: Entries<'a, E>,
}

impl<'a, E: Entity> Iterator for InOrder<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<&'a E> {
        self.inner.next().map(|(_, entity)| entity)
    }
}

impl<E: Entity> FusedIterator for InOrder<'_, E> {}

/// Iterator returned by [`Registry::traverse_band`].
pub struct Band<'a, E: Entity, P> {
    registry: &'a Registry<E>,
    stack: Vec<usize>,
    place: P,
}

impl<'a, E, P> Band<'a, E, P>
where
    E: Entity,
    P: FnMut(&E::Key) -> Ordering,
{
    fn place(&mut self, index: usize) -> Ordering {
        let registry = self.registry;
        let entity = registry.resolve(registry.nodes[index].entity);
        (self.place)(entity.key())
    }

    /// Push the left spine of `cursor`, skipping nodes below the band along
    /// with their left subtrees.
    fn descend(&mut self, mut cursor: Option<usize>) {
        while let Some(index) = cursor {
            let node = self.registry.nodes[index];
            if self.place(index) == Ordering::Less {
                cursor = node.right;
            } else {
                self.stack.push(index);
                cursor = node.left;
            }
        }
    }
}

impl<'a, E, P> Iterator for Band<'a, E, P>
where
    E: Entity,
    P: FnMut(&E::Key) -> Ordering,
{
    type Item = &'a E;

    fn next(&mut self) -> Option<&'a E> {
        let registry = self.registry;
        let index = self.stack.pop()?;
        if self.place(index) == Ordering::Greater {
            // everything still stacked sorts after this node
            self.stack.clear();
            return None;
        }
        let node = registry.nodes[index];
        self.descend(node.right);
        Some(registry.resolve(node.entity))
    }
}
