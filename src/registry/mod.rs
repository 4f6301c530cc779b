//! Ordered registry of entities, stored as an unbalanced binary search tree
//! over two arenas: tree nodes addressed by index, and entity slots addressed
//! by generational [`EntityId`] handles.
//!
//! There is no rebalancing. Inserting keys in sorted order degrades the tree
//! into a list, so insert, find and delete are O(n) in the worst case and
//! O(log n) only on average.

mod traverse;

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::mem;

use tracing::{debug, warn};

use crate::dispatch::DispatchQueue;
use crate::entity::{Entity, EntityId};
use crate::error::{DeleteError, DuplicateKey, UpdateError};

pub use traverse::{Band, Entries, InOrder};

/// Tree node. `entity` is the only payload; moving it between nodes never
/// changes the handle the outside world holds.
#[derive(Debug, Clone, Copy)]
struct Node {
    entity: EntityId,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug)]
enum Slot<E> {
    Occupied { generation: u32, entity: E },
    Vacant { generation: u32 },
}

/// Where a subtree hangs from: the root pointer or one side of a parent.
#[derive(Debug, Clone, Copy)]
enum Link {
    Root,
    Left(usize),
    Right(usize),
}

/// Sole owner of every registered entity.
#[derive(Debug)]
pub struct Registry<E: Entity> {
    nodes: Vec<Node>,
    free_nodes: Vec<usize>,
    slots: Vec<Slot<E>>,
    free_slots: Vec<usize>,
    root: Option<usize>,
    len: usize,
}

impl<E: Entity> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Registry<E> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_nodes: Vec::new(),
            slots: Vec::new(),
            free_slots: Vec::new(),
            root: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Take ownership of `entity`. A duplicate key hands the entity back
    /// inside the error and leaves the registry as it was.
    pub fn insert(&mut self, entity: E) -> Result<EntityId, DuplicateKey<E>> {
        let mut link = Link::Root;
        let mut cursor = self.root;
        while let Some(index) = cursor {
            let node = self.nodes[index];
            match entity.key().cmp(self.resolve(node.entity).key()) {
                Ordering::Less => {
                    link = Link::Left(index);
                    cursor = node.left;
                }
                Ordering::Greater => {
                    link = Link::Right(index);
                    cursor = node.right;
                }
                Ordering::Equal => {
                    debug!(kind = E::KIND, key = %entity.key(), "rejected duplicate key");
                    return Err(DuplicateKey::new(entity.key().to_string(), entity));
                }
            }
        }

        debug!(kind = E::KIND, key = %entity.key(), "registered");
        let id = self.allocate_slot(entity);
        let index = self.allocate_node(Node {
            entity: id,
            left: None,
            right: None,
        });
        self.set_link(link, Some(index));
        self.len += 1;
        Ok(id)
    }

    /// Exact-match lookup.
    pub fn find<Q>(&self, key: &Q) -> Option<&E>
    where
        E::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.locate(key)
            .map(|(_, index)| self.resolve(self.nodes[index].entity))
    }

    /// Handle of the entity registered under `key`.
    pub fn id_of<Q>(&self, key: &Q) -> Option<EntityId>
    where
        E::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.locate(key).map(|(_, index)| self.nodes[index].entity)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        E::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.locate(key).is_some()
    }

    /// Resolve a handle. Stale handles resolve to `None`.
    pub fn get(&self, id: EntityId) -> Option<&E> {
        match self.slots.get(id.index as usize) {
            Some(Slot::Occupied { generation, entity }) if *generation == id.generation => {
                Some(entity)
            }
            _ => None,
        }
    }

    /// Edit an entity in place. Queue entries referencing it see the change
    /// immediately.
    ///
    /// If `edit` changes the key, the entity is moved to its new place in the
    /// tree and keeps its handle. A new key that is already registered is
    /// refused with [`UpdateError::KeyTaken`]: the old key is written back and
    /// the entity stays where it was.
    pub fn update<R>(
        &mut self,
        id: EntityId,
        edit: impl FnOnce(&mut E) -> R,
    ) -> Result<R, UpdateError> {
        let Some(before) = self.get(id).map(|entity| entity.key().clone()) else {
            return Err(UpdateError::Stale { id });
        };
        let (link, index) = self
            .locate(&before)
            .ok_or_else(|| UpdateError::Stale { id })?;

        let entity = self.resolve_mut(id);
        let result = edit(&mut *entity);
        if *entity.key() == before {
            return Ok(result);
        }

        // The node still sits where `before` belongs; take it out while the
        // rest of the tree is ordered.
        self.unlink(link, index);
        if self.attach(id).is_ok() {
            debug!(kind = E::KIND, from = %before, to = %self.resolve(id).key(), "re-keyed");
            return Ok(result);
        }

        let to = mem::replace(self.resolve_mut(id).key_mut(), before.clone()).to_string();
        let restored = self.attach(id);
        debug_assert!(restored.is_ok(), "restored key collided");
        warn!(kind = E::KIND, from = %before, %to, "refused re-key onto a registered key");
        Err(UpdateError::KeyTaken {
            from: before.to_string(),
            to,
        })
    }

    /// First entity, in key order, that satisfies `predicate`. Walks the whole
    /// tree when nothing matches.
    pub fn find_by<P>(&self, mut predicate: P) -> Option<(EntityId, &E)>
    where
        P: FnMut(&E) -> bool,
    {
        self.entries().find(|&(_, entity)| predicate(entity))
    }

    /// Remove the entity registered under `key`, unless `queue` still holds
    /// an entry for it.
    pub fn delete<Q>(&mut self, key: &Q, queue: &DispatchQueue) -> Result<E, DeleteError>
    where
        E::Key: Borrow<Q>,
        Q: Ord + fmt::Display + ?Sized,
    {
        let Some((link, index)) = self.locate(key) else {
            debug!(kind = E::KIND, %key, "delete missed");
            return Err(DeleteError::NotFound {
                key: key.to_string(),
            });
        };

        let id = self.nodes[index].entity;
        if queue.contains(id) {
            let pending = queue.pending(id);
            warn!(kind = E::KIND, %key, pending, "refused to delete scheduled entity");
            return Err(DeleteError::StillScheduled {
                key: key.to_string(),
                id,
                pending,
            });
        }

        self.unlink(link, index);
        self.len -= 1;
        debug!(kind = E::KIND, %key, "deleted");
        Ok(self.release_slot(id))
    }

    /// Longest root-to-leaf path, counted in nodes. Equals `len()` for a
    /// fully degenerate tree.
    pub fn height(&self) -> usize {
        let mut tallest = 0;
        let mut pending: Vec<(usize, usize)> = self.root.map(|root| (root, 1)).into_iter().collect();
        while let Some((index, depth)) = pending.pop() {
            tallest = tallest.max(depth);
            let node = self.nodes[index];
            pending.extend(node.left.map(|child| (child, depth + 1)));
            pending.extend(node.right.map(|child| (child, depth + 1)));
        }
        tallest
    }

    fn locate<Q>(&self, key: &Q) -> Option<(Link, usize)>
    where
        E::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut link = Link::Root;
        let mut cursor = self.root;
        while let Some(index) = cursor {
            let node = self.nodes[index];
            let resident: &Q = self.resolve(node.entity).key().borrow();
            match key.cmp(resident) {
                Ordering::Less => {
                    link = Link::Left(index);
                    cursor = node.left;
                }
                Ordering::Greater => {
                    link = Link::Right(index);
                    cursor = node.right;
                }
                Ordering::Equal => return Some((link, index)),
            }
        }
        None
    }

    /// Detach node `index` from the tree.
    ///
    /// With two children the in-order successor's handle is copied into
    /// `index` and the successor node, which has no left child, is spliced
    /// out of the right subtree instead.
    fn unlink(&mut self, link: Link, index: usize) {
        let node = self.nodes[index];
        match (node.left, node.right) {
            (None, None) => {
                self.set_link(link, None);
                self.free_nodes.push(index);
            }
            (Some(child), None) | (None, Some(child)) => {
                self.set_link(link, Some(child));
                self.free_nodes.push(index);
            }
            (Some(_), Some(right)) => {
                let mut successor_link = Link::Right(index);
                let mut successor = right;
                while let Some(left) = self.nodes[successor].left {
                    successor_link = Link::Left(successor);
                    successor = left;
                }
                self.nodes[index].entity = self.nodes[successor].entity;
                let orphan = self.nodes[successor].right;
                self.set_link(successor_link, orphan);
                self.free_nodes.push(successor);
            }
        }
    }

    /// Hang a fresh leaf for the already-stored entity `id` under its key.
    /// Fails without touching the tree when the key is taken.
    fn attach(&mut self, id: EntityId) -> Result<(), ()> {
        let mut link = Link::Root;
        let mut cursor = self.root;
        while let Some(index) = cursor {
            let node = self.nodes[index];
            match self.resolve(id).key().cmp(self.resolve(node.entity).key()) {
                Ordering::Less => {
                    link = Link::Left(index);
                    cursor = node.left;
                }
                Ordering::Greater => {
                    link = Link::Right(index);
                    cursor = node.right;
                }
                Ordering::Equal => return Err(()),
            }
        }
        let index = self.allocate_node(Node {
            entity: id,
            left: None,
            right: None,
        });
        self.set_link(link, Some(index));
        Ok(())
    }

    fn set_link(&mut self, link: Link, child: Option<usize>) {
        match link {
            Link::Root => self.root = child,
            Link::Left(parent) => self.nodes[parent].left = child,
            Link::Right(parent) => self.nodes[parent].right = child,
        }
    }

    fn allocate_node(&mut self, node: Node) -> usize {
        match self.free_nodes.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn allocate_slot(&mut self, entity: E) -> EntityId {
        match self.free_slots.pop() {
            Some(index) => {
                let generation = match self.slots[index] {
                    Slot::Vacant { generation } | Slot::Occupied { generation, .. } => generation,
                };
                self.slots[index] = Slot::Occupied { generation, entity };
                EntityId {
                    index: index as u32,
                    generation,
                }
            }
            None => {
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    entity,
                });
                EntityId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    fn release_slot(&mut self, id: EntityId) -> E {
        let index = id.index as usize;
        let vacant = Slot::Vacant {
            generation: id.generation.wrapping_add(1),
        };
        self.free_slots.push(index);
        match mem::replace(&mut self.slots[index], vacant) {
            Slot::Occupied { entity, .. } => entity,
            Slot::Vacant { .. } => unreachable!("released a vacant registry slot"),
        }
    }

    /// Entity behind a handle stored in a live tree node.
    fn resolve(&self, id: EntityId) -> &E {
        match &self.slots[id.index as usize] {
            Slot::Occupied { entity, .. } => entity,
            Slot::Vacant { .. } => unreachable!("tree node points at a vacant slot"),
        }
    }

    fn resolve_mut(&mut self, id: EntityId) -> &mut E {
        match &mut self.slots[id.index as usize] {
            Slot::Occupied { entity, .. } => entity,
            Slot::Vacant { .. } => unreachable!("tree node points at a vacant slot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Order, Priority};

    #[derive(Debug, Clone, PartialEq)]
    struct Parcel {
        code: String,
        weight: i64,
    }

    impl Parcel {
        fn new(code: &str, weight: i64) -> Self {
            Self {
                code: code.to_string(),
                weight,
            }
        }
    }

    impl Entity for Parcel {
        type Key = String;
        const KIND: &'static str = "parcel";

        fn key(&self) -> &String {
            &self.code
        }

        fn key_mut(&mut self) -> &mut String {
            &mut self.code
        }

        fn priority(&self) -> Priority {
            self.weight
        }

        fn fields(&self) -> Vec<(&'static str, String)> {
            vec![("weight", self.weight.to_string())]
        }
    }

    fn registry_of(codes: &[&str]) -> Registry<Parcel> {
        let mut registry = Registry::new();
        for (weight, code) in codes.iter().enumerate() {
            registry.insert(Parcel::new(code, weight as i64)).unwrap();
        }
        registry
    }

    fn keys(registry: &Registry<Parcel>) -> Vec<String> {
        registry
            .traverse_in_order()
            .map(|parcel| parcel.code.clone())
            .collect()
    }

    #[test]
    fn test_duplicate_insert_returns_the_entity() {
        let mut registry = registry_of(&["C", "A", "B"]);
        let err = registry.insert(Parcel::new("A", 99)).unwrap_err();
        assert_eq!(err.key(), "A");
        assert_eq!(err.into_inner(), Parcel::new("A", 99));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.find("A").map(|p| p.weight), Some(1));
    }

    #[test]
    fn test_find_accepts_borrowed_keys() {
        let registry = registry_of(&["M", "B", "T"]);
        assert!(registry.find("T").is_some());
        assert!(registry.find("Z").is_none());
        assert!(registry.contains_key("B"));
    }

    #[test]
    fn test_delete_leaf_single_child_and_two_children() {
        let queue = DispatchQueue::new(Order::Min);
        //        M
        //      /   \
        //     D     T
        //    / \   /
        //   B   F R
        //        \
        //         G  (right of F)
        let mut registry = registry_of(&["M", "D", "T", "B", "F", "R", "G"]);

        assert_eq!(registry.delete("B", &queue).unwrap().code, "B");
        assert_eq!(keys(&registry), ["D", "F", "G", "M", "R", "T"]);

        assert_eq!(registry.delete("T", &queue).unwrap().code, "T");
        assert_eq!(keys(&registry), ["D", "F", "G", "M", "R"]);

        assert_eq!(registry.delete("M", &queue).unwrap().code, "M");
        assert_eq!(keys(&registry), ["D", "F", "G", "R"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_two_child_delete_keeps_successor_handle_valid() {
        let queue = DispatchQueue::new(Order::Min);
        let mut registry = registry_of(&["M", "D", "T", "P"]);
        let successor = registry.id_of("P").unwrap();

        registry.delete("M", &queue).unwrap();

        assert_eq!(registry.get(successor).map(|p| p.code.as_str()), Some("P"));
        assert_eq!(registry.id_of("P"), Some(successor));
        assert_eq!(keys(&registry), ["D", "P", "T"]);
    }

    #[test]
    fn test_delete_missing_key_is_not_found() {
        let queue = DispatchQueue::new(Order::Min);
        let mut registry = registry_of(&["A"]);
        assert_eq!(
            registry.delete("Q", &queue).unwrap_err(),
            DeleteError::NotFound {
                key: "Q".to_string()
            }
        );
    }

    #[test]
    fn test_scheduled_entity_cannot_be_deleted() {
        let mut queue = DispatchQueue::new(Order::Min);
        let mut registry = registry_of(&["X", "Y"]);
        let id = registry.id_of("X").unwrap();
        queue.insert(id, 1).unwrap();

        let err = registry.delete("X", &queue).unwrap_err();
        assert!(matches!(err, DeleteError::StillScheduled { pending: 1, .. }));
        assert_eq!(registry.len(), 2);

        queue.extract_best();
        assert!(registry.delete("X", &queue).is_ok());
    }

    #[test]
    fn test_stale_handles_do_not_alias_reused_slots() {
        let queue = DispatchQueue::new(Order::Min);
        let mut registry = registry_of(&["A"]);
        let old = registry.id_of("A").unwrap();
        registry.delete("A", &queue).unwrap();

        let new = registry.insert(Parcel::new("B", 5)).unwrap();
        assert_ne!(old, new);
        assert!(registry.get(old).is_none());
        assert_eq!(registry.get(new).map(|p| p.weight), Some(5));
    }

    #[test]
    fn test_update_is_visible_through_the_handle() {
        let mut registry = registry_of(&["A"]);
        let id = registry.id_of("A").unwrap();
        registry.update(id, |parcel| parcel.weight = 42).unwrap();
        assert_eq!(registry.find("A").map(|p| p.weight), Some(42));
    }

    #[test]
    fn test_update_moves_a_changed_key_and_keeps_the_handle() {
        let mut queue = DispatchQueue::new(Order::Min);
        let mut registry = registry_of(&["M", "B", "T", "A", "D"]);
        let id = registry.id_of("B").unwrap();
        queue.insert(id, 7).unwrap();

        registry.update(id, |parcel| parcel.code = "Z".to_string()).unwrap();

        assert_eq!(keys(&registry), ["A", "D", "M", "T", "Z"]);
        assert_eq!(registry.len(), 5);
        assert!(registry.find("B").is_none());
        assert_eq!(registry.id_of("Z"), Some(id));
        assert!(registry.insert(Parcel::new("Z", 0)).is_err());
        assert!(registry.insert(Parcel::new("B", 0)).is_ok());
        assert!(matches!(
            registry.delete("Z", &queue),
            Err(DeleteError::StillScheduled { .. })
        ));
        assert_eq!(queue.extract_best().map(|entry| entry.entity), Some(id));
        assert_eq!(registry.delete("Z", &queue).unwrap().code, "Z");
    }

    #[test]
    fn test_update_onto_a_taken_key_restores_the_old_key() {
        let mut registry = registry_of(&["M", "B", "T"]);
        let id = registry.id_of("B").unwrap();

        let err = registry
            .update(id, |parcel| {
                parcel.code = "T".to_string();
                parcel.weight = 9;
            })
            .unwrap_err();

        assert_eq!(
            err,
            UpdateError::KeyTaken {
                from: "B".to_string(),
                to: "T".to_string()
            }
        );
        assert_eq!(keys(&registry), ["B", "M", "T"]);
        assert_eq!(registry.id_of("B"), Some(id));
        assert_eq!(registry.find("B").map(|p| p.weight), Some(9));
        assert_eq!(registry.find("T").map(|p| p.weight), Some(2));
    }

    #[test]
    fn test_update_through_a_stale_handle_is_refused() {
        let queue = DispatchQueue::new(Order::Min);
        let mut registry = registry_of(&["A"]);
        let id = registry.id_of("A").unwrap();
        registry.delete("A", &queue).unwrap();
        assert_eq!(
            registry.update(id, |parcel| parcel.weight = 1),
            Err(UpdateError::Stale { id })
        );
    }

    #[test]
    fn test_sorted_inserts_degrade_to_a_list() {
        let registry = registry_of(&["A", "B", "C", "D", "E"]);
        assert_eq!(registry.height(), 5);
        let balanced = registry_of(&["C", "B", "D", "A", "E"]);
        assert_eq!(balanced.height(), 3);
    }

    #[test]
    fn test_find_by_scans_payload() {
        let registry = registry_of(&["K", "C", "X"]);
        let (_, hit) = registry.find_by(|parcel| parcel.weight == 2).unwrap();
        assert_eq!(hit.code, "X");
        assert!(registry.find_by(|parcel| parcel.weight > 10).is_none());
    }
}
