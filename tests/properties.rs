mod common;

use std::collections::{BTreeMap, HashSet};

use common::{heap_ordered, names, Job};
use dispatch_manager::{
    DeleteError, DispatchQueue, EntityId, Order, Priority, Registry, UpdateError,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, Priority),
    Delete(u8),
    Schedule(u8),
    Rename(u8, u8),
    Extract,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..24, -100i64..100).prop_map(|(key, weight)| Op::Insert(key, weight)),
        2 => (0u8..24).prop_map(Op::Delete),
        2 => (0u8..24).prop_map(Op::Schedule),
        1 => (0u8..24, 0u8..24).prop_map(|(from, to)| Op::Rename(from, to)),
        1 => Just(Op::Extract),
    ]
}

fn order() -> impl Strategy<Value = Order> {
    prop_oneof![Just(Order::Min), Just(Order::Max)]
}

fn name(key: u8) -> String {
    format!("K{key:02}")
}

fn pending_ids(queue: &DispatchQueue) -> HashSet<EntityId> {
    queue.entries().iter().map(|entry| entry.entity).collect()
}

proptest! {
    #[test]
    fn test_registry_and_queue_stay_consistent(order in order(), ops in prop::collection::vec(op(), 0..120)) {
        let mut registry: Registry<Job> = Registry::new();
        let mut queue = DispatchQueue::with_capacity(order, 2).unwrap();
        let mut model: BTreeMap<String, Priority> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, weight) => {
                    let result = registry.insert(Job::new(name(key), weight));
                    if model.contains_key(&name(key)) {
                        let rejected = result.unwrap_err().into_inner();
                        prop_assert_eq!(rejected.weight, weight);
                    } else {
                        prop_assert!(result.is_ok());
                        model.insert(name(key), weight);
                    }
                }
                Op::Delete(key) => {
                    let before = registry.len();
                    let scheduled = registry
                        .id_of(name(key).as_str())
                        .filter(|id| queue.contains(*id));
                    match registry.delete(name(key).as_str(), &queue) {
                        Ok(job) => {
                            prop_assert!(scheduled.is_none());
                            prop_assert_eq!(model.remove(&job.name), Some(job.weight));
                        }
                        Err(DeleteError::StillScheduled { id, .. }) => {
                            prop_assert_eq!(scheduled, Some(id));
                            prop_assert_eq!(registry.len(), before);
                        }
                        Err(DeleteError::NotFound { .. }) => {
                            prop_assert!(!model.contains_key(&name(key)));
                        }
                    }
                }
                Op::Schedule(key) => {
                    if let Some(id) = registry.id_of(name(key).as_str()) {
                        let weight = registry.get(id).map(|job| job.weight).unwrap();
                        queue.insert(id, weight).unwrap();
                    }
                }
                Op::Rename(from, to) => {
                    if let Some(id) = registry.id_of(name(from).as_str()) {
                        let result = registry.update(id, |job| job.name = name(to));
                        if from == to {
                            prop_assert_eq!(result, Ok(()));
                        } else if model.contains_key(&name(to)) {
                            let is_taken = matches!(result, Err(UpdateError::KeyTaken { .. }));
                            prop_assert!(is_taken);
                            prop_assert_eq!(registry.id_of(name(from).as_str()), Some(id));
                        } else {
                            prop_assert_eq!(result, Ok(()));
                            let weight = model.remove(&name(from)).unwrap();
                            model.insert(name(to), weight);
                            prop_assert_eq!(registry.id_of(name(to).as_str()), Some(id));
                        }
                    }
                }
                Op::Extract => {
                    let expected = queue.peek().copied();
                    let entry = queue.extract_best();
                    prop_assert_eq!(entry, expected);
                    if let Some(entry) = entry {
                        prop_assert!(registry.get(entry.entity).is_some());
                    }
                }
            }

            let listed = names(&registry);
            prop_assert!(listed.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert_eq!(listed, model.keys().cloned().collect::<Vec<_>>());
            prop_assert_eq!(registry.len(), model.len());
            prop_assert!(heap_ordered(&queue));
            for id in pending_ids(&queue) {
                prop_assert!(registry.get(id).is_some());
            }
        }
    }

    #[test]
    fn test_drain_sorted_is_non_destructive(order in order(), weights in prop::collection::vec(-1000i64..1000, 0..64)) {
        let mut registry = Registry::new();
        let mut queue = DispatchQueue::new(order);
        for (i, weight) in weights.iter().enumerate() {
            let id = registry.insert(Job::new(format!("J{i:03}"), *weight)).unwrap();
            queue.insert(id, *weight).unwrap();
        }
        let layout = queue.entries().to_vec();

        let drained: Vec<Priority> = queue.drain_sorted().map(|entry| entry.priority).collect();
        prop_assert_eq!(queue.entries(), layout.as_slice());
        prop_assert_eq!(queue.len(), weights.len());

        let mut sorted = weights.clone();
        match order {
            Order::Min => sorted.sort(),
            Order::Max => sorted.sort_by(|a, b| b.cmp(a)),
        }
        prop_assert_eq!(&drained, &sorted);

        let extracted: Vec<Priority> = std::iter::from_fn(|| queue.extract_best())
            .map(|entry| entry.priority)
            .collect();
        prop_assert_eq!(extracted, drained);
    }

    #[test]
    fn test_traversal_matches_sorted_keys(keys in prop::collection::hash_set("[a-z]{1,6}", 0..48)) {
        let mut registry = Registry::new();
        for key in &keys {
            registry.insert(Job::new(key.clone(), 0)).unwrap();
        }
        let mut expected: Vec<String> = keys.into_iter().collect();
        expected.sort();
        prop_assert_eq!(names(&registry), expected);
        prop_assert!(registry.height() <= registry.len());
    }
}
