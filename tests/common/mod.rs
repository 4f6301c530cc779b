#![allow(dead_code)]

use dispatch_manager::{DispatchQueue, Entity, Priority, Registry};

/// Minimal entity keyed by a short name.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub name: String,
    pub weight: Priority,
}

impl Job {
    pub fn new(name: impl Into<String>, weight: Priority) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

impl Entity for Job {
    type Key = String;
    const KIND: &'static str = "job";

    fn key(&self) -> &String {
        &self.name
    }

    fn key_mut(&mut self) -> &mut String {
        &mut self.name
    }

    fn priority(&self) -> Priority {
        self.weight
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![("weight", self.weight.to_string())]
    }
}

pub fn names(registry: &Registry<Job>) -> Vec<String> {
    registry
        .traverse_in_order()
        .map(|job| job.name.clone())
        .collect()
}

/// True when no parent is served after one of its children.
pub fn heap_ordered(queue: &DispatchQueue) -> bool {
    let entries = queue.entries();
    (1..entries.len()).all(|child| {
        let parent = (child - 1) / 2;
        !queue
            .order()
            .prefers(entries[child].priority, entries[parent].priority)
    })
}
