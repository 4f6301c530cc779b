use crate::entity::Entity;
use crate::registry::Registry;

/// Keys currently listed on the registry panel, in key order, after the text
/// filter has been applied.
pub(crate) struct RegistryScreen<K> {
    pub(crate) keys: Vec<K>,
    pub(crate) filter: Option<String>,
    pub(crate) selected: usize,
}

impl<K: Clone + Ord> RegistryScreen<K> {
    pub(crate) fn new() -> Self {
        Self {
            keys: Vec::new(),
            filter: None,
            selected: 0,
        }
    }

    /// Re-read the registry. Call after anything that inserts or deletes.
    pub(crate) fn refresh<E>(&mut self, registry: &Registry<E>)
    where
        E: Entity<Key = K>,
    {
        let query = self.filter.clone().unwrap_or_default();
        self.keys = registry
            .traverse_filtered(|entity| entity.matches_text(&query))
            .map(|entity| entity.key().clone())
            .collect();
        self.ensure_in_bounds();
    }

    pub(crate) fn set_filter<E>(&mut self, filter: Option<String>, registry: &Registry<E>)
    where
        E: Entity<Key = K>,
    {
        self.filter = filter.filter(|query| !query.trim().is_empty());
        self.refresh(registry);
    }

    pub(crate) fn current_key(&self) -> Option<&K> {
        self.keys.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.keys.is_empty() {
            return;
        }
        let last = self.keys.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.keys.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        if self.selected >= self.keys.len() {
            self.select_last();
        }
    }
}

/// How the queue panel lays out pending entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueueView {
    /// Raw heap array, root first.
    Heap,
    /// Service order, computed on a copy of the heap.
    Plan,
}

impl QueueView {
    pub(crate) fn toggle(self) -> Self {
        match self {
            QueueView::Heap => QueueView::Plan,
            QueueView::Plan => QueueView::Heap,
        }
    }

    pub(crate) fn title(self) -> &'static str {
        match self {
            QueueView::Heap => "Queue (heap layout)",
            QueueView::Plan => "Queue (dispatch plan)",
        }
    }
}
