//! Activity list engine: filtering, sorting and selection for the menu

use romkeep_api::{ActivityQuery, SortKey};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::RomEntity;

/// Whether an entity passes every filter in the query
pub fn passes(entity: &RomEntity, query: &ActivityQuery) -> bool {
    let filters = &query.filters;
    filters.running.accepts(entity.is_running())
        && filters.favorite.accepts(entity.favorite.is_true())
        && filters.completed.accepts(entity.completed.is_true())
        && query.system.accepts(&entity.system)
}

/// Ordering for one sort key, before `reverse` is applied.
///
/// Time compares the formatted `total_time` strings, so "9s" sorts
/// above "1h 0m 0s".
pub fn compare_entities(a: &RomEntity, b: &RomEntity, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Time => b.total_time.cmp(&a.total_time),
        SortKey::Count => b.count.cmp(&a.count),
        SortKey::Last => b.last.cmp(&a.last),
    }
}

/// Stable sort in place
pub fn sort_entities(entities: &mut [RomEntity], key: SortKey, reverse: bool) {
    entities.sort_by(|a, b| {
        let ordering = compare_entities(a, b, key);
        if reverse { ordering.reverse() } else { ordering }
    });
}

/// The visible list for a query
pub fn derive_view(entities: &[RomEntity], query: &ActivityQuery) -> Vec<RomEntity> {
    let mut view: Vec<RomEntity> = entities
        .iter()
        .filter(|e| passes(e, query))
        .cloned()
        .collect();
    sort_entities(&mut view, query.sort, query.reverse);
    view
}

/// Clamp a selection index into `[0, len - 1]`; 0 for an empty list
pub fn clamp_selection(index: isize, len: usize) -> usize {
    if len == 0 || index < 0 {
        return 0;
    }
    (index as usize).min(len - 1)
}

/// Distinct systems, sorted, for the system selector
pub fn systems(entities: &[RomEntity]) -> Vec<String> {
    entities
        .iter()
        .map(|e| e.system.as_str())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// The visible list plus the selected row
#[derive(Debug, Clone, Default)]
pub struct ActivityList {
    items: Vec<RomEntity>,
    selected: usize,
}

impl ActivityList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive the list, keeping the selection on the same file when it
    /// is still visible
    pub fn rebuild(&mut self, entities: &[RomEntity], query: &ActivityQuery) {
        let previous = self.selected_entity().map(|e| e.file.clone());
        self.items = derive_view(entities, query);

        let index = previous
            .and_then(|file| self.items.iter().position(|e| e.file == file))
            .unwrap_or(self.selected);
        self.selected = clamp_selection(index as isize, self.items.len());
    }

    pub fn items(&self) -> &[RomEntity] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_entity(&self) -> Option<&RomEntity> {
        self.items.get(self.selected)
    }

    pub fn select(&mut self, index: isize) {
        self.selected = clamp_selection(index, self.items.len());
    }

    /// Move the selection by `delta` rows, stopping at either end
    pub fn move_by(&mut self, delta: isize) {
        self.select(self.selected as isize + delta);
    }
}
