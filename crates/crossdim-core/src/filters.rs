//! # Filter Factories
//!
//! Turn a dimension's selection into the predicate it broadcasts to its peers.
//!
//! A factory receives the selection and the dimension's filter extractor and
//! returns a predicate. Factories are pure: the same selection and extractor
//! always produce a predicate with the same answers.

use crate::types::{Key, Predicate};
use std::collections::HashSet;
use std::sync::Arc;

/// What a filter extractor pulls out of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKey {
    /// A single key, typically the series key.
    One(Key),
    /// A multi-valued field, e.g. tags.
    Many(Vec<Key>),
}

impl From<Key> for FilterKey {
    fn from(key: Key) -> Self {
        Self::One(key)
    }
}

impl From<Vec<Key>> for FilterKey {
    fn from(keys: Vec<Key>) -> Self {
        Self::Many(keys)
    }
}

/// Extracts the value a selection is compared against.
pub type FilterKeyFn<R> = Arc<dyn Fn(&R) -> FilterKey + Send + Sync>;

/// Builds an outbound predicate from a selection and an extractor.
pub type FilterFactory<R> = Arc<dyn Fn(&[Key], FilterKeyFn<R>) -> Predicate<R> + Send + Sync>;

/// Passes records whose extracted key equals any selection value.
///
/// A `Many` extraction never equals a scalar selection value; multi-valued
/// fields want [`any_selection_in_value_array`].
pub fn any_selection_matches_value<R: 'static>(
    selection: &[Key],
    extractor: FilterKeyFn<R>,
) -> Predicate<R> {
    let wanted: HashSet<Key> = selection.iter().cloned().collect();
    Arc::new(move |record: &R| match extractor(record) {
        FilterKey::One(key) => wanted.contains(&key),
        FilterKey::Many(_) => false,
    })
}

/// Passes records where any selection value is a member of the extracted keys.
///
/// A `One` extraction is treated as a one-element list.
pub fn any_selection_in_value_array<R: 'static>(
    selection: &[Key],
    extractor: FilterKeyFn<R>,
) -> Predicate<R> {
    let selection: Vec<Key> = selection.to_vec();
    Arc::new(move |record: &R| match extractor(record) {
        FilterKey::One(key) => selection.contains(&key),
        FilterKey::Many(keys) => selection.iter().any(|s| keys.contains(s)),
    })
}

/// The default factory, [`any_selection_matches_value`] behind the factory alias.
pub fn default_factory<R: 'static>() -> FilterFactory<R> {
    Arc::new(|selection: &[Key], extractor: FilterKeyFn<R>| {
        any_selection_matches_value(selection, extractor)
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        group: &'static str,
        tags: Vec<&'static str>,
    }

    fn group_of() -> FilterKeyFn<Row> {
        Arc::new(|r: &Row| FilterKey::One(Key::from(r.group)))
    }

    fn tags_of() -> FilterKeyFn<Row> {
        Arc::new(|r: &Row| FilterKey::Many(r.tags.iter().copied().map(Key::from).collect()))
    }

    fn keys(values: &[&str]) -> Vec<Key> {
        values.iter().copied().map(Key::from).collect()
    }

    #[test]
    fn matches_value_accepts_any_selected_key() {
        let pred = any_selection_matches_value(&keys(&["A", "C"]), group_of());

        assert!(pred(&Row { group: "A", tags: vec![] }));
        assert!(pred(&Row { group: "C", tags: vec![] }));
        assert!(!pred(&Row { group: "B", tags: vec![] }));
    }

    #[test]
    fn matches_value_rejects_multi_valued_extraction() {
        let pred = any_selection_matches_value(&keys(&["A"]), tags_of());
        assert!(!pred(&Row { group: "A", tags: vec!["A"] }));
    }

    #[test]
    fn in_value_array_checks_membership() {
        let pred = any_selection_in_value_array(&keys(&["C"]), tags_of());

        assert!(pred(&Row { group: "A", tags: vec!["A", "C"] }));
        assert!(!pred(&Row { group: "A", tags: vec!["A"] }));
        assert!(!pred(&Row { group: "A", tags: vec![] }));
    }

    #[test]
    fn in_value_array_treats_single_key_as_list() {
        let pred = any_selection_in_value_array(&keys(&["B"]), group_of());
        assert!(pred(&Row { group: "B", tags: vec![] }));
    }

    #[test]
    fn default_factory_is_matches_value() {
        let factory = default_factory::<Row>();
        let pred = factory(&keys(&["A"]), group_of());
        assert!(pred(&Row { group: "A", tags: vec![] }));
        assert!(!pred(&Row { group: "B", tags: vec!["A"] }));
    }
}
