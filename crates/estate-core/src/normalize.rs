//! Subtype normalization.
//!
//! Categorical values were written at different times as English IDs and as
//! localized labels. Inputs are resolved to canonical IDs here, and canonical
//! IDs are expanded back into every raw form a stored listing may carry, so
//! both historical formats match at query time.

use crate::taxonomy::{CategoricalField, FieldOption};
use once_cell::sync::Lazy;
use std::collections::HashMap;

// (field, lowercased legacy label) -> canonical id
static LABEL_INDEX: Lazy<HashMap<(CategoricalField, String), &'static str>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for field in CategoricalField::ALL {
        for option in field.options() {
            for label in option.legacy_labels {
                index.insert((field, label.to_lowercase()), option.id);
            }
        }
    }
    index
});

fn option_by_id(field: CategoricalField, id: &str) -> Option<&'static FieldOption> {
    field.options().iter().find(|o| o.id == id)
}

/// Resolves `raw` to a canonical ID of `field`.
///
/// Exact ID match first, then a case-insensitive legacy label match. Returns
/// `None` for anything else, sentinels included.
pub fn normalize(field: CategoricalField, raw: &str) -> Option<&'static str> {
    let token = raw.trim();
    if token.is_empty() {
        return None;
    }
    if let Some(option) = option_by_id(field, token) {
        return Some(option.id);
    }
    LABEL_INDEX.get(&(field, token.to_lowercase())).copied()
}

/// `[id, legacy labels...]` for a canonical ID; empty for an unknown ID.
pub fn expand_for_storage_match(field: CategoricalField, canonical_id: &str) -> Vec<&'static str> {
    match option_by_id(field, canonical_id) {
        Some(option) => std::iter::once(option.id)
            .chain(option.legacy_labels.iter().copied())
            .collect(),
        None => Vec::new(),
    }
}
