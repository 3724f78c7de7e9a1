/// Link-reference definitions harvested during the block pre-scan.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::strings::normalize_label;

/// A single reference definition. Either a URL reference (`[label]: /url
/// "title"`) or an attributes-only reference (`[label]: {.class #id}`),
/// distinguished by `is_attributes_reference` so inline resolution knows
/// whether the lookup result is a link target or a bag of attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub url: String,
    pub title: Option<String>,
    pub attributes: Option<String>,
    pub is_attributes_reference: bool,
}

/// Map from normalized label to reference. Populated while blocks are
/// scanned, read-only once inline parsing begins. Both reference kinds
/// share one label namespace, and the first definition for a label wins.
#[derive(Debug, Default, Clone)]
pub struct ReferenceMap {
    refs: HashMap<String, Reference>,
}

impl ReferenceMap {
    pub fn new() -> ReferenceMap {
        ReferenceMap {
            refs: HashMap::new(),
        }
    }

    /// Record a URL reference. Duplicate labels are a silent no-op
    /// (CommonMark: the first definition wins, later ones still consume
    /// their input lines).
    pub fn create(&mut self, label: &str, url: String, title: Option<String>) {
        let key = normalize_label(label);
        if key.is_empty() {
            return;
        }
        self.refs.entry(key).or_insert(Reference {
            url,
            title,
            attributes: None,
            is_attributes_reference: false,
        });
    }

    /// Record an attributes-only reference. Same normalization and same
    /// first-wins rule, competing in the same namespace as URL references.
    pub fn create_attributes(&mut self, label: &str, attributes: String) {
        let key = normalize_label(label);
        if key.is_empty() {
            return;
        }
        self.refs.entry(key).or_insert(Reference {
            url: String::new(),
            title: None,
            attributes: Some(attributes),
            is_attributes_reference: true,
        });
    }

    /// Look up a label, normalizing it the same way insertion did. Absence
    /// is a routine outcome: the caller falls back to literal bracket text.
    pub fn lookup(&self, label: &str) -> Option<&Reference> {
        let key = normalize_label(label);
        if key.is_empty() {
            return None;
        }
        self.refs.get(&key)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}
