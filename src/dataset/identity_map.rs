use hashbrown::HashMap;

use crate::error::{EntityKind, Error, Result};

/// Bidirectional mapping between opaque identifiers and dense indices `0..len`.
/// Indices are handed out in the order identifiers are first seen.
#[derive(Debug, Clone)]
pub struct IdentityMap {
    kind: EntityKind,
    index_by_id: HashMap<String, usize>,
    ids: Vec<String>,
}

impl IdentityMap {
    pub fn new(kind: EntityKind) -> Self {
        IdentityMap {
            kind,
            index_by_id: HashMap::new(),
            ids: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the index of `id`, assigning the next free index when `id` is new.
    pub fn get_or_insert(&mut self, id: &str) -> usize {
        if let Some(index) = self.index_by_id.get(id) {
            return *index;
        }
        let index = self.ids.len();
        self.index_by_id.insert(id.to_string(), index);
        self.ids.push(id.to_string());
        index
    }

    pub fn index_of(&self, id: &str) -> Result<usize> {
        self.index_by_id
            .get(id)
            .copied()
            .ok_or_else(|| Error::UnknownIdentifier {
                kind: self.kind,
                id: id.to_string(),
            })
    }

    pub fn id_of(&self, index: usize) -> Result<&str> {
        self.ids
            .get(index)
            .map(String::as_str)
            .ok_or(Error::IndexOutOfRange {
                kind: self.kind,
                index,
                len: self.ids.len(),
            })
    }

    /// Identifiers in index order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl PartialEq for IdentityMap {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.ids == other.ids
    }
}

/// The user and item mappings that together define one index space.
#[derive(Debug, Clone, PartialEq)]
pub struct Identities {
    pub users: IdentityMap,
    pub items: IdentityMap,
}

impl Identities {
    pub fn new() -> Self {
        Identities {
            users: IdentityMap::new(EntityKind::User),
            items: IdentityMap::new(EntityKind::Item),
        }
    }
}

impl Default for Identities {
    fn default() -> Self {
        Self::new()
    }
}
