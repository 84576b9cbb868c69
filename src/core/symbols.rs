//! Static symbol table: the process-wide, immutable-after-init set of tradable assets.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// A `(id, name)` pair as carried on the wire and in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    /// Small integer identifier.
    pub id: u32,
    /// Symbol name, e.g. `"EURUSD"`.
    pub name: String,
}

/// Immutable, process-wide table of admissible symbols built once at boot.
///
/// Only symbols present here are admitted: unknown `assetId`s and unknown
/// upstream quote symbols are rejected (silently, per spec) everywhere else
/// in the system.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    name_to_id: HashMap<String, u32>,
    ids: HashSet<u32>,
}

impl SymbolTable {
    /// Build a table from an ordered sequence of `(id, name)` pairs.
    ///
    /// Later duplicate names overwrite earlier ones in the `name -> id`
    /// lookup; callers are expected to supply a well-formed configuration
    /// (no duplicate ids or names) since this is static, boot-time data.
    #[must_use]
    pub fn new(entries: Vec<SymbolEntry>) -> Self {
        let name_to_id = entries.iter().map(|e| (e.name.clone(), e.id)).collect();
        let ids = entries.iter().map(|e| e.id).collect();
        Self {
            entries,
            name_to_id,
            ids,
        }
    }

    /// Resolve a wire symbol name to its asset id, if known.
    #[must_use]
    pub fn id_for_name(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    /// Whether `asset_id` is one of the admitted symbols.
    #[must_use]
    pub fn contains_id(&self, asset_id: u32) -> bool {
        self.ids.contains(&asset_id)
    }

    /// The full ordered symbol list, as served by the `"assets"` action.
    #[must_use]
    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        SymbolTable::new(vec![
            SymbolEntry { id: 1, name: "EURUSD".into() },
            SymbolEntry { id: 2, name: "USDJPY".into() },
        ])
    }

    #[test]
    fn resolves_known_name() {
        assert_eq!(table().id_for_name("EURUSD"), Some(1));
    }

    #[test]
    fn rejects_unknown_name() {
        assert_eq!(table().id_for_name("GBPUSD"), None);
    }

    #[test]
    fn contains_id_matches_table() {
        let t = table();
        assert!(t.contains_id(2));
        assert!(!t.contains_id(99));
    }

    #[test]
    fn entries_preserve_order() {
        let t = table();
        let ids: Vec<u32> = t.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
