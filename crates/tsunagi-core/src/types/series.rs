use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::id::AnimeId;
use super::relation::SeriesRelation;

/// Snapshot of a member record inside a series group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimeDetail {
    pub id: AnimeId,
    pub title: String,
}

/// Relation-type index: `type -> ["src->tgt", ...]`.
///
/// Types keep the order in which they were first seen and keys keep
/// insertion order within a type, so output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationTypeIndex {
    entries: Vec<(String, Vec<String>)>,
    positions: HashMap<String, usize>,
    seen: HashSet<(usize, String)>,
}

impl RelationTypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` under `relation_type`; returns `false` if already present.
    pub fn insert(&mut self, relation_type: &str, key: String) -> bool {
        let slot = match self.positions.get(relation_type) {
            Some(&slot) => slot,
            None => {
                self.entries.push((relation_type.to_string(), Vec::new()));
                let slot = self.entries.len() - 1;
                self.positions.insert(relation_type.to_string(), slot);
                slot
            }
        };
        if !self.seen.insert((slot, key.clone())) {
            return false;
        }
        self.entries[slot].1.push(key);
        true
    }

    /// Keys recorded for a relation type.
    #[must_use]
    pub fn get(&self, relation_type: &str) -> Option<&[String]> {
        self.positions
            .get(relation_type)
            .map(|&slot| self.entries[slot].1.as_slice())
    }

    /// Relation types in first-seen order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RelationTypeIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (relation_type, keys) in &self.entries {
            map.serialize_entry(relation_type, keys)?;
        }
        map.end()
    }
}

struct RelationTypeIndexVisitor;

impl<'de> Visitor<'de> for RelationTypeIndexVisitor {
    type Value = RelationTypeIndex;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of relation type to relation keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut index = RelationTypeIndex::new();
        while let Some((relation_type, keys)) = access.next_entry::<String, Vec<String>>()? {
            for key in keys {
                index.insert(&relation_type, key);
            }
        }
        Ok(index)
    }
}

impl<'de> Deserialize<'de> for RelationTypeIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RelationTypeIndexVisitor)
    }
}

/// A maximal connected set of records, produced by the series grouper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesGroup {
    /// Stable slug identifier.
    pub series_id: String,

    /// Representative title.
    pub series_name: String,

    /// Member ids, ascending.
    pub anime_ids: Vec<AnimeId>,

    /// Per-member snapshot.
    pub anime_details: BTreeMap<AnimeId, AnimeDetail>,

    /// Relations whose both endpoints are members.
    pub relations: Vec<SeriesRelation>,

    /// Relation keys grouped by relation type.
    pub relation_types: RelationTypeIndex,
}

impl SeriesGroup {
    /// Returns `true` if `id` is a member of this group.
    #[must_use]
    pub fn contains(&self, id: &AnimeId) -> bool {
        self.anime_details.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anime_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anime_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_deduplicates_per_type() {
        let mut index = RelationTypeIndex::new();
        assert!(index.insert("SEQUEL", "1->2".into()));
        assert!(!index.insert("SEQUEL", "1->2".into()));
        assert!(index.insert("PREQUEL", "2->1".into()));
        assert!(index.insert("OTHER", "1->2".into()));

        assert_eq!(index.get("SEQUEL"), Some(&["1->2".to_string()][..]));
        assert_eq!(index.types().collect::<Vec<_>>(), vec!["SEQUEL", "PREQUEL", "OTHER"]);
    }

    #[test]
    fn index_serializes_in_insertion_order() {
        let mut index = RelationTypeIndex::new();
        index.insert("SEQUEL", "1->2".into());
        index.insert("ADAPTATION", "1->3".into());
        index.insert("SEQUEL", "2->4".into());

        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(json, r#"{"SEQUEL":["1->2","2->4"],"ADAPTATION":["1->3"]}"#);

        let back: RelationTypeIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back, index);
    }
}
