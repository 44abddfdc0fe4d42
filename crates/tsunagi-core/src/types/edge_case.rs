use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::AnimeId;

/// Placeholder reference for a candidate series that was vetoed.
pub const PROPOSED_SERIES_PLACEHOLDER: &str = "proposed-new-series";

/// A record that a later closure tried to claim while it already had a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiMembership {
    pub anime_id: AnimeId,
    pub title: String,
    /// Series the record already belongs to.
    pub existing_series_id: String,
    /// Reference to the rejected candidate.
    pub proposed_series_id: String,
}

/// Why a record ended up without a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrphanReason {
    /// The record has no relations at all.
    #[serde(rename = "No relations found")]
    NoRelations,
    /// Its relations lead nowhere but back to itself.
    #[serde(rename = "No reciprocal relations found")]
    NoReciprocalRelations,
}

impl fmt::Display for OrphanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRelations => write!(f, "No relations found"),
            Self::NoReciprocalRelations => write!(f, "No reciprocal relations found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedAnime {
    pub anime_id: AnimeId,
    pub title: String,
    pub reason: OrphanReason,
}

/// A relation chain that loops back onto itself.
///
/// Purely informational; cycles never change grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircularRelation {
    /// Record at which the loop closes.
    pub anime_id: AnimeId,
    /// The chain, starting and ending at `anime_id`.
    pub path: Vec<AnimeId>,
}

impl fmt::Display for CircularRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain: Vec<String> = self.path.iter().map(ToString::to_string).collect();
        write!(f, "{}", chain.join(" -> "))
    }
}

/// Everything the grouper noticed but did not treat as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCaseReport {
    pub anime_in_multiple_series: Vec<MultiMembership>,
    pub orphaned_anime: Vec<OrphanedAnime>,
    pub circular_relations: Vec<CircularRelation>,
}

impl EdgeCaseReport {
    /// Total number of entries across all three lists.
    #[must_use]
    pub fn total(&self) -> usize {
        self.anime_in_multiple_series.len()
            + self.orphaned_anime.len()
            + self.circular_relations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn orphan_reason_wire_format() {
        let orphan = OrphanedAnime {
            anime_id: 3.into(),
            title: "Series 3".into(),
            reason: OrphanReason::NoRelations,
        };
        assert_eq!(
            serde_json::to_value(&orphan).unwrap(),
            json!({"animeId": 3, "title": "Series 3", "reason": "No relations found"})
        );
        assert_eq!(
            OrphanReason::NoReciprocalRelations.to_string(),
            "No reciprocal relations found"
        );
    }

    #[test]
    fn circular_relation_display() {
        let cycle = CircularRelation {
            anime_id: 1.into(),
            path: vec![1.into(), 3.into(), 2.into(), 1.into()],
        };
        assert_eq!(cycle.to_string(), "1 -> 3 -> 2 -> 1");
    }

    #[test]
    fn report_keys_and_totals() {
        let report = EdgeCaseReport::default();
        assert!(report.is_empty());
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("animeInMultipleSeries").is_some());
        assert!(value.get("orphanedAnime").is_some());
        assert!(value.get("circularRelations").is_some());
    }
}
