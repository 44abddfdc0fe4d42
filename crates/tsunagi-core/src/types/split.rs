use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::AnimeId;
use super::relation::SeriesRelation;

/// Category of a split cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterCategory {
    /// Continuity cluster built from structural relations.
    Main,
    Character,
    Adaptation,
    SpinOff,
    /// OTHER and PARENT relations combined.
    Other,
    /// PARENT relations alone.
    Parent,
}

impl ClusterCategory {
    /// Soft categories, in output order.
    pub const SOFT: [Self; 5] = [
        Self::Character,
        Self::Adaptation,
        Self::SpinOff,
        Self::Other,
        Self::Parent,
    ];

    /// Prefix used in cluster ids.
    #[must_use]
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Character => "character",
            Self::Adaptation => "adaptation",
            Self::SpinOff => "spin_off",
            Self::Other => "other",
            Self::Parent => "parent",
        }
    }

    /// Parenthesized suffix appended to soft cluster names.
    #[must_use]
    pub fn name_suffix(self) -> Option<&'static str> {
        match self {
            Self::Main => None,
            Self::Character => Some("(Character)"),
            Self::Adaptation => Some("(Adaptation)"),
            Self::SpinOff => Some("(Spin-off)"),
            Self::Other => Some("(Other)"),
            Self::Parent => Some("(Parent)"),
        }
    }
}

impl fmt::Display for ClusterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "MAIN"),
            Self::Character => write!(f, "CHARACTER"),
            Self::Adaptation => write!(f, "ADAPTATION"),
            Self::SpinOff => write!(f, "SPIN_OFF"),
            Self::Other => write!(f, "OTHER"),
            Self::Parent => write!(f, "PARENT"),
        }
    }
}

/// Ids a MAIN cluster references outside itself, by relation kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalReferences {
    pub other_ids: Vec<AnimeId>,
    pub character_ids: Vec<AnimeId>,
    pub adaptation_ids: Vec<AnimeId>,
    pub spin_off_ids: Vec<AnimeId>,
}

/// One cluster of a split series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitCluster {
    /// `<category>_<originalGroupId>_<index>`.
    pub id: String,
    pub name: String,
    pub original_series_id: String,
    /// Member ids, ascending.
    pub anime_ids: Vec<AnimeId>,
    pub category: ClusterCategory,
    /// Present on MAIN clusters only.
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ExternalReferences>,
    /// Deduplicated relations between members, sorted by `(source, target)`.
    pub relations: Vec<SeriesRelation>,
}

impl SplitCluster {
    #[must_use]
    pub fn len(&self) -> usize {
        self.anime_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anime_ids.is_empty()
    }
}

/// The partitioned cluster sets of every series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSplit {
    pub main: Vec<SplitCluster>,
    pub character: Vec<SplitCluster>,
    pub adaptation: Vec<SplitCluster>,
    pub spin_off: Vec<SplitCluster>,
    pub other: Vec<SplitCluster>,
    pub parent: Vec<SplitCluster>,
}

impl AdvancedSplit {
    /// Appends a cluster to the list of its category.
    pub fn push(&mut self, cluster: SplitCluster) {
        self.bucket_mut(cluster.category).push(cluster);
    }

    /// Clusters of one category.
    #[must_use]
    pub fn bucket(&self, category: ClusterCategory) -> &[SplitCluster] {
        match category {
            ClusterCategory::Main => &self.main,
            ClusterCategory::Character => &self.character,
            ClusterCategory::Adaptation => &self.adaptation,
            ClusterCategory::SpinOff => &self.spin_off,
            ClusterCategory::Other => &self.other,
            ClusterCategory::Parent => &self.parent,
        }
    }

    fn bucket_mut(&mut self, category: ClusterCategory) -> &mut Vec<SplitCluster> {
        match category {
            ClusterCategory::Main => &mut self.main,
            ClusterCategory::Character => &mut self.character,
            ClusterCategory::Adaptation => &mut self.adaptation,
            ClusterCategory::SpinOff => &mut self.spin_off,
            ClusterCategory::Other => &mut self.other,
            ClusterCategory::Parent => &mut self.parent,
        }
    }

    /// All clusters, MAIN first, then soft categories in output order.
    pub fn iter(&self) -> impl Iterator<Item = &SplitCluster> {
        std::iter::once(ClusterCategory::Main)
            .chain(ClusterCategory::SOFT)
            .flat_map(move |c| self.bucket(c).iter())
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(category: ClusterCategory, references: Option<ExternalReferences>) -> SplitCluster {
        SplitCluster {
            id: format!("{}_demo_1", category.id_prefix()),
            name: "Demo".into(),
            original_series_id: "demo".into(),
            anime_ids: vec![1.into(), 2.into()],
            category,
            references,
            relations: Vec::new(),
        }
    }

    #[test]
    fn main_cluster_flattens_references() {
        let value =
            serde_json::to_value(cluster(ClusterCategory::Main, Some(ExternalReferences::default())))
                .unwrap();
        assert_eq!(value["category"], "MAIN");
        assert!(value["characterIds"].is_array());
        assert!(value["spinOffIds"].is_array());
        assert_eq!(value["originalSeriesId"], "demo");
    }

    #[test]
    fn soft_cluster_has_no_reference_lists() {
        let value = serde_json::to_value(cluster(ClusterCategory::SpinOff, None)).unwrap();
        assert_eq!(value["category"], "SPIN_OFF");
        assert!(value.get("otherIds").is_none());
    }

    #[test]
    fn push_routes_by_category() {
        let mut split = AdvancedSplit::default();
        split.push(cluster(ClusterCategory::Main, Some(ExternalReferences::default())));
        split.push(cluster(ClusterCategory::Parent, None));
        assert_eq!(split.main.len(), 1);
        assert_eq!(split.parent.len(), 1);
        assert_eq!(split.total(), 2);

        let value = serde_json::to_value(&split).unwrap();
        assert!(value["spinOff"].is_array());
    }

    #[test]
    fn suffixes_and_prefixes() {
        assert_eq!(ClusterCategory::Main.name_suffix(), None);
        assert_eq!(ClusterCategory::Character.name_suffix(), Some("(Character)"));
        assert_eq!(ClusterCategory::SpinOff.id_prefix(), "spin_off");
    }
}
