//! # Series Splitter
//!
//! Breaks each series group into a continuity ("main") part and soft
//! clusters by relation semantics. Structural relations (sequel, prequel,
//! side story, summary, ...) define MAIN clusters; CHARACTER, ADAPTATION,
//! SPIN_OFF, OTHER and PARENT relations are clustered separately and may
//! never take a record a MAIN cluster already owns.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::graph::ComponentGraph;
use crate::naming::NamingResolver;
use crate::types::{
    AdvancedSplit, AnimeId, ClusterCategory, ExternalReferences, RelationCategory, SeriesGroup,
    SeriesRelation, SplitCluster,
};

/// Typed adjacency maps of one series.
#[derive(Debug, Default)]
struct CategoryGraphs {
    structural: ComponentGraph,
    character: ComponentGraph,
    adaptation: ComponentGraph,
    spin_off: ComponentGraph,
    other_or_parent: ComponentGraph,
    parent: ComponentGraph,
}

impl CategoryGraphs {
    fn build(relations: &[SeriesRelation]) -> Self {
        let mut graphs = Self::default();
        for rel in relations {
            let (a, b) = (&rel.source_id, &rel.target_id);
            match rel.category() {
                RelationCategory::Character => graphs.character.add_edge(a, b),
                RelationCategory::Adaptation => graphs.adaptation.add_edge(a, b),
                RelationCategory::SpinOff => graphs.spin_off.add_edge(a, b),
                RelationCategory::Other => graphs.other_or_parent.add_edge(a, b),
                RelationCategory::Parent => {
                    graphs.other_or_parent.add_edge(a, b);
                    graphs.parent.add_edge(a, b);
                }
                RelationCategory::Structural => graphs.structural.add_edge(a, b),
            }
        }
        graphs
    }

    fn graph_for(&self, category: ClusterCategory) -> &ComponentGraph {
        match category {
            ClusterCategory::Main => &self.structural,
            ClusterCategory::Character => &self.character,
            ClusterCategory::Adaptation => &self.adaptation,
            ClusterCategory::SpinOff => &self.spin_off,
            ClusterCategory::Other => &self.other_or_parent,
            ClusterCategory::Parent => &self.parent,
        }
    }
}

/// Returns `true` if a relation feeds the graph of `category`.
fn feeds(category: ClusterCategory, relation: RelationCategory) -> bool {
    match category {
        ClusterCategory::Main => relation == RelationCategory::Structural,
        ClusterCategory::Character => relation == RelationCategory::Character,
        ClusterCategory::Adaptation => relation == RelationCategory::Adaptation,
        ClusterCategory::SpinOff => relation == RelationCategory::SpinOff,
        ClusterCategory::Other => {
            matches!(relation, RelationCategory::Other | RelationCategory::Parent)
        }
        ClusterCategory::Parent => relation == RelationCategory::Parent,
    }
}

/// Sorts relations by `(source, target)` and drops repeats of the same
/// `source-target-type` key.
fn dedup_sorted(relations: impl IntoIterator<Item = SeriesRelation>) -> Vec<SeriesRelation> {
    let mut seen = HashSet::new();
    let mut out: Vec<SeriesRelation> = relations
        .into_iter()
        .filter(|rel| seen.insert(rel.dedup_key()))
        .collect();
    out.sort_by(|a, b| {
        a.source_id
            .cmp(&b.source_id)
            .then_with(|| a.target_id.cmp(&b.target_id))
    });
    out
}

/// Splits series groups into MAIN and soft-category clusters.
#[derive(Debug, Clone, Copy)]
pub struct SeriesSplitter<'a> {
    resolver: &'a NamingResolver,
}

impl<'a> SeriesSplitter<'a> {
    /// Create a splitter naming clusters through `resolver`.
    pub fn new(resolver: &'a NamingResolver) -> Self {
        Self { resolver }
    }

    /// Splits every group, concatenating clusters per category in group order.
    pub fn split(&self, groups: &[SeriesGroup]) -> AdvancedSplit {
        let mut split = AdvancedSplit::default();
        for group in groups {
            for cluster in self.split_group(group) {
                split.push(cluster);
            }
        }
        split
    }

    /// Splits one series group.
    ///
    /// MAIN clusters come first, followed by the soft categories in the
    /// order CHARACTER, ADAPTATION, SPIN_OFF, OTHER, PARENT.
    pub fn split_group(&self, group: &SeriesGroup) -> Vec<SplitCluster> {
        let graphs = CategoryGraphs::build(&group.relations);
        let mut clusters = Vec::new();
        let mut claimed: HashSet<AnimeId> = HashSet::new();

        let mains: Vec<Vec<AnimeId>> = graphs
            .structural
            .components()
            .into_iter()
            .filter(|c| c.len() >= 2)
            .collect();

        for (i, members) in mains.into_iter().enumerate() {
            claimed.extend(members.iter().cloned());
            clusters.push(self.main_cluster(group, members, i + 1));
        }

        for category in ClusterCategory::SOFT {
            let mut index = 0;
            for component in graphs.graph_for(category).components() {
                if component.len() < 2 {
                    continue;
                }
                let members: Vec<AnimeId> = component
                    .into_iter()
                    .filter(|id| !claimed.contains(id))
                    .collect();
                if members.len() < 2 {
                    continue;
                }
                index += 1;
                clusters.push(self.soft_cluster(group, category, members, index));
            }
        }

        debug!(
            series_id = %group.series_id,
            clusters = clusters.len(),
            "series split"
        );
        clusters
    }

    fn cluster_id(category: ClusterCategory, group: &SeriesGroup, index: usize) -> String {
        format!("{}_{}_{}", category.id_prefix(), group.series_id, index)
    }

    fn main_cluster(&self, group: &SeriesGroup, members: Vec<AnimeId>, index: usize) -> SplitCluster {
        let inside: HashSet<&AnimeId> = members.iter().collect();
        let mut other_ids = BTreeSet::new();
        let mut character_ids = BTreeSet::new();
        let mut adaptation_ids = BTreeSet::new();
        let mut spin_off_ids = BTreeSet::new();
        let mut internal = Vec::new();

        for rel in &group.relations {
            let source_in = inside.contains(&rel.source_id);
            let target_in = inside.contains(&rel.target_id);
            if !source_in && !target_in {
                continue;
            }
            let outside = if source_in { &rel.target_id } else { &rel.source_id };

            match rel.category() {
                RelationCategory::Character if source_in != target_in => {
                    character_ids.insert(outside.clone());
                }
                RelationCategory::Adaptation if source_in != target_in => {
                    adaptation_ids.insert(outside.clone());
                }
                RelationCategory::SpinOff if source_in != target_in => {
                    spin_off_ids.insert(outside.clone());
                }
                _ if source_in && target_in => internal.push(rel.clone()),
                _ => {
                    other_ids.insert(outside.clone());
                }
            }
        }

        let mut anime_ids = members;
        anime_ids.sort();

        SplitCluster {
            id: Self::cluster_id(ClusterCategory::Main, group, index),
            name: self.resolver.resolve(&anime_ids),
            original_series_id: group.series_id.clone(),
            category: ClusterCategory::Main,
            references: Some(ExternalReferences {
                other_ids: other_ids.into_iter().collect(),
                character_ids: character_ids.into_iter().collect(),
                adaptation_ids: adaptation_ids.into_iter().collect(),
                spin_off_ids: spin_off_ids.into_iter().collect(),
            }),
            relations: dedup_sorted(internal),
            anime_ids,
        }
    }

    fn soft_cluster(
        &self,
        group: &SeriesGroup,
        category: ClusterCategory,
        members: Vec<AnimeId>,
        index: usize,
    ) -> SplitCluster {
        let inside: HashSet<&AnimeId> = members.iter().collect();
        let relations: Vec<SeriesRelation> = group
            .relations
            .iter()
            .filter(|rel| {
                feeds(category, rel.category())
                    && inside.contains(&rel.source_id)
                    && inside.contains(&rel.target_id)
            })
            .cloned()
            .collect();

        let mut anime_ids = members;
        anime_ids.sort();

        let base = self.resolver.resolve(&anime_ids);
        let name = match category.name_suffix() {
            Some(suffix) => format!("{base} {suffix}"),
            None => base,
        };

        SplitCluster {
            id: Self::cluster_id(category, group, index),
            name,
            original_series_id: group.series_id.clone(),
            category,
            references: None,
            relations: dedup_sorted(relations),
            anime_ids,
        }
    }
}
