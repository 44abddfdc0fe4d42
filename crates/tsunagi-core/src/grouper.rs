//! # Series Grouper
//!
//! Walks the relation graph from every record in input order, turning each
//! reachability closure into a series group unless it is trivially small or
//! collides with a group that was already finalized. Whatever does not make
//! it into a group is reported through the [`EdgeCaseCollector`].

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::error::Result;
use crate::naming::{DEFAULT_SLUG_MAX_LEN, NamingResolver, SeriesIdAllocator};
use crate::types::{
    AnimeDetail, AnimeId, AnimeRecord, CircularRelation, EdgeCaseReport, MultiMembership,
    OrphanReason, OrphanedAnime, PROPOSED_SERIES_PLACEHOLDER, RelationTypeIndex, SeriesGroup,
    SeriesRelation,
};

/// Which edges a closure may follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Reachability {
    /// Follow relations in both directions.
    #[default]
    Undirected,
    /// Follow only each record's own relations. A late record whose links
    /// reach an earlier series then collides with it instead of joining it.
    Outgoing,
}

/// Configuration for the series grouper.
#[derive(Debug, Clone)]
pub struct GroupingConfig {
    /// Edges a closure may follow.
    pub reachability: Reachability,
    /// Maximum slug length of a series id (before collision suffixes).
    pub slug_max_len: usize,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            reachability: Reachability::Undirected,
            slug_max_len: DEFAULT_SLUG_MAX_LEN,
        }
    }
}

impl GroupingConfig {
    /// Create a new grouping configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reachability mode.
    pub fn with_reachability(mut self, reachability: Reachability) -> Self {
        self.reachability = reachability;
        self
    }

    /// Set the maximum slug length (at least 1).
    pub fn with_slug_max_len(mut self, len: usize) -> Self {
        self.slug_max_len = len.max(1);
        self
    }
}

/// Passive report built alongside the grouper.
#[derive(Debug, Default)]
pub struct EdgeCaseCollector {
    report: EdgeCaseReport,
}

impl EdgeCaseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orphan(&mut self, record: &AnimeRecord, reason: OrphanReason) {
        debug!(anime_id = %record.id, %reason, "orphaned record");
        self.report.orphaned_anime.push(OrphanedAnime {
            anime_id: record.id.clone(),
            title: record.display_title(),
            reason,
        });
    }

    pub fn conflict(&mut self, record: &AnimeRecord, existing_series_id: &str) {
        debug!(anime_id = %record.id, existing_series_id, "record already belongs to a series");
        self.report.anime_in_multiple_series.push(MultiMembership {
            anime_id: record.id.clone(),
            title: record.display_title(),
            existing_series_id: existing_series_id.to_string(),
            proposed_series_id: PROPOSED_SERIES_PLACEHOLDER.to_string(),
        });
    }

    pub fn cycle(&mut self, path: Vec<AnimeId>) {
        let Some(anime_id) = path.first().cloned() else {
            return;
        };
        let cycle = CircularRelation { anime_id, path };
        debug!(chain = %cycle, "circular relation chain");
        self.report.circular_relations.push(cycle);
    }

    /// Drops orphan entries for records that a later group claimed.
    pub fn release_orphans(&mut self, members: &HashSet<AnimeId>) {
        self.report
            .orphaned_anime
            .retain(|orphan| !members.contains(&orphan.anime_id));
    }

    #[must_use]
    pub fn into_report(self) -> EdgeCaseReport {
        self.report
    }
}

/// Longest chain stored for one circular relation.
const MAX_CYCLE_PATH: usize = 64;

/// Result of a grouping run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupingOutcome {
    /// Finalized groups, in the order they were created.
    pub groups: Vec<SeriesGroup>,
    /// Orphans, conflicts and cycles met along the way.
    pub edge_cases: EdgeCaseReport,
}

/// Relation graph over the record set, one node per record in input order.
struct RecordGraph {
    graph: DiGraph<usize, ()>,
}

impl RecordGraph {
    fn build(records: &[AnimeRecord]) -> Self {
        let mut graph = DiGraph::with_capacity(records.len(), 0);
        let positions: HashMap<&AnimeId, NodeIndex> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (&r.id, graph.add_node(i)))
            .collect();

        for (i, record) in records.iter().enumerate() {
            let source = NodeIndex::new(i);
            for edge in &record.relations {
                match positions.get(&edge.target_id) {
                    Some(&target) if target != source => {
                        graph.update_edge(source, target, ());
                    }
                    Some(_) => {}
                    None => {
                        debug!(
                            anime_id = %record.id,
                            target_id = %edge.target_id,
                            "relation target not in record set"
                        );
                    }
                }
            }
        }

        Self { graph }
    }

    /// Neighbours in source order (petgraph iterates newest edge first).
    fn neighbors(&self, node: NodeIndex, reachability: Reachability) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        out.reverse();
        if reachability == Reachability::Undirected {
            let mut incoming: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .collect();
            incoming.reverse();
            for n in incoming {
                if !out.contains(&n) {
                    out.push(n);
                }
            }
        }
        out
    }

    fn has_incoming(&self, node: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .next()
            .is_some()
    }
}

/// Groups records into disjoint series.
#[derive(Debug, Clone, Default)]
pub struct SeriesGrouper {
    config: GroupingConfig,
}

impl SeriesGrouper {
    /// Create a new grouper with the given configuration.
    pub fn new(config: GroupingConfig) -> Self {
        Self { config }
    }

    /// Get the grouper configuration.
    pub fn config(&self) -> &GroupingConfig {
        &self.config
    }

    /// Groups `records` and attaches the resolved series id to each member.
    ///
    /// Records are processed in slice order, which decides which closure
    /// claims shared members first.
    ///
    /// # Errors
    ///
    /// Returns `TsunagiError::RegexError` if the slug allocator cannot be built.
    ///
    /// # Examples
    /// ```
    /// use tsunagi_core::{AnimeRecord, GroupingConfig, SeriesGrouper};
    ///
    /// let mut records = vec![
    ///     AnimeRecord::new(1).with_title("Bakemonogatari").with_relation(2, "SEQUEL"),
    ///     AnimeRecord::new(2).with_title("Nisemonogatari").with_relation(1, "PREQUEL"),
    /// ];
    /// let outcome = SeriesGrouper::new(GroupingConfig::default())
    ///     .group(&mut records)
    ///     .unwrap();
    ///
    /// assert_eq!(outcome.groups.len(), 1);
    /// assert_eq!(outcome.groups[0].series_id, "bakemonogatari");
    /// assert_eq!(records[1].series_id.as_deref(), Some("bakemonogatari"));
    /// ```
    pub fn group(&self, records: &mut [AnimeRecord]) -> Result<GroupingOutcome> {
        let resolver = NamingResolver::from_records(records.iter());
        let mut allocator = SeriesIdAllocator::new(self.config.slug_max_len)?;
        let graph = RecordGraph::build(records);
        let reachability = self.config.reachability;

        let mut collector = EdgeCaseCollector::new();
        let mut visited = vec![false; records.len()];
        let mut membership: Vec<Option<usize>> = vec![None; records.len()];
        let mut groups: Vec<SeriesGroup> = Vec::new();
        let mut loop_heads: HashSet<NodeIndex> = HashSet::new();

        for start in 0..records.len() {
            if visited[start] {
                continue;
            }
            let start_node = NodeIndex::new(start);

            let isolated = records[start].relations.is_empty()
                && (reachability == Reachability::Outgoing || !graph.has_incoming(start_node));
            if isolated {
                collector.orphan(&records[start], OrphanReason::NoRelations);
                visited[start] = true;
                continue;
            }

            let closure =
                self.closure(&graph, records, start_node, &mut loop_heads, &mut collector);

            if closure.len() == 1 {
                collector.orphan(&records[start], OrphanReason::NoReciprocalRelations);
                visited[start] = true;
                continue;
            }

            let conflicts: Vec<(usize, usize)> = closure
                .iter()
                .filter_map(|&i| membership[i].map(|g| (i, g)))
                .collect();

            if !conflicts.is_empty() {
                debug!(
                    anime_id = %records[start].id,
                    closure = closure.len(),
                    conflicts = conflicts.len(),
                    "candidate series rejected"
                );
                for (i, g) in conflicts {
                    collector.conflict(&records[i], &groups[g].series_id);
                }
                for &i in &closure {
                    visited[i] = true;
                }
                continue;
            }

            let member_ids: Vec<AnimeId> = closure.iter().map(|&i| records[i].id.clone()).collect();
            let series_name = resolver.resolve(&member_ids);
            let representative = resolver
                .representative(&member_ids)
                .cloned()
                .unwrap_or_else(|| records[start].id.clone());
            let series_id = allocator.allocate(&series_name, &representative);

            let group_index = groups.len();
            for &i in &closure {
                visited[i] = true;
                membership[i] = Some(group_index);
                records[i].series_id = Some(series_id.clone());
            }

            let group = build_group(records, &closure, series_id, series_name);
            collector.release_orphans(&group.anime_details.keys().cloned().collect());
            debug!(series_id = %group.series_id, members = group.len(), "series finalized");
            groups.push(group);
        }

        Ok(GroupingOutcome {
            groups,
            edge_cases: collector.into_report(),
        })
    }

    /// Iterative depth-first closure from `start`, reporting back edges
    /// onto the current path as circular chains.
    ///
    /// A loop is reported once per head (the ancestor it closes on) and its
    /// chain is capped at [`MAX_CYCLE_PATH`] ids, the head repeated last.
    fn closure(
        &self,
        graph: &RecordGraph,
        records: &[AnimeRecord],
        start: NodeIndex,
        loop_heads: &mut HashSet<NodeIndex>,
        collector: &mut EdgeCaseCollector,
    ) -> Vec<usize> {
        let mut order = Vec::new();
        let mut parent: HashMap<NodeIndex, Option<NodeIndex>> = HashMap::new();
        let mut stack: Vec<(NodeIndex, Option<NodeIndex>)> = vec![(start, None)];

        while let Some((node, from)) = stack.pop() {
            if parent.contains_key(&node) {
                continue;
            }
            parent.insert(node, from);
            order.push(node.index());

            let neighbors = graph.neighbors(node, self.config.reachability);
            for &next in neighbors.iter().rev() {
                if Some(next) == from {
                    continue;
                }
                if parent.contains_key(&next) {
                    if loop_heads.contains(&next) {
                        continue;
                    }
                    if let Some(mut path) = path_back_to(&parent, node, next) {
                        loop_heads.insert(next);
                        if path.len() > MAX_CYCLE_PATH {
                            path.truncate(MAX_CYCLE_PATH - 1);
                            path.push(next);
                        }
                        collector.cycle(path.iter().map(|n| records[n.index()].id.clone()).collect());
                    }
                } else {
                    stack.push((next, Some(node)));
                }
            }
        }

        order
    }
}

/// If `ancestor` lies on the tree path to `node`, returns the loop
/// `ancestor -> ... -> node -> ancestor`.
fn path_back_to(
    parent: &HashMap<NodeIndex, Option<NodeIndex>>,
    node: NodeIndex,
    ancestor: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    let mut chain = vec![node];
    let mut current = node;
    while let Some(&Some(up)) = parent.get(&current) {
        chain.push(up);
        if up == ancestor {
            chain.reverse();
            chain.push(ancestor);
            return Some(chain);
        }
        current = up;
    }
    None
}

fn build_group(
    records: &[AnimeRecord],
    closure: &[usize],
    series_id: String,
    series_name: String,
) -> SeriesGroup {
    let mut members: Vec<usize> = closure.to_vec();
    members.sort_by(|&a, &b| records[a].id.cmp(&records[b].id));

    let member_set: HashSet<&AnimeId> = members.iter().map(|&i| &records[i].id).collect();
    let mut anime_details = BTreeMap::new();
    let mut relations = Vec::new();
    let mut seen = HashSet::new();
    let mut relation_types = RelationTypeIndex::new();

    for &i in &members {
        let record = &records[i];
        anime_details.insert(
            record.id.clone(),
            AnimeDetail {
                id: record.id.clone(),
                title: record.display_title(),
            },
        );

        for edge in &record.relations {
            if !member_set.contains(&edge.target_id) {
                continue;
            }
            let relation = SeriesRelation::new(
                record.id.clone(),
                edge.target_id.clone(),
                edge.relation_type.clone(),
            );
            if !seen.insert(relation.dedup_key()) {
                continue;
            }
            relation_types.insert(&relation.relation_type, relation.index_key());
            relations.push(relation);
        }
    }

    SeriesGroup {
        series_id,
        series_name,
        anime_ids: members.iter().map(|&i| records[i].id.clone()).collect(),
        anime_details,
        relations,
        relation_types,
    }
}
