//! # Tsunagi Core
//!
//! The graph engine behind Tsunagi. Groups anime records into series by
//! following their relation links, reports the edge cases met on the way
//! (multi-membership conflicts, orphans, cycles) and splits each series into
//! a continuity part and soft clusters by relation semantics.
//!
//! ## Quick Start
//!
//! ```rust
//! use tsunagi_core::{AnimeRecord, GroupingConfig, NamingResolver, SeriesGrouper, SeriesSplitter};
//!
//! let mut records = vec![
//!     AnimeRecord::new(1).with_romaji("Shingeki no Kyojin").with_relation(2, "SEQUEL"),
//!     AnimeRecord::new(2).with_relation(1, "PREQUEL").with_relation(3, "SPIN_OFF"),
//!     AnimeRecord::new(3).with_relation(2, "SPIN_OFF"),
//! ];
//!
//! let outcome = SeriesGrouper::new(GroupingConfig::default()).group(&mut records).unwrap();
//! assert_eq!(outcome.groups.len(), 1);
//! assert_eq!(outcome.groups[0].series_id, "shingeki-no-kyojin");
//!
//! let resolver = NamingResolver::from_records(&records);
//! let split = SeriesSplitter::new(&resolver).split(&outcome.groups);
//! assert_eq!(split.main.len(), 1);
//! assert_eq!(split.main[0].anime_ids.len(), 2);
//! ```
pub mod error;
pub mod graph;
pub mod grouper;
pub mod naming;
pub mod normalize;
pub mod splitter;
pub mod types;

// Re-export primary API
pub use error::{Result, TsunagiError};
pub use graph::ComponentGraph;
pub use grouper::{EdgeCaseCollector, GroupingConfig, GroupingOutcome, Reachability, SeriesGrouper};
pub use naming::{DEFAULT_SLUG_MAX_LEN, NamingResolver, SeriesIdAllocator, parse_release_date};
pub use normalize::{NormalizedRelations, RelationIssue, RelationNormalizer, RelationShape};
pub use splitter::SeriesSplitter;
pub use types::{
    AdvancedSplit, AnimeDetail, AnimeId, AnimeRecord, CircularRelation, ClusterCategory,
    EdgeCaseReport, ExternalReferences, LoadedRecords, MultiMembership, OrphanReason,
    OrphanedAnime, RelationCategory, RelationEdge, RelationTypeIndex, SeriesGroup,
    SeriesRelation, SplitCluster, load_records,
};
