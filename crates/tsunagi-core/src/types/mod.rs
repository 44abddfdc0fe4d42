pub mod edge_case;
pub mod id;
pub mod record;
pub mod relation;
pub mod series;
pub mod split;

pub use edge_case::{
    CircularRelation, EdgeCaseReport, MultiMembership, OrphanReason, OrphanedAnime,
    PROPOSED_SERIES_PLACEHOLDER,
};
pub use id::AnimeId;
pub use record::{AnimeRecord, LoadedRecords, SERIES_ID_KEY, load_records};
pub use relation::{
    RelationCategory, RelationEdge, SeriesRelation, UNKNOWN_RELATION, normalize_relation_type,
};
pub use series::{AnimeDetail, RelationTypeIndex, SeriesGroup};
pub use split::{AdvancedSplit, ClusterCategory, ExternalReferences, SplitCluster};
