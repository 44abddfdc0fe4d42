use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::AnimeId;

/// Relation type used when the source data carries none.
pub const UNKNOWN_RELATION: &str = "UNKNOWN";

/// A directed, typed link from one record to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationEdge {
    /// Record the relation points at.
    pub target_id: AnimeId,
    /// Upper-case relation tag (e.g. `SEQUEL`, `CHARACTER`).
    pub relation_type: String,
}

impl RelationEdge {
    /// Creates an edge, normalizing the relation tag.
    pub fn new(target_id: impl Into<AnimeId>, relation_type: &str) -> Self {
        Self {
            target_id: target_id.into(),
            relation_type: normalize_relation_type(relation_type),
        }
    }

    /// Returns the category the relation tag falls into.
    #[must_use]
    pub fn category(&self) -> RelationCategory {
        RelationCategory::from_tag(&self.relation_type)
    }
}

/// Upper-cases a relation tag and folds whitespace and `-` runs into `_`.
///
/// Empty tags become [`UNKNOWN_RELATION`].
#[must_use]
pub fn normalize_relation_type(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.trim().chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            pending_sep = !out.is_empty();
            continue;
        }
        if pending_sep {
            out.push('_');
            pending_sep = false;
        }
        out.extend(c.to_uppercase());
    }
    if out.is_empty() {
        UNKNOWN_RELATION.to_string()
    } else {
        out
    }
}

/// A relation between two members of a series, as stored in output documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRelation {
    pub source_id: AnimeId,
    pub target_id: AnimeId,
    pub relation_type: String,
}

impl SeriesRelation {
    pub fn new(source_id: AnimeId, target_id: AnimeId, relation_type: impl Into<String>) -> Self {
        Self {
            source_id,
            target_id,
            relation_type: relation_type.into(),
        }
    }

    #[must_use]
    pub fn category(&self) -> RelationCategory {
        RelationCategory::from_tag(&self.relation_type)
    }

    /// `source->target` key used by the relation-type index.
    #[must_use]
    pub fn index_key(&self) -> String {
        format!("{}->{}", self.source_id, self.target_id)
    }

    /// `source-target-type` key used to deduplicate cluster relations.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!("{}-{}-{}", self.source_id, self.target_id, self.relation_type)
    }

    /// Returns the endpoint opposite to `id`, if `id` is an endpoint.
    #[must_use]
    pub fn other_end(&self, id: &AnimeId) -> Option<&AnimeId> {
        if &self.source_id == id {
            Some(&self.target_id)
        } else if &self.target_id == id {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

/// Semantic bucket of a relation tag.
///
/// Everything that is not one of the soft categories defines continuity
/// (sequels, prequels, side stories, summaries, alternatives...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationCategory {
    Structural,
    Character,
    Adaptation,
    SpinOff,
    Other,
    Parent,
}

impl RelationCategory {
    /// Classifies a normalized relation tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "CHARACTER" => Self::Character,
            "ADAPTATION" => Self::Adaptation,
            "SPIN_OFF" => Self::SpinOff,
            "OTHER" => Self::Other,
            "PARENT" => Self::Parent,
            _ => Self::Structural,
        }
    }

    /// Returns `true` for the cross-cutting categories.
    #[must_use]
    pub fn is_soft(self) -> bool {
        !matches!(self, Self::Structural)
    }
}

impl fmt::Display for RelationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural => write!(f, "STRUCTURAL"),
            Self::Character => write!(f, "CHARACTER"),
            Self::Adaptation => write!(f, "ADAPTATION"),
            Self::SpinOff => write!(f, "SPIN_OFF"),
            Self::Other => write!(f, "OTHER"),
            Self::Parent => write!(f, "PARENT"),
        }
    }
}
