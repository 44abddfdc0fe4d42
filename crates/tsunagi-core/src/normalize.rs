//! # Relation Normalizer
//!
//! Coerces the many shapes a `relations` field shows up in (JSON text,
//! native lists, GraphQL connection wrappers, bare ids) into one canonical
//! list of [`RelationEdge`]s. Nothing in here fails: input that cannot be
//! understood is dropped and reported as a [`RelationIssue`].

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::types::{AnimeId, RelationEdge, UNKNOWN_RELATION};

/// Keys that carry the target id directly on a relation object.
const TARGET_KEY: &str = "targetAnimeId";
const ID_KEY: &str = "id";

/// Wrapper keys that carry the target one level down.
const NESTED_KEYS: &[&str] = &["node", "target", "media"];

/// Keys that carry the relation tag, in lookup order.
const TYPE_KEYS: &[&str] = &["relationType", "type", "relation_type"];

/// Keys of a connection wrapper around the actual list.
const LIST_KEYS: &[&str] = &["edges", "nodes"];

/// The element shapes the normalizer understands.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationShape<'a> {
    /// A bare id (string or number): an `UNKNOWN`-typed edge.
    BareId(AnimeId),
    /// An object exposing the target directly (`targetAnimeId` or `id`).
    TargetField {
        target: AnimeId,
        relation_type: Option<&'a Value>,
    },
    /// An object wrapping the target one level down (`node.id`, ...).
    NestedNode {
        target: AnimeId,
        relation_type: Option<&'a Value>,
    },
    /// Anything else.
    Unrecognized,
}

impl<'a> RelationShape<'a> {
    /// Matches a single relation element against the accepted shapes.
    ///
    /// A nested node takes precedence over a plain `id`: on connection
    /// edges the outer `id` names the edge, not the related record.
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(_) | Value::Number(_) => match target_from_value(value) {
                Some(id) => Self::BareId(id),
                None => Self::Unrecognized,
            },
            Value::Object(map) => {
                let relation_type = TYPE_KEYS.iter().find_map(|key| map.get(*key));

                if let Some(target) = map.get(TARGET_KEY).and_then(target_from_value) {
                    return Self::TargetField {
                        target,
                        relation_type,
                    };
                }

                let nested = NESTED_KEYS
                    .iter()
                    .filter_map(|key| map.get(*key))
                    .find_map(nested_target);
                if let Some(target) = nested {
                    return Self::NestedNode {
                        target,
                        relation_type,
                    };
                }

                match map.get(ID_KEY).and_then(target_from_value) {
                    Some(target) => Self::TargetField {
                        target,
                        relation_type,
                    },
                    None => Self::Unrecognized,
                }
            }
            _ => Self::Unrecognized,
        }
    }

    /// Converts the matched shape into a canonical edge.
    pub fn into_edge(self) -> Option<RelationEdge> {
        match self {
            Self::BareId(target) => Some(RelationEdge::new(target, UNKNOWN_RELATION)),
            Self::TargetField {
                target,
                relation_type,
            }
            | Self::NestedNode {
                target,
                relation_type,
            } => {
                let tag = relation_type.and_then(Value::as_str).unwrap_or("");
                Some(RelationEdge::new(target, tag))
            }
            Self::Unrecognized => None,
        }
    }
}

/// Reads an id out of a scalar JSON value.
fn target_from_value(value: &Value) -> Option<AnimeId> {
    match value {
        Value::String(s) => {
            let id = AnimeId::new(s);
            (!id.is_empty()).then_some(id)
        }
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(AnimeId::from(u))
            } else if let Some(i) = n.as_i64() {
                Some(AnimeId::from(i))
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| AnimeId::from(f as u64))
            }
        }
        _ => None,
    }
}

/// Reads the target out of a wrapper value (`{"id": 5}` or a bare id).
fn nested_target(value: &Value) -> Option<AnimeId> {
    match value {
        Value::Object(inner) => inner
            .get(TARGET_KEY)
            .or_else(|| inner.get(ID_KEY))
            .and_then(target_from_value),
        other => target_from_value(other),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Something the normalizer had to drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationIssue {
    /// The field was a string that does not parse as JSON.
    MalformedJson {
        /// Parser error message.
        message: String,
    },
    /// An element matched none of the accepted shapes.
    UnrecognizedElement {
        /// Position of the element in the relation list.
        position: usize,
        /// JSON type of the element.
        found: &'static str,
    },
}

impl fmt::Display for RelationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedJson { message } => write!(f, "malformed relations JSON: {message}"),
            Self::UnrecognizedElement { position, found } => {
                write!(f, "unrecognized relation element #{position} ({found})")
            }
        }
    }
}

/// Output of [`RelationNormalizer::normalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRelations {
    /// Canonical edges, in source order.
    pub edges: Vec<RelationEdge>,
    /// Elements or payloads that were dropped.
    pub issues: Vec<RelationIssue>,
}

impl NormalizedRelations {
    /// Returns `true` if nothing was dropped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Canonicalizes raw relation payloads.
#[derive(Debug, Clone, Default)]
pub struct RelationNormalizer;

impl RelationNormalizer {
    /// Create a new normalizer instance.
    pub fn new() -> Self {
        Self
    }

    /// Normalizes a raw `relations` value; `None` means the field was absent.
    ///
    /// # Examples
    /// ```
    /// use serde_json::json;
    /// use tsunagi_core::normalize::RelationNormalizer;
    ///
    /// let raw = json!([{"targetAnimeId": 2, "relationType": "sequel"}, 3]);
    /// let normalized = RelationNormalizer::new().normalize(Some(&raw));
    ///
    /// assert_eq!(normalized.edges.len(), 2);
    /// assert_eq!(normalized.edges[0].relation_type, "SEQUEL");
    /// assert_eq!(normalized.edges[1].relation_type, "UNKNOWN");
    /// ```
    pub fn normalize(&self, raw: Option<&Value>) -> NormalizedRelations {
        let mut out = NormalizedRelations::default();
        let Some(raw) = raw else {
            return out;
        };

        match raw {
            Value::String(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return out;
                }
                match serde_json::from_str::<Value>(text) {
                    Ok(parsed) => self.normalize_value(&parsed, &mut out),
                    Err(e) => {
                        debug!(error = %e, "relations field is not valid JSON");
                        out.issues.push(RelationIssue::MalformedJson {
                            message: e.to_string(),
                        });
                    }
                }
            }
            other => self.normalize_value(other, &mut out),
        }

        out
    }

    fn normalize_value(&self, value: &Value, out: &mut NormalizedRelations) {
        match value {
            Value::Null => {}
            Value::Array(items) => self.normalize_list(items, out),
            Value::Object(map) => {
                let wrapped = LIST_KEYS
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_array));
                match wrapped {
                    Some(items) => self.normalize_list(items, out),
                    None => self.normalize_list(std::slice::from_ref(value), out),
                }
            }
            scalar => self.normalize_list(std::slice::from_ref(scalar), out),
        }
    }

    fn normalize_list(&self, items: &[Value], out: &mut NormalizedRelations) {
        for (position, item) in items.iter().enumerate() {
            match RelationShape::classify(item).into_edge() {
                Some(edge) => out.edges.push(edge),
                None => out.issues.push(RelationIssue::UnrecognizedElement {
                    position,
                    found: json_type_name(item),
                }),
            }
        }
    }
}
