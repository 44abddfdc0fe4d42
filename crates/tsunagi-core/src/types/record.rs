use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::warn;

use super::id::AnimeId;
use super::relation::RelationEdge;
use crate::error::{Result, TsunagiError};
use crate::normalize::RelationNormalizer;

const ID_KEYS: &[&str] = &["id", "animeId", "anime_id"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const ROMAJI_KEYS: &[&str] = &["title_romaji", "titleRomaji", "romaji"];
const DATE_KEYS: &[&str] = &["release_date", "releaseDate", "start_date", "startDate", "aired"];
const RELATIONS_KEY: &str = "relations";

/// Key attached to write-back records once a series is resolved.
pub const SERIES_ID_KEY: &str = "seriesId";

/// One anime entity with its titles and canonical relation edges.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimeRecord {
    /// Record identifier.
    pub id: AnimeId,

    /// Plain title.
    pub title: Option<String>,

    /// Romanized title, preferred for display.
    pub title_romaji: Option<String>,

    /// Release date as found in the source (parsed lazily when ordering).
    pub release_date: Option<String>,

    /// Canonical outgoing relations, in source order.
    pub relations: Vec<RelationEdge>,

    /// Series resolved by the grouper, if any.
    pub series_id: Option<String>,

    /// The original object, kept for write-back.
    source: Map<String, Value>,
}

impl AnimeRecord {
    /// Creates a bare record with no titles and no relations.
    #[must_use]
    pub fn new(id: impl Into<AnimeId>) -> Self {
        let id = id.into();
        let mut source = Map::new();
        source.insert(ID_KEYS[0].to_string(), serde_json::to_value(&id).unwrap_or(Value::Null));
        Self {
            id,
            title: None,
            title_romaji: None,
            release_date: None,
            relations: Vec::new(),
            series_id: None,
            source,
        }
    }

    /// Sets the plain title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.source
            .insert(TITLE_KEYS[0].to_string(), Value::String(title.clone()));
        self.title = Some(title);
        self
    }

    /// Sets the romanized title.
    #[must_use]
    pub fn with_romaji(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.source
            .insert(ROMAJI_KEYS[0].to_string(), Value::String(title.clone()));
        self.title_romaji = Some(title);
        self
    }

    /// Sets the release date.
    #[must_use]
    pub fn with_release_date(mut self, date: impl Into<String>) -> Self {
        let date = date.into();
        self.source
            .insert(DATE_KEYS[0].to_string(), Value::String(date.clone()));
        self.release_date = Some(date);
        self
    }

    /// Appends a relation edge.
    #[must_use]
    pub fn with_relation(mut self, target: impl Into<AnimeId>, relation_type: &str) -> Self {
        self.relations.push(RelationEdge::new(target, relation_type));
        self
    }

    /// Best available display title: romaji, then title, then `Series {id}`.
    #[must_use]
    pub fn display_title(&self) -> String {
        self.title_romaji
            .as_deref()
            .or(self.title.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Series {}", self.id))
    }

    /// Builds a record from a raw JSON object.
    ///
    /// Coercion is best-effort: only a usable id is required. Relation
    /// problems are logged and the offending elements dropped.
    ///
    /// # Errors
    ///
    /// Returns `TsunagiError::InvalidRecord` if `value` is not an object or has
    /// no usable id.
    pub fn from_json(index: usize, value: &Value, normalizer: &RelationNormalizer) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(TsunagiError::InvalidRecord {
                index,
                reason: "record is not an object".into(),
            });
        };

        let id = ID_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|v| serde_json::from_value::<AnimeId>(v.clone()).ok())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TsunagiError::InvalidRecord {
                index,
                reason: "missing id".into(),
            })?;

        let (title, nested_romaji) = match first_of(map, TITLE_KEYS) {
            Some(Value::Object(titles)) => (
                ["english", "userPreferred", "native", "romaji"]
                    .iter()
                    .find_map(|k| text(titles.get(*k))),
                text(titles.get("romaji")),
            ),
            other => (text(other), None),
        };
        let title_romaji = text(first_of(map, ROMAJI_KEYS)).or(nested_romaji);
        let release_date = first_of(map, DATE_KEYS).and_then(date_text);

        let normalized = normalizer.normalize(map.get(RELATIONS_KEY));
        for issue in &normalized.issues {
            warn!(anime_id = %id, "{issue}; continuing with recovered relations");
        }

        Ok(Self {
            id,
            title,
            title_romaji,
            release_date,
            relations: normalized.edges,
            series_id: None,
            source: map.clone(),
        })
    }

    /// The original object, augmented with the resolved series id.
    #[must_use]
    pub fn to_updated_json(&self) -> Value {
        let mut out = self.source.clone();
        match &self.series_id {
            Some(series_id) => {
                out.insert(SERIES_ID_KEY.to_string(), Value::String(series_id.clone()));
            }
            None => {
                out.remove(SERIES_ID_KEY);
            }
        }
        Value::Object(out)
    }
}

fn first_of<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|v| !v.is_null())
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerces a date field: plain text, a bare year, or `{year, month, day}`.
fn date_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(parts) => {
            let part = |key: &str| parts.get(key).and_then(Value::as_u64);
            let year = part("year")?;
            Some(match (part("month"), part("day")) {
                (Some(m), Some(d)) => format!("{year:04}-{m:02}-{d:02}"),
                (Some(m), None) => format!("{year:04}-{m:02}"),
                _ => format!("{year:04}"),
            })
        }
        other => text(Some(other)),
    }
}

/// Records coerced from a raw batch, plus what had to be skipped.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    /// Usable records, in input order, first occurrence of each id.
    pub records: Vec<AnimeRecord>,
    /// Input index of each entry in `records`.
    pub positions: Vec<usize>,
    /// Entries that could not be turned into records.
    pub skipped: Vec<TsunagiError>,
    /// Ids that appeared more than once (later copies dropped).
    pub duplicates: Vec<AnimeId>,
}

/// Coerces a JSON array of record objects.
///
/// # Errors
///
/// Returns `TsunagiError::NotARecordList` if `value` is not an array.
pub fn load_records(value: &Value, normalizer: &RelationNormalizer) -> Result<LoadedRecords> {
    let Value::Array(items) = value else {
        return Err(TsunagiError::NotARecordList {
            found: match value {
                Value::Object(_) => "object",
                Value::String(_) => "string",
                Value::Number(_) => "number",
                Value::Bool(_) => "boolean",
                _ => "null",
            },
        });
    };

    let mut loaded = LoadedRecords::default();
    let mut seen = HashSet::new();

    for (index, item) in items.iter().enumerate() {
        match AnimeRecord::from_json(index, item, normalizer) {
            Ok(record) => {
                if seen.insert(record.id.clone()) {
                    loaded.records.push(record);
                    loaded.positions.push(index);
                } else {
                    warn!(anime_id = %record.id, "duplicate record id, keeping first occurrence");
                    loaded.duplicates.push(record.id);
                }
            }
            Err(e) => {
                warn!("skipping record: {e}");
                loaded.skipped.push(e);
            }
        }
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(value: Value) -> AnimeRecord {
        AnimeRecord::from_json(0, &value, &RelationNormalizer::new()).unwrap()
    }

    #[test]
    fn display_title_prefers_romaji() {
        let record = AnimeRecord::new(1).with_title("Attack on Titan");
        assert_eq!(record.display_title(), "Attack on Titan");

        let record = record.with_romaji("Shingeki no Kyojin");
        assert_eq!(record.display_title(), "Shingeki no Kyojin");

        assert_eq!(AnimeRecord::new(9).display_title(), "Series 9");
    }

    #[test]
    fn from_json_reads_flat_fields() {
        let record = load(json!({
            "id": 1,
            "title": "Cowboy Bebop",
            "title_romaji": "Cowboy Bebop",
            "start_date": "1998-04-03",
            "relations": [{"targetAnimeId": 5, "relationType": "SIDE_STORY"}],
        }));
        assert_eq!(record.id, AnimeId::from(1));
        assert_eq!(record.release_date.as_deref(), Some("1998-04-03"));
        assert_eq!(record.relations, vec![RelationEdge::new(5, "SIDE_STORY")]);
    }

    #[test]
    fn from_json_reads_nested_title_and_date_objects() {
        let record = load(json!({
            "id": "21",
            "title": {"romaji": "One Piece", "english": "One Piece (EN)"},
            "startDate": {"year": 1999, "month": 10, "day": 20},
        }));
        assert_eq!(record.title.as_deref(), Some("One Piece (EN)"));
        assert_eq!(record.title_romaji.as_deref(), Some("One Piece"));
        assert_eq!(record.release_date.as_deref(), Some("1999-10-20"));
        assert!(record.relations.is_empty());
    }

    #[test]
    fn malformed_relations_do_not_reject_the_record() {
        let record = load(json!({"id": 3, "relations": "{{broken"}));
        assert!(record.relations.is_empty());
    }

    #[test]
    fn missing_id_is_invalid() {
        let err = AnimeRecord::from_json(2, &json!({"title": "x"}), &RelationNormalizer::new())
            .unwrap_err();
        assert!(matches!(err, TsunagiError::InvalidRecord { index: 2, .. }));
    }

    #[test]
    fn updated_json_keeps_original_fields() {
        let mut record = load(json!({"id": 4, "title": "Mushishi", "score": 88}));
        record.series_id = Some("mushishi".into());
        let updated = record.to_updated_json();
        assert_eq!(updated["score"], json!(88));
        assert_eq!(updated["seriesId"], json!("mushishi"));

        record.series_id = None;
        assert!(record.to_updated_json().get("seriesId").is_none());
    }

    #[test]
    fn load_records_skips_bad_entries_and_duplicates() {
        let loaded = load_records(
            &json!([{"id": 1}, {"title": "no id"}, {"id": 1, "title": "dup"}, {"id": 2}]),
            &RelationNormalizer::new(),
        )
        .unwrap();
        let ids: Vec<_> = loaded.records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![AnimeId::from(1), AnimeId::from(2)]);
        assert_eq!(loaded.positions, vec![0, 3]);
        assert_eq!(loaded.skipped.len(), 1);
        assert_eq!(loaded.duplicates, vec![AnimeId::from(1)]);
    }

    #[test]
    fn load_records_requires_an_array() {
        let err = load_records(&json!({"id": 1}), &RelationNormalizer::new()).unwrap_err();
        assert!(matches!(err, TsunagiError::NotARecordList { found: "object" }));
    }
}
