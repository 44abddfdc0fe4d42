use std::cmp::Ordering;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque identifier of an anime record.
///
/// Ids arrive as JSON numbers or strings depending on the upstream export.
/// Both forms are kept as text; numeric ids compare numerically so that
/// `"9" < "10"`, and numeric ids sort ahead of non-numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnimeId(String);

impl AnimeId {
    /// Creates an id from its textual form, trimming surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    /// Returns the textual form of the id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id is empty after trimming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the numeric value of an all-digit id.
    #[must_use]
    pub fn numeric(&self) -> Option<u64> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }

    /// Numeric value only when the text is its canonical decimal form,
    /// so that serializing as a number does not change the id.
    fn canonical_numeric(&self) -> Option<u64> {
        let n = self.numeric()?;
        (self.0 == n.to_string()).then_some(n)
    }
}

impl Ord for AnimeId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for AnimeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AnimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for AnimeId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for AnimeId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<i32> for AnimeId {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for AnimeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AnimeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for AnimeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.canonical_numeric() {
            Some(n) => serializer.serialize_u64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

struct AnimeIdVisitor;

impl Visitor<'_> for AnimeIdVisitor {
    type Value = AnimeId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an anime id as a string or an integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<AnimeId, E> {
        Ok(AnimeId::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<AnimeId, E> {
        Ok(AnimeId::new(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<AnimeId, E> {
        if v.fract() == 0.0 && v >= 0.0 && v <= u64::MAX as f64 {
            Ok(AnimeId::from(v as u64))
        } else {
            Err(E::invalid_value(de::Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<AnimeId, E> {
        Ok(AnimeId::new(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<AnimeId, E> {
        Ok(AnimeId::new(v))
    }
}

impl<'de> Deserialize<'de> for AnimeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AnimeIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_order_numerically() {
        let mut ids: Vec<AnimeId> = ["10", "9", "abc", "100", "2"]
            .into_iter()
            .map(AnimeId::from)
            .collect();
        ids.sort();
        let ordered: Vec<&str> = ids.iter().map(AnimeId::as_str).collect();
        assert_eq!(ordered, vec!["2", "9", "10", "100", "abc"]);
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(AnimeId::new("  42 "), AnimeId::from(42));
        assert!(AnimeId::new("   ").is_empty());
    }

    #[test]
    fn numeric_requires_digits_only() {
        assert_eq!(AnimeId::from("123").numeric(), Some(123));
        assert_eq!(AnimeId::from("+5").numeric(), None);
        assert_eq!(AnimeId::from("a1").numeric(), None);
    }

    #[test]
    fn serializes_numbers_as_json_numbers() {
        assert_eq!(serde_json::to_string(&AnimeId::from(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&AnimeId::from("007")).unwrap(), "\"007\"");
        assert_eq!(serde_json::to_string(&AnimeId::from("x-1")).unwrap(), "\"x-1\"");
    }

    #[test]
    fn deserializes_from_number_or_string() {
        let a: AnimeId = serde_json::from_str("21").unwrap();
        let b: AnimeId = serde_json::from_str("\"21\"").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn works_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(AnimeId::from(5), "five");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"5":"five"}"#);

        let back: std::collections::BTreeMap<AnimeId, String> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&AnimeId::from(5)).map(String::as_str), Some("five"));
    }
}
