//! # Naming
//!
//! Deterministic naming for series and clusters: the representative-title
//! picker shared by the grouper and the splitter, and the slug allocator
//! that turns a title into a unique series id.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use regex::Regex;

use crate::error::Result;
use crate::types::{AnimeId, AnimeRecord};

/// Default maximum length of a series id slug.
pub const DEFAULT_SLUG_MAX_LEN: usize = 50;

/// Parses a release date in any of the shapes seen in exports.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, timestamps starting with a
/// `YYYY-MM-DD` date (RFC 3339 and friends), `YYYY-MM` and `YYYY`. Partial
/// dates resolve to the first day of the period.
#[must_use]
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    if raw.len() > 10 && raw.is_char_boundary(10) {
        if let Ok(date) = NaiveDate::parse_from_str(&raw[..10], "%Y-%m-%d") {
            return Some(date);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return Some(date);
    }

    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1));
    }

    None
}

#[derive(Debug, Clone)]
struct NameEntry {
    name: String,
    release: Option<NaiveDate>,
}

/// Picks the representative title of a set of records.
///
/// The earliest release wins when both candidates under comparison have a
/// parseable date; otherwise the lower id wins. The winner's romanized title
/// is used if present, else its plain title, else `Series {id}`.
#[derive(Debug, Clone, Default)]
pub struct NamingResolver {
    entries: HashMap<AnimeId, NameEntry>,
}

impl NamingResolver {
    /// Builds a resolver over the given records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AnimeRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|record| {
                let entry = NameEntry {
                    name: record.display_title(),
                    release: record.release_date.as_deref().and_then(parse_release_date),
                };
                (record.id.clone(), entry)
            })
            .collect();
        Self { entries }
    }

    /// Best available title of one record.
    #[must_use]
    pub fn name_of(&self, id: &AnimeId) -> String {
        self.entries
            .get(id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| format!("Series {id}"))
    }

    fn release_of(&self, id: &AnimeId) -> Option<NaiveDate> {
        self.entries.get(id).and_then(|e| e.release)
    }

    fn compare(&self, a: &AnimeId, b: &AnimeId) -> Ordering {
        match (self.release_of(a), self.release_of(b)) {
            (Some(da), Some(db)) if da != db => da.cmp(&db),
            _ => a.cmp(b),
        }
    }

    /// Returns the member that names the set.
    ///
    /// Candidates are pre-sorted by id and reduced in one pass, so the pick
    /// does not depend on the order members are handed in.
    pub fn representative<'a>(
        &self,
        members: impl IntoIterator<Item = &'a AnimeId>,
    ) -> Option<&'a AnimeId> {
        let mut candidates: Vec<&AnimeId> = members.into_iter().collect();
        candidates.sort();
        candidates.dedup();

        let mut iter = candidates.into_iter();
        let first = iter.next()?;
        Some(iter.fold(first, |best, candidate| {
            if self.compare(candidate, best) == Ordering::Less {
                candidate
            } else {
                best
            }
        }))
    }

    /// Representative title of a member set.
    ///
    /// # Examples
    /// ```
    /// use tsunagi_core::{AnimeId, AnimeRecord, NamingResolver};
    ///
    /// let records = vec![
    ///     AnimeRecord::new(2).with_title("Movie").with_release_date("2010-05-01"),
    ///     AnimeRecord::new(7).with_romaji("Original").with_release_date("2004-01-10"),
    /// ];
    /// let resolver = NamingResolver::from_records(&records);
    /// let members = [AnimeId::from(2), AnimeId::from(7)];
    ///
    /// assert_eq!(resolver.resolve(&members), "Original");
    /// ```
    pub fn resolve<'a>(&self, members: impl IntoIterator<Item = &'a AnimeId>) -> String {
        match self.representative(members) {
            Some(id) => self.name_of(id),
            None => "Unnamed Series".to_string(),
        }
    }
}

/// Allocates unique, title-derived series ids.
#[derive(Debug)]
pub struct SeriesIdAllocator {
    re_separator: Regex,
    max_len: usize,
    used: HashSet<String>,
}

impl SeriesIdAllocator {
    /// Constructs an allocator producing slugs of at most `max_len` characters
    /// (before any collision suffix).
    ///
    /// # Errors
    ///
    /// Returns `TsunagiError::RegexError` if the separator pattern fails to
    /// compile (should never happen with the static pattern defined here).
    pub fn new(max_len: usize) -> Result<Self> {
        Ok(Self {
            re_separator: Regex::new(r"[^a-z0-9]+")?,
            max_len: max_len.max(1),
            used: HashSet::new(),
        })
    }

    /// Lower-cases `title`, collapses non-alphanumeric runs into `-` and
    /// truncates the result.
    #[must_use]
    pub fn slugify(&self, title: &str) -> String {
        let lowered = title.to_lowercase();
        let collapsed = self.re_separator.replace_all(&lowered, "-");
        let trimmed = collapsed.trim_matches('-');
        let truncated: String = trimmed.chars().take(self.max_len).collect();
        truncated.trim_end_matches('-').to_string()
    }

    /// Returns a fresh id for `title`, suffixing `-2`, `-3`, ... on collision.
    ///
    /// Titles that slug to nothing (e.g. non-Latin scripts) fall back to
    /// `series-<id>`.
    pub fn allocate(&mut self, title: &str, fallback_id: &AnimeId) -> String {
        let mut base = self.slugify(title);
        if base.is_empty() {
            let id_slug = self.slugify(fallback_id.as_str());
            base = if id_slug.is_empty() {
                "series".to_string()
            } else {
                format!("series-{id_slug}")
            };
        }

        let mut candidate = base.clone();
        let mut suffix = 2usize;
        while self.used.contains(&candidate) {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }

    /// Returns `true` if `id` has already been handed out.
    #[must_use]
    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<AnimeId> {
        raw.iter().copied().map(AnimeId::from).collect()
    }

    #[test]
    fn release_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2013, 4, 7);
        assert_eq!(parse_release_date("2013-04-07"), expected);
        assert_eq!(parse_release_date("2013/04/07"), expected);
        assert_eq!(parse_release_date("2013-04-07T00:00:00+09:00"), expected);
        assert_eq!(parse_release_date("2013-04"), NaiveDate::from_ymd_opt(2013, 4, 1));
        assert_eq!(parse_release_date("2013"), NaiveDate::from_ymd_opt(2013, 1, 1));
        assert_eq!(parse_release_date("spring 2013"), None);
        assert_eq!(parse_release_date(""), None);
    }

    #[test]
    fn earliest_release_wins() {
        let records = vec![
            AnimeRecord::new(1).with_title("Later").with_release_date("2015-01-01"),
            AnimeRecord::new(2).with_title("Earlier").with_release_date("2009-01-01"),
        ];
        let resolver = NamingResolver::from_records(&records);
        assert_eq!(resolver.resolve(&ids(&[1, 2])), "Earlier");
    }

    #[test]
    fn falls_back_to_lowest_id_without_dates() {
        let records = vec![
            AnimeRecord::new(10).with_title("Ten"),
            AnimeRecord::new(9).with_title("Nine").with_release_date("2001-01-01"),
        ];
        let resolver = NamingResolver::from_records(&records);
        assert_eq!(resolver.resolve(&ids(&[10, 9])), "Nine");
    }

    #[test]
    fn unparseable_dates_compare_by_id() {
        let records = vec![
            AnimeRecord::new(3).with_title("Three").with_release_date("TBA"),
            AnimeRecord::new(4).with_title("Four").with_release_date("1990-01-01"),
        ];
        let resolver = NamingResolver::from_records(&records);
        assert_eq!(resolver.resolve(&ids(&[4, 3])), "Three");
    }

    #[test]
    fn same_date_breaks_tie_by_id() {
        let records = vec![
            AnimeRecord::new(8).with_title("Eight").with_release_date("2020-01-01"),
            AnimeRecord::new(5).with_title("Five").with_release_date("2020-01-01"),
        ];
        let resolver = NamingResolver::from_records(&records);
        assert_eq!(resolver.resolve(&ids(&[8, 5])), "Five");
    }

    #[test]
    fn pick_is_independent_of_member_order() {
        let records = vec![
            AnimeRecord::new(1),
            AnimeRecord::new(2).with_release_date("2000-01-01"),
            AnimeRecord::new(3).with_release_date("1995-01-01"),
        ];
        let resolver = NamingResolver::from_records(&records);
        let forward = resolver.resolve(&ids(&[1, 2, 3]));
        let backward = resolver.resolve(&ids(&[3, 2, 1]));
        assert_eq!(forward, backward);
    }

    #[test]
    fn unknown_members_get_placeholder_names() {
        let resolver = NamingResolver::default();
        assert_eq!(resolver.resolve(&ids(&[42])), "Series 42");
        assert_eq!(resolver.resolve(std::iter::empty()), "Unnamed Series");
    }

    #[test]
    fn slugify_collapses_and_truncates() {
        let alloc = SeriesIdAllocator::new(DEFAULT_SLUG_MAX_LEN).unwrap();
        assert_eq!(alloc.slugify("Shingeki no Kyojin"), "shingeki-no-kyojin");
        assert_eq!(alloc.slugify("  Re:Zero -- Starting Life!  "), "re-zero-starting-life");

        let short = SeriesIdAllocator::new(8).unwrap();
        assert_eq!(short.slugify("Fullmetal Alchemist"), "fullmeta");
        assert_eq!(short.slugify("Steins Gate 0"), "steins-g");

        let seven = SeriesIdAllocator::new(7).unwrap();
        assert_eq!(seven.slugify("Steins Gate"), "steins");
    }

    #[test]
    fn allocate_disambiguates_collisions() {
        let mut alloc = SeriesIdAllocator::new(DEFAULT_SLUG_MAX_LEN).unwrap();
        let id = AnimeId::from(1);
        assert_eq!(alloc.allocate("Gintama", &id), "gintama");
        assert_eq!(alloc.allocate("Gintama", &id), "gintama-2");
        assert_eq!(alloc.allocate("GINTAMA", &id), "gintama-3");
        assert!(alloc.is_used("gintama-2"));
    }

    #[test]
    fn allocate_falls_back_for_unsluggable_titles() {
        let mut alloc = SeriesIdAllocator::new(DEFAULT_SLUG_MAX_LEN).unwrap();
        assert_eq!(alloc.allocate("銀魂", &AnimeId::from(918)), "series-918");
    }
}
