//! # Stages
//!
//! The batch stages over an [`ArtifactStore`]: `convert` (CSV to records),
//! `group` (series groups, edge cases, updated records), `split` (advanced
//! split), plus `status`, `clean` and `run_all`. Every stage rebuilds its
//! outputs from scratch and serializes all of them before writing any.

use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};
use tsunagi_core::{
    AdvancedSplit, AnimeRecord, ClusterCategory, EdgeCaseReport, NamingResolver, RelationNormalizer,
    SeriesGroup, SeriesGrouper, SeriesSplitter, load_records,
};

use crate::artifacts::{Artifact, ArtifactStore};
use crate::config::PipelineConfig;
use crate::convert::{ConvertSummary, csv_to_records};
use crate::error::{PipelineError, Result};

/// Counters from the `group` stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupSummary {
    /// Usable records loaded.
    pub records: usize,
    /// Entries skipped for lacking a usable id.
    pub skipped: usize,
    /// Repeated ids dropped.
    pub duplicates: usize,
    pub groups: usize,
    /// Records that received a series id.
    pub grouped_records: usize,
    pub conflicts: usize,
    pub orphans: usize,
    pub cycles: usize,
}

/// Cluster counts per category from the `split` stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitSummary {
    pub groups: usize,
    pub main: usize,
    pub character: usize,
    pub adaptation: usize,
    pub spin_off: usize,
    pub other: usize,
    pub parent: usize,
}

impl SplitSummary {
    fn from_split(groups: usize, split: &AdvancedSplit) -> Self {
        let count = |c| split.bucket(c).len();
        Self {
            groups,
            main: count(ClusterCategory::Main),
            character: count(ClusterCategory::Character),
            adaptation: count(ClusterCategory::Adaptation),
            spin_off: count(ClusterCategory::SpinOff),
            other: count(ClusterCategory::Other),
            parent: count(ClusterCategory::Parent),
        }
    }
}

/// What `run_all` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// `None` when the CSV source was absent and existing records were reused.
    pub convert: Option<ConvertSummary>,
    pub group: GroupSummary,
    pub split: SplitSummary,
}

/// Presence of one artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStatus {
    pub artifact: Artifact,
    pub path: PathBuf,
    /// File size, `None` when the artifact is absent.
    pub bytes: Option<u64>,
}

/// Snapshot of the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub data_dir: PathBuf,
    pub artifacts: Vec<ArtifactStatus>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Data directory: {}", self.data_dir.display())?;
        for entry in &self.artifacts {
            match entry.bytes {
                Some(bytes) => writeln!(
                    f,
                    "  [x] {:<16} {} ({bytes} bytes)",
                    entry.artifact.to_string(),
                    entry.path.display()
                )?,
                None => writeln!(
                    f,
                    "  [ ] {:<16} {}",
                    entry.artifact.to_string(),
                    entry.path.display()
                )?,
            }
        }
        Ok(())
    }
}

/// Rebuilds the input array with loaded records carrying their series id.
/// Entries that were skipped or duplicated pass through unchanged.
fn updated_records(raw: &Value, records: &[AnimeRecord], positions: &[usize]) -> Vec<Value> {
    let items = raw.as_array().map(Vec::as_slice).unwrap_or_default();
    let mut loaded = positions.iter().copied().zip(records).peekable();
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match loaded.next_if(|(at, _)| *at == index) {
            Some((_, record)) => record.to_updated_json(),
            None => item.clone(),
        })
        .collect()
}

/// Runs stages against one data directory.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    store: ArtifactStore,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let store = config.store();
        Self { config, store }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Converts the CSV source into the records artifact.
    ///
    /// # Errors
    ///
    /// `MissingArtifact` without a CSV source, `Csv` if it cannot be parsed,
    /// `Io` if the records cannot be written.
    pub fn convert(&self) -> Result<ConvertSummary> {
        let started = Instant::now();
        let path = self.store.require(Artifact::CsvSource)?;
        let file = File::open(&path).map_err(|e| PipelineError::io(&path, e))?;
        let (records, summary) = csv_to_records(file).map_err(|source| PipelineError::Csv {
            path: path.clone(),
            source,
        })?;

        let doc = self.store.encode(Artifact::Records, &records)?;
        self.store.commit(vec![doc])?;

        info!(
            rows = summary.rows,
            malformed_relations = summary.malformed_relations,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "convert complete"
        );
        Ok(summary)
    }

    /// Groups records into series and writes series groups, edge cases and
    /// updated records.
    ///
    /// # Errors
    ///
    /// `MissingArtifact` without records, `Json` if they do not parse,
    /// `Core` if they are not an array, `Io` on write failure.
    pub fn group(&self) -> Result<GroupSummary> {
        let started = Instant::now();
        let raw: Value = self.store.read_json(Artifact::Records)?;
        let loaded = load_records(&raw, &RelationNormalizer::new())?;
        let mut records = loaded.records;

        let outcome = SeriesGrouper::new(self.config.grouping.clone()).group(&mut records)?;
        let updated = updated_records(&raw, &records, &loaded.positions);

        let report = &outcome.edge_cases;
        let summary = GroupSummary {
            records: records.len(),
            skipped: loaded.skipped.len(),
            duplicates: loaded.duplicates.len(),
            groups: outcome.groups.len(),
            grouped_records: records.iter().filter(|r| r.series_id.is_some()).count(),
            conflicts: report.anime_in_multiple_series.len(),
            orphans: report.orphaned_anime.len(),
            cycles: report.circular_relations.len(),
        };

        let documents = vec![
            self.store.encode(Artifact::SeriesGroups, &outcome.groups)?,
            self.store.encode(Artifact::EdgeCases, report)?,
            self.store.encode(Artifact::UpdatedRecords, &updated)?,
        ];
        self.store.commit(documents)?;

        if summary.skipped > 0 || summary.duplicates > 0 {
            warn!(
                skipped = summary.skipped,
                duplicates = summary.duplicates,
                "some input entries were not grouped"
            );
        }
        info!(
            records = summary.records,
            groups = summary.groups,
            grouped = summary.grouped_records,
            conflicts = summary.conflicts,
            orphans = summary.orphans,
            cycles = summary.cycles,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "group complete"
        );
        Ok(summary)
    }

    /// Splits the series groups and writes the advanced split.
    ///
    /// # Errors
    ///
    /// `MissingArtifact` if series groups or records are absent, `Json` if
    /// either does not parse, `Io` on write failure.
    pub fn split(&self) -> Result<SplitSummary> {
        let started = Instant::now();
        let groups: Vec<SeriesGroup> = self.store.read_json(Artifact::SeriesGroups)?;
        let raw: Value = self.store.read_json(Artifact::Records)?;
        let loaded = load_records(&raw, &RelationNormalizer::new())?;
        let resolver = NamingResolver::from_records(&loaded.records);

        let split = SeriesSplitter::new(&resolver).split(&groups);
        let summary = SplitSummary::from_split(groups.len(), &split);

        let doc = self.store.encode(Artifact::AdvancedSplit, &split)?;
        self.store.commit(vec![doc])?;

        info!(
            groups = summary.groups,
            main = summary.main,
            character = summary.character,
            adaptation = summary.adaptation,
            spin_off = summary.spin_off,
            other = summary.other,
            parent = summary.parent,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "split complete"
        );
        Ok(summary)
    }

    /// Reads back the edge-case report of the last `group` run.
    ///
    /// # Errors
    ///
    /// `MissingArtifact` if `group` has not run, `Json` if the report is corrupt.
    pub fn edge_cases(&self) -> Result<EdgeCaseReport> {
        self.store.read_json(Artifact::EdgeCases)
    }

    /// Lists every artifact with its size.
    pub fn status(&self) -> StatusReport {
        let artifacts = Artifact::ALL
            .into_iter()
            .map(|artifact| {
                let path = self.store.path(artifact);
                let bytes = std::fs::metadata(&path)
                    .ok()
                    .filter(|m| m.is_file())
                    .map(|m| m.len());
                ArtifactStatus {
                    artifact,
                    path,
                    bytes,
                }
            })
            .collect();
        StatusReport {
            data_dir: self.store.root().to_path_buf(),
            artifacts,
        }
    }

    /// Deletes every generated artifact, leaving the CSV source alone.
    /// Returns how many files were removed.
    ///
    /// # Errors
    ///
    /// `Io` if an existing artifact cannot be removed.
    pub fn clean(&self) -> Result<usize> {
        let mut removed = 0;
        for artifact in Artifact::ALL.into_iter().filter(|a| a.is_generated()) {
            if self.store.remove(artifact)? {
                removed += 1;
            }
        }
        info!(removed, "clean complete");
        Ok(removed)
    }

    /// Runs `convert`, `group` and `split` in order, halting at the first
    /// failure.
    ///
    /// `convert` is skipped when there is no CSV source but a records
    /// artifact already exists.
    ///
    /// # Errors
    ///
    /// The first stage error.
    pub fn run_all(&self) -> Result<RunSummary> {
        let convert = if !self.store.exists(Artifact::CsvSource)
            && self.store.exists(Artifact::Records)
        {
            info!("no CSV source, reusing existing records");
            None
        } else {
            Some(self.convert()?)
        };
        let group = self.group()?;
        let split = self.split()?;
        Ok(RunSummary {
            convert,
            group,
            split,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const CSV: &str = "\
id,title,title_romaji,start_date,relations
1,Monogatari,Bakemonogatari,2009-07-03,\"[{\"\"targetAnimeId\"\": 2, \"\"relationType\"\": \"\"SEQUEL\"\"}, {\"\"targetAnimeId\"\": 4, \"\"relationType\"\": \"\"CHARACTER\"\"}]\"
2,Nise,Nisemonogatari,2012-01-08,\"[{\"\"targetAnimeId\"\": 1, \"\"relationType\"\": \"\"PREQUEL\"\"}]\"
3,Lonely,,,[]
4,Crossover,,,\"[{\"\"targetAnimeId\"\": 1, \"\"relationType\"\": \"\"CHARACTER\"\"}]\"
";

    fn pipeline_with_csv() -> (TempDir, Pipeline) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("anime.csv"), CSV).unwrap();
        let pipeline = Pipeline::new(PipelineConfig::new(dir.path()));
        (dir, pipeline)
    }

    fn read(dir: &TempDir, name: &str) -> Value {
        serde_json::from_str(&fs::read_to_string(dir.path().join(name)).unwrap()).unwrap()
    }

    #[test]
    fn run_all_produces_every_artifact() {
        let (dir, pipeline) = pipeline_with_csv();
        let summary = pipeline.run_all().unwrap();

        assert_eq!(summary.convert.unwrap().rows, 4);
        assert_eq!(summary.group.records, 4);
        assert_eq!(summary.group.groups, 1);
        assert_eq!(summary.group.orphans, 1);
        assert_eq!(summary.split.main, 1);

        let groups = read(&dir, "series_groups.json");
        assert_eq!(groups[0]["seriesId"], "bakemonogatari");
        assert_eq!(groups[0]["animeIds"], json!([1, 2, 4]));

        let edge_cases = read(&dir, "edge_cases.json");
        assert_eq!(edge_cases["orphanedAnime"][0]["animeId"], 3);
        assert_eq!(edge_cases["orphanedAnime"][0]["reason"], "No relations found");

        let updated = read(&dir, "updated_records.json");
        assert_eq!(updated[0]["seriesId"], "bakemonogatari");
        assert_eq!(updated[0]["title"], "Monogatari");
        assert!(updated[2].get("seriesId").is_none());

        let split = read(&dir, "advanced_split.json");
        assert_eq!(split["main"][0]["animeIds"], json!([1, 2]));
        assert_eq!(split["main"][0]["characterIds"], json!([4]));
        assert_eq!(split["character"], json!([]));
    }

    #[test]
    fn group_without_records_is_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(PipelineConfig::new(dir.path()));
        let err = pipeline.group().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingArtifact {
                artifact: Artifact::Records,
                ..
            }
        ));
        assert!(!dir.path().join("series_groups.json").exists());
    }

    #[test]
    fn run_all_halts_before_later_stages() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(PipelineConfig::new(dir.path()));
        let err = pipeline.run_all().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingArtifact {
                artifact: Artifact::CsvSource,
                ..
            }
        ));
        assert!(pipeline.status().artifacts.iter().all(|a| a.bytes.is_none()));
    }

    #[test]
    fn run_all_reuses_records_without_csv() {
        let dir = tempfile::tempdir().unwrap();
        let records = json!([
            {"id": 10, "title": "A", "relations": [11]},
            {"id": 11, "title": "B", "relations": [10]},
        ]);
        fs::write(dir.path().join("anime_records.json"), records.to_string()).unwrap();

        let pipeline = Pipeline::new(PipelineConfig::new(dir.path()).with_pretty(false));
        let summary = pipeline.run_all().unwrap();
        assert!(summary.convert.is_none());
        assert_eq!(summary.group.grouped_records, 2);
        assert_eq!(summary.split.main, 1);
    }

    #[test]
    fn updated_records_keep_unusable_entries() {
        let dir = tempfile::tempdir().unwrap();
        let records = json!([
            {"id": 10, "title": "A", "relations": [11]},
            {"title": "No id"},
            {"id": 11, "title": "B", "relations": [10]},
            {"id": 10, "title": "A again"},
        ]);
        fs::write(dir.path().join("anime_records.json"), records.to_string()).unwrap();

        let pipeline = Pipeline::new(PipelineConfig::new(dir.path()));
        let summary = pipeline.group().unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.duplicates, 1);

        let updated = read(&dir, "updated_records.json");
        let updated = updated.as_array().unwrap();
        assert_eq!(updated.len(), 4);
        assert_eq!(updated[0]["seriesId"], updated[2]["seriesId"]);
        assert!(updated[0]["seriesId"].is_string());
        assert_eq!(updated[1], json!({"title": "No id"}));
        assert_eq!(updated[3], json!({"id": 10, "title": "A again"}));
    }

    #[test]
    fn split_requires_group_output() {
        let (_dir, pipeline) = pipeline_with_csv();
        pipeline.convert().unwrap();
        let err = pipeline.split().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingArtifact {
                artifact: Artifact::SeriesGroups,
                ..
            }
        ));
    }

    #[test]
    fn reruns_are_identical() {
        let (dir, pipeline) = pipeline_with_csv();
        pipeline.run_all().unwrap();
        let first = fs::read(dir.path().join("advanced_split.json")).unwrap();
        let groups_first = fs::read(dir.path().join("series_groups.json")).unwrap();

        pipeline.run_all().unwrap();
        assert_eq!(first, fs::read(dir.path().join("advanced_split.json")).unwrap());
        assert_eq!(
            groups_first,
            fs::read(dir.path().join("series_groups.json")).unwrap()
        );
    }

    #[test]
    fn edge_cases_can_be_read_back() {
        let (_dir, pipeline) = pipeline_with_csv();
        pipeline.run_all().unwrap();
        let report = pipeline.edge_cases().unwrap();
        assert_eq!(report.orphaned_anime.len(), 1);
        assert!(report.anime_in_multiple_series.is_empty());
    }

    #[test]
    fn clean_keeps_the_csv_source() {
        let (dir, pipeline) = pipeline_with_csv();
        pipeline.run_all().unwrap();
        assert_eq!(pipeline.clean().unwrap(), 5);
        assert!(dir.path().join("anime.csv").exists());
        assert_eq!(pipeline.clean().unwrap(), 0);

        let status = pipeline.status();
        let present: Vec<Artifact> = status
            .artifacts
            .iter()
            .filter(|a| a.bytes.is_some())
            .map(|a| a.artifact)
            .collect();
        assert_eq!(present, vec![Artifact::CsvSource]);
        assert!(status.to_string().contains("[x] CSV source"));
    }
}
