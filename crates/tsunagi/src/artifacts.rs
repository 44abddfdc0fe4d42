//! # Artifacts
//!
//! Named documents exchanged between stages, and the directory-backed store
//! that reads and writes them. Writes go to a sibling temp file first and are
//! renamed into place, so a failed stage never leaves a half-written document.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// A document produced or consumed by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// The CSV export fed to `convert`.
    CsvSource,
    /// Raw record objects.
    Records,
    SeriesGroups,
    EdgeCases,
    /// Records with their resolved `seriesId`.
    UpdatedRecords,
    AdvancedSplit,
}

impl Artifact {
    /// Every artifact, in production order.
    pub const ALL: [Self; 6] = [
        Self::CsvSource,
        Self::Records,
        Self::SeriesGroups,
        Self::EdgeCases,
        Self::UpdatedRecords,
        Self::AdvancedSplit,
    ];

    /// File name inside the data directory.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::CsvSource => "anime.csv",
            Self::Records => "anime_records.json",
            Self::SeriesGroups => "series_groups.json",
            Self::EdgeCases => "edge_cases.json",
            Self::UpdatedRecords => "updated_records.json",
            Self::AdvancedSplit => "advanced_split.json",
        }
    }

    /// Stage (or source) responsible for producing the artifact.
    #[must_use]
    pub fn producer(self) -> &'static str {
        match self {
            Self::CsvSource => "an export into the data directory",
            Self::Records => "convert",
            Self::SeriesGroups | Self::EdgeCases | Self::UpdatedRecords => "group",
            Self::AdvancedSplit => "split",
        }
    }

    /// Returns `true` for artifacts written by a stage (everything but the
    /// CSV source).
    #[must_use]
    pub fn is_generated(self) -> bool {
        !matches!(self, Self::CsvSource)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CsvSource => write!(f, "CSV source"),
            Self::Records => write!(f, "records"),
            Self::SeriesGroups => write!(f, "series groups"),
            Self::EdgeCases => write!(f, "edge cases"),
            Self::UpdatedRecords => write!(f, "updated records"),
            Self::AdvancedSplit => write!(f, "advanced split"),
        }
    }
}

/// A serialized document waiting to be committed.
#[derive(Debug)]
pub struct Encoded {
    artifact: Artifact,
    bytes: Vec<u8>,
}

/// Directory-backed artifact storage.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    csv_override: Option<PathBuf>,
    pretty: bool,
}

impl ArtifactStore {
    /// Creates a store rooted at `root`, writing pretty-printed JSON.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            csv_override: None,
            pretty: true,
        }
    }

    /// Reads the CSV source from `path` instead of the data directory.
    #[must_use]
    pub fn with_csv_source(mut self, path: Option<PathBuf>) -> Self {
        self.csv_override = path;
        self
    }

    /// Chooses between pretty-printed and compact JSON output.
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of an artifact.
    #[must_use]
    pub fn path(&self, artifact: Artifact) -> PathBuf {
        match (&self.csv_override, artifact) {
            (Some(path), Artifact::CsvSource) => path.clone(),
            _ => self.root.join(artifact.file_name()),
        }
    }

    #[must_use]
    pub fn exists(&self, artifact: Artifact) -> bool {
        self.path(artifact).is_file()
    }

    /// Returns the artifact path, or `MissingArtifact` if it was never produced.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::MissingArtifact` when the file does not exist.
    pub fn require(&self, artifact: Artifact) -> Result<PathBuf> {
        let path = self.path(artifact);
        if path.is_file() {
            Ok(path)
        } else {
            Err(PipelineError::MissingArtifact { artifact, path })
        }
    }

    /// Reads and parses a JSON artifact.
    ///
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the file is absent, `Io` if it cannot be
    /// read and `Json` if it does not parse as `T`.
    pub fn read_json<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<T> {
        let path = self.require(artifact)?;
        let bytes = fs::read(&path).map_err(|e| PipelineError::io(&path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| PipelineError::json(&path, e))
    }

    /// Serializes `value` for `artifact` without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Json` if serialization fails.
    pub fn encode<T: Serialize>(&self, artifact: Artifact, value: &T) -> Result<Encoded> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        let bytes = encoded.map_err(|e| PipelineError::json(self.path(artifact), e))?;
        Ok(Encoded { artifact, bytes })
    }

    /// Writes every document to a temp file, then renames them all into place.
    ///
    /// Nothing is renamed until every temp file is written, so a failed write
    /// leaves the existing artifacts untouched.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` on the first failed write or rename. Temp
    /// files written before a failed write are removed.
    pub fn commit(&self, documents: Vec<Encoded>) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| PipelineError::io(&self.root, e))?;

        let mut staged: Vec<(PathBuf, PathBuf, usize)> = Vec::with_capacity(documents.len());
        for Encoded { artifact, bytes } in documents {
            let path = self.path(artifact);
            let tmp = path.with_extension("json.tmp");
            if let Err(e) = fs::write(&tmp, &bytes) {
                for (staged_tmp, _, _) in &staged {
                    let _ = fs::remove_file(staged_tmp);
                }
                return Err(PipelineError::io(&tmp, e));
            }
            staged.push((tmp, path, bytes.len()));
        }

        let mut pending = staged.into_iter();
        while let Some((tmp, path, len)) = pending.next() {
            if let Err(e) = fs::rename(&tmp, &path) {
                let _ = fs::remove_file(&tmp);
                for (rest, _, _) in pending.by_ref() {
                    let _ = fs::remove_file(rest);
                }
                return Err(PipelineError::io(&path, e));
            }
            debug!(path = %path.display(), bytes = len, "artifact written");
        }
        Ok(())
    }

    /// Deletes a generated artifact. Returns `true` if a file was removed.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` if the file exists but cannot be removed.
    pub fn remove(&self, artifact: Artifact) -> Result<bool> {
        let path = self.path(artifact);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PipelineError::io(path, e)),
        }
    }
}
