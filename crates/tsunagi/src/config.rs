use std::path::PathBuf;

use tsunagi_core::{GroupingConfig, Reachability};

use crate::artifacts::ArtifactStore;

/// Configuration of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding every artifact.
    pub data_dir: PathBuf,
    /// CSV export to convert; defaults to `anime.csv` in `data_dir`.
    pub input: Option<PathBuf>,
    /// Grouping behavior.
    pub grouping: GroupingConfig,
    /// Pretty-print JSON artifacts.
    pub pretty: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            input: None,
            grouping: GroupingConfig::default(),
            pretty: true,
        }
    }
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: Option<PathBuf>) -> Self {
        self.input = input;
        self
    }

    #[must_use]
    pub fn with_grouping(mut self, grouping: GroupingConfig) -> Self {
        self.grouping = grouping;
        self
    }

    /// Shorthand for restricting the grouper to each record's own relations.
    #[must_use]
    pub fn with_directed(mut self, directed: bool) -> Self {
        let reachability = if directed {
            Reachability::Outgoing
        } else {
            Reachability::Undirected
        };
        self.grouping = self.grouping.with_reachability(reachability);
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Store over `data_dir` honoring the input override and output format.
    #[must_use]
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.data_dir)
            .with_csv_source(self.input.clone())
            .with_pretty(self.pretty)
    }
}
