//! # Tsunagi
//!
//! Batch pipeline around [`tsunagi_core`]: converts a CSV export into record
//! objects, groups them into series, and splits every series by relation
//! semantics. Stages exchange JSON artifacts through a data directory.
//!
//! ## Quick Start
//!
//! ```rust
//! use tsunagi::{Pipeline, PipelineConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(
//!     dir.path().join("anime_records.json"),
//!     r#"[{"id": 1, "title": "Aria", "relations": [2]},
//!         {"id": 2, "title": "Aria Natural", "relations": [1]}]"#,
//! )
//! .unwrap();
//!
//! let pipeline = Pipeline::new(PipelineConfig::new(dir.path()));
//! let summary = pipeline.run_all().unwrap();
//!
//! assert_eq!(summary.group.groups, 1);
//! assert_eq!(summary.split.main, 1);
//! ```
pub mod artifacts;
pub mod config;
pub mod convert;
pub mod error;
pub mod stages;

// Re-export primary API
pub use artifacts::{Artifact, ArtifactStore};
pub use config::PipelineConfig;
pub use convert::{ConvertSummary, csv_to_records};
pub use error::{PipelineError, Result};
pub use stages::{ArtifactStatus, GroupSummary, Pipeline, RunSummary, SplitSummary, StatusReport};

pub use tsunagi_core;
