//! Pipeline error types.

use wspublish_archive::ArchiveError;
use wspublish_manifest::ManifestError;
use wspublish_workshop::WorkshopError;

use crate::types::Stage;

/// What went wrong inside a stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineFailure {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Workshop(WorkshopError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not in the cloud")]
    MissingInCloud(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<WorkshopError> for PipelineFailure {
    fn from(e: WorkshopError) -> Self {
        match e {
            WorkshopError::Cancelled => PipelineFailure::Cancelled,
            other => PipelineFailure::Workshop(other),
        }
    }
}

/// A failed pipeline run: the stage it stopped at and why.
#[derive(Debug, thiserror::Error)]
#[error("{stage}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    pub source: PipelineFailure,
}

impl PipelineError {
    pub fn new(stage: Stage, source: impl Into<PipelineFailure>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    /// Adapter for `map_err`.
    pub fn at<E: Into<PipelineFailure>>(stage: Stage) -> impl FnOnce(E) -> Self {
        move |e| Self::new(stage, e)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, PipelineFailure::Cancelled)
    }
}
