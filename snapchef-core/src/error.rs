use thiserror::Error;

use crate::image::ArchiveError;
use crate::vision::VisionError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to archive image: {0}")]
    Archive(#[from] ArchiveError),
}

/// Which part of a resolution ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classification,
    Recipe,
    Lookup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Classification => "classification",
            Stage::Recipe => "recipe",
            Stage::Lookup => "lookup",
        }
    }
}

/// Coarse error category, for callers that only care which kind of failure it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Model,
    MalformedModelOutput,
    Persistence,
    Timeout,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Vision model error: {0}")]
    Model(VisionError),

    #[error("Model output did not contain a usable recipe: {0}")]
    MalformedOutput(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Deadline exceeded during {} stage", .stage.as_str())]
    Timeout { stage: Stage },
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::Model(_) => ErrorKind::Model,
            ResolveError::MalformedOutput(_) => ErrorKind::MalformedModelOutput,
            ResolveError::Persistence(_) => ErrorKind::Persistence,
            ResolveError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

impl From<VisionError> for ResolveError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::MalformedOutput { reason, .. } => ResolveError::MalformedOutput(reason),
            other => ResolveError::Model(other),
        }
    }
}
