//! Run-level error type

use crate::state::EntityClass;

/// Stage of a run that can fail fatally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Validating or creating the output directory
    OutputPath,
    /// Downloading and persisting a daily ID export
    Snapshot(EntityClass),
    /// Looking up and writing one class's records
    Export(EntityClass),
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutputPath => write!(f, "output path"),
            Self::Snapshot(class) => write!(f, "{class} ID export"),
            Self::Export(class) => write!(f, "{class} export"),
        }
    }
}

/// Fatal run error: the failing stage plus its cause chain.
///
/// `Display` names the stage only; the cause is reachable through
/// [`source`](std::error::Error::source), so `{:#}` on an `anyhow::Error`
/// wrapping this prints the whole chain.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub source: anyhow::Error,
}

impl StageError {
    pub fn new(stage: Stage, source: anyhow::Error) -> Self {
        Self { stage, source }
    }
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed", self.stage)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}
