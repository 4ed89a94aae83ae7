use thiserror::Error;

/// Faults that escape [`crate::ReachabilityEngine::generate`].
///
/// Remote failures never show up here: they are turned into a fallback area.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReachError {
    #[error("Invalid request parameters: {0}")]
    InvalidParameters(String),
}
