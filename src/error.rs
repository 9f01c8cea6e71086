use thiserror::Error;

use crate::parse::ParseError;
use crate::types::GraphError;

/// Unified error type covering parsing, graph validation, JSON and I/O.
///
/// Returned by convenience loaders like
/// [`WorldGraph::from_json()`](crate::WorldGraph::from_json) and
/// [`WorldGraph::from_file()`](crate::WorldGraph::from_file).
#[derive(Debug, Error)]
pub enum LogicError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("invalid world document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
