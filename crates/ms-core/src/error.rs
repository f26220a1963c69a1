use std::fmt;

use crate::node::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    InvalidConfig(String),
    InvalidSpawn(String),
    UnknownNode(NodeId),
    Serialization(String),
    Disposed,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            EngineError::InvalidSpawn(msg) => write!(f, "invalid spawn request: {msg}"),
            EngineError::UnknownNode(id) => write!(f, "unknown node {id:?}"),
            EngineError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            EngineError::Disposed => write!(f, "engine has been disposed"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
