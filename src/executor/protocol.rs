//! Coordinator/worker message protocol
//!
//! Messages travel as one JSON document per line: tasks on the worker's
//! stdin, results on its stdout. End of stdin tells a worker to exit.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::RunSummary;

/// Coordinator to worker: `{"task": "/abs/path"}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToWorker {
    Task(PathBuf),
}

/// Worker to coordinator: `{"result": {...}}`, once per task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FromWorker {
    Result(RunSummary),
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed message {line:?}: {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Encode a message as a single line, without the trailing newline
pub fn encode<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(line.trim()).map_err(|source| ProtocolError::Decode {
        line: line.to_string(),
        source,
    })
}
