//! Operator tooling around the datashift adapters.
//!
//! `load` seeds the search engine from a JSON file, `verify` compares the two
//! stores after a transfer, and `probe` checks that an adapter process answers
//! the MCP handshake and advertises its tools.

pub mod load;
pub mod probe;
pub mod verify;

use std::path::PathBuf;
use std::{error::Error, fmt};

use datashift_core::control::ControlError;

pub use load::{DEFAULT_CHUNK_SIZE, LoadReport, LoadRequest, load_documents, load_file, parse_documents};
pub use probe::{DESCRIPTION_PREVIEW_CHARS, ProbeReport, ProbedTool, describe_server, preview, probe_command};
pub use verify::{DEFAULT_BASELINE_ROWS, SearchSide, SqlSide, Verdict, VerificationReport, VerifyOptions, verdict, verify};

#[derive(Debug)]
pub enum IngestError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(String),
    Unreachable(String),
    Control(ControlError),
    Probe(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                let path = path.display();
                write!(f, "failed to read {path}: {source}")
            }
            Self::Parse(message) => write!(f, "invalid input file: {message}"),
            Self::Unreachable(target) => write!(f, "cannot connect to {target}"),
            Self::Control(err) => write!(f, "{err}"),
            Self::Probe(message) => write!(f, "probe failed: {message}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Control(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ControlError> for IngestError {
    fn from(err: ControlError) -> Self {
        Self::Control(err)
    }
}
