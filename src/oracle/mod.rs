//! Authoritative interface-implementation oracle.
//!
//! The matcher asks an oracle "which types implement the interface declared
//! here?". Two implementations exist: [`GoplsClient`], which asks a running
//! gopls over LSP, and [`NullOracle`], which never knows. A failure is an
//! [`OracleAnswer::Unavailable`] value, never an error the caller must handle.

mod framing;
mod gopls;

pub use framing::{encode_message, parse_content_length, read_message, write_message};
pub use gopls::{GoplsClient, GoplsOptions};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while talking to a language server.
///
/// These never leave the oracle: [`GoplsClient`] turns them into
/// [`OracleAnswer::Unavailable`].
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("request '{method}' timed out after {timeout_ms}ms")]
    Timeout { method: String, timeout_ms: u64 },
    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },
    #[error("language server closed the connection")]
    Closed,
}

/// Position of an interface name to query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceQuery {
    /// Interface name, used to locate the column on the declaration line.
    pub name: String,
    /// Module-relative file path.
    pub file: String,
    /// 1-indexed line of the interface name.
    pub line: usize,
    /// 1-indexed column of the interface name, when known.
    pub column: Option<usize>,
}

/// One implementing type reported by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplementorLocation {
    /// Module-relative file path.
    pub file: String,
    /// 1-indexed line.
    pub line: usize,
}

/// Outcome of one oracle query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleAnswer {
    /// The oracle answered; the list may be empty.
    Implementors(Vec<ImplementorLocation>),
    /// The oracle could not answer (not running, timeout, protocol error).
    Unavailable(String),
}

impl OracleAnswer {
    pub fn is_available(&self) -> bool {
        matches!(self, OracleAnswer::Implementors(_))
    }
}

/// A source of authoritative implementation facts.
pub trait ImplementationOracle {
    /// Short name for logs and metadata.
    fn name(&self) -> &str;

    /// Implementors of the interface declared at `query`.
    fn implementors(&mut self, query: &InterfaceQuery) -> OracleAnswer;
}

/// Oracle that is never available.
#[derive(Debug, Clone, Default)]
pub struct NullOracle;

impl ImplementationOracle for NullOracle {
    fn name(&self) -> &str {
        "none"
    }

    fn implementors(&mut self, _query: &InterfaceQuery) -> OracleAnswer {
        OracleAnswer::Unavailable("no oracle configured".to_string())
    }
}
