//! Error types for provisioning
//!
//! Resource clients report failures as a [`ClientError`] carrying a typed
//! [`ErrorKind`]. The orchestrator branches on the kind only; turning raw
//! service responses into a kind is the client's job.

use crate::report::RunReport;
use crate::types::{NaturalKey, ResourceKind, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Classified failure reported by a resource client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The resource already exists (non-fatal, resolved by lookup)
    AlreadyExists,
    /// A referenced resource does not exist
    NotFound,
    /// Rate limiting, timeouts, server hiccups; worth one retry
    Transient,
    /// Rejected request; the item is recorded as failed
    Permanent,
    /// Authentication or connectivity failure; aborts the whole run
    FatalTransport,
}

impl ErrorKind {
    /// Whether a single retry may help
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Whether the run must stop
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::FatalTransport)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::AlreadyExists => "already exists",
            Self::NotFound => "not found",
            Self::Transient => "transient failure",
            Self::Permanent => "permanent failure",
            Self::FatalTransport => "fatal transport failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Error returned by a [`crate::ResourceClient`] operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permanent, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FatalTransport, message)
    }
}

/// Failure to turn a policy name into permission entries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("unknown policy '{0}'")]
    UnknownPolicy(String),

    #[error("policy '{policy}' grants to the {subject} identity, but none is configured")]
    MissingSubject {
        policy: String,
        subject: &'static str,
    },
}

/// Errors that escape a provisioning run
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The client hit an unrecoverable transport failure; `partial` holds
    /// every outcome recorded before the abort.
    #[error("run aborted in {stage} stage at {kind} '{key}': {message}")]
    Aborted {
        stage: Stage,
        kind: ResourceKind,
        key: NaturalKey,
        message: String,
        partial: Box<RunReport>,
    },
}

impl ProvisionError {
    /// Report collected before the run stopped
    pub fn partial_report(&self) -> &RunReport {
        match self {
            Self::Aborted { partial, .. } => partial,
        }
    }
}

/// Errors loading a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("could not read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),
}
