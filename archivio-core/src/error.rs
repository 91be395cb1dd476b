use thiserror::Error;

/// Unified error type for the archivio workspace.
///
/// A failure to *resolve* a time-series is not an error: resolution misses
/// are an expected, common outcome and are modelled as `Ok(None)` by the
/// resolver APIs. This enum covers genuine failures only.
#[derive(Debug, Clone, Error)]
pub enum ArchivioError {
    /// A document or series could not be found.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource, e.g. "time-series MemTs~42".
        what: String,
    },

    /// Invalid input argument (malformed request, overlapping update range,
    /// missing required field).
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// An optimistic replace lost a race against a concurrent writer. The
    /// caller must re-read and retry; the master never retries silently.
    #[error("concurrent modification of {object_id}")]
    ConcurrentModification {
        /// Identifier of the contested document, as a display string.
        object_id: String,
    },

    /// Authorization denied for an operation or a specific record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Fatal misconfiguration, e.g. a rating policy missing a required
    /// wildcard rule. Never raised per-record.
    #[error("configuration error: {0}")]
    Config(String),

    /// No master is registered for the identifier's scheme.
    #[error("unknown scheme: {scheme}")]
    UnknownScheme {
        /// The unroutable scheme.
        scheme: String,
    },

    /// An underlying master failed; tagged with the master's name.
    #[error("{master} failed: {msg}")]
    Master {
        /// Name of the failing master.
        master: String,
        /// Human-readable error message.
        msg: String,
    },

    /// Unknown/opaque error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ArchivioError {
    /// Helper: build a `NotFound` error for a description of the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper: build an `InvalidArg` error.
    pub fn invalid_arg(msg: impl Into<String>) -> Self {
        Self::InvalidArg(msg.into())
    }

    /// Helper: build a `ConcurrentModification` error for a contested id.
    pub fn concurrent(object_id: impl ToString) -> Self {
        Self::ConcurrentModification {
            object_id: object_id.to_string(),
        }
    }

    /// Helper: build a `Forbidden` error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Helper: build a `Config` error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Helper: build an `UnknownScheme` error.
    pub fn unknown_scheme(scheme: impl Into<String>) -> Self {
        Self::UnknownScheme {
            scheme: scheme.into(),
        }
    }

    /// Helper: build a `Master` error with the master name and message.
    pub fn master(master: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Master {
            master: master.into(),
            msg: msg.into(),
        }
    }
}
