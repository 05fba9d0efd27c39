use std::path::PathBuf;
use thiserror::Error;

/// Every failure the bundling pipeline can report.
///
/// `Validation` and `NotFound` are raised before any network or disk access
/// and decide the status of a whole response. `Resolution`, `UpstreamFetch`
/// and `CacheWrite` are per item: the archive assembler records them and moves
/// on. `Archive` is the only error that stops a stream which has already begun.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("{0}")]
    Validation(String),

    #[error("Font family '{0}' not found")]
    NotFound(String),

    #[error("No {format} asset served for {family} weight {weight}")]
    Resolution {
        family: String,
        weight: u16,
        format: String,
    },

    #[error("Upstream request to {url} failed: {reason}")]
    UpstreamFetch { url: String, reason: String },

    #[error("Cache storage failure at {path:?}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive stream failed: {0}")]
    Archive(String),
}

impl FontError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upstream(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::UpstreamFetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn cache_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheWrite {
            path: path.into(),
            source,
        }
    }

    /// Short label used in logs and job reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Resolution { .. } => "resolution",
            Self::UpstreamFetch { .. } => "upstream_fetch",
            Self::CacheWrite { .. } => "cache_write",
            Self::Archive(_) => "archive",
        }
    }

    /// HTTP status a response carries when this error decides it.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Resolution { .. } | Self::UpstreamFetch { .. } => 502,
            Self::CacheWrite { .. } | Self::Archive(_) => 500,
        }
    }

    /// Whether the failure only affects a single (family, weight) item.
    pub fn is_item_failure(&self) -> bool {
        matches!(
            self,
            Self::Resolution { .. } | Self::UpstreamFetch { .. } | Self::CacheWrite { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FontError>;
