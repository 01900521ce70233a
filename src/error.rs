//! Domain errors for a publishing run.

use std::path::PathBuf;

use thiserror::Error;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures a publishing run can report. None of them are recovered; the
/// CLI turns each one into a failed run.
#[derive(Error, Debug)]
pub enum PublishError {
    /// No usable credentials were supplied
    #[error("Invalid credentials: {0}")]
    Credentials(String),

    /// The token endpoint rejected the signed assertion
    #[error("Authentication with Google Play failed: {0}")]
    Authentication(String),

    /// A file pattern resolved to nothing
    #[error("No files found matching '{0}'")]
    ArtifactNotFound(String),

    /// Reading a track failed
    #[error("Failed to read track '{track}': {source}")]
    TrackRead {
        track: String,
        #[source]
        source: Cause,
    },

    /// Writing a track failed
    #[error("Failed to update track '{track}': {source}")]
    TrackUpdate {
        track: String,
        #[source]
        source: Cause,
    },

    /// The track has no release the requested operation can act on
    #[error("Track '{track}' has no {wanted} release")]
    NoRelease { track: String, wanted: String },

    /// Every token of a replace list that is not a positive integer
    #[error("Invalid version codes in replace list: {0:?}")]
    InvalidVersionCodes(Vec<String>),

    /// The replace expression is not a valid regular expression
    #[error("Invalid version code expression '{expr}': {source}")]
    InvalidExpression {
        expr: String,
        #[source]
        source: regex::Error,
    },

    /// An upload of a binary, mapping, expansion file or image failed
    #[error("Failed to upload '{}': {source}", .path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    /// A store listing update failed
    #[error("Failed to update listing for '{language}': {source}")]
    Listing {
        language: String,
        #[source]
        source: Cause,
    },

    /// A changelog file could not be read
    #[error("Failed to read changelog '{}': {source}", .path.display())]
    Changelog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A user input is out of range or inconsistent
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PublishError {
    pub fn track_read(track: &str, source: anyhow::Error) -> Self {
        Self::TrackRead {
            track: track.to_string(),
            source: source.into(),
        }
    }

    pub fn track_update(track: &str, source: anyhow::Error) -> Self {
        Self::TrackUpdate {
            track: track.to_string(),
            source: source.into(),
        }
    }

    pub fn upload(path: impl Into<PathBuf>, source: anyhow::Error) -> Self {
        Self::Upload {
            path: path.into(),
            source: source.into(),
        }
    }
}
