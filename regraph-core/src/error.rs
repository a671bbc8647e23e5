use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegraphError {
    #[error("Failed to read file {path:?}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("Failed to write file {path:?}: {source}")]
    WriteFile { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse JSON in {path:?}: {source}")]
    ParseJson { path: PathBuf, source: serde_json::Error },

    #[error("Failed to build HTTP client: {source}")]
    HttpClient { source: reqwest::Error },

    #[error("HTTP error while requesting {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Registry service unavailable at {url}: {reason}")]
    ServiceUnavailable { url: String, reason: String },

    #[error("Artifact {url} could not be fetched: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Invalid fixture {path:?}: {reason}")]
    Fixture { path: PathBuf, reason: String },

    #[error("Resolution of {identifier} was cancelled: {reason}")]
    Cancelled { identifier: String, reason: String },

    #[error("Invalid semver for {value}: {reason}")]
    Semver { value: String, reason: String },

    #[error("Unreadable Tailwind config at offset {offset}: {reason}")]
    TailwindParse { offset: usize, reason: String },

    #[error("Unreadable CSS at offset {offset}: {reason}")]
    CssParse { offset: usize, reason: String },

    #[error("Conflicting style definition for {category} `{key}`")]
    StyleConflict { category: String, key: String },
}

impl RegraphError {
    /// Errors that abort a whole resolution rather than degrading one node.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RegraphError::ServiceUnavailable { .. } | RegraphError::Cancelled { .. }
        )
    }
}
