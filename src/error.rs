use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaintError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Formula not found: {0}")]
    FormulaNotFound(String),

    #[error("Cask not found: {0}")]
    CaskNotFound(String),

    #[error("No available formula or cask with the name \"{0}\"")]
    PackageNotFound(String),

    #[error("Invalid tap name format. Expected 'user/repo', got '{0}'")]
    InvalidTap(String),

    #[error("GitHub API error ({status}): {message}")]
    GitHubError { status: u16, message: String },

    #[error("Validation Failed: {0}")]
    ValidationFailed(String),

    #[error("Versions cannot be empty")]
    EmptyVersions,

    #[error("You have too many PRs open in {repo} ({count}/{limit}): close or merge some first!")]
    TooManyOpenPrs {
        repo: String,
        count: usize,
        limit: usize,
    },

    #[error("{0} bump pull request(s) could not be opened")]
    BumpFailed(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MaintError>;
