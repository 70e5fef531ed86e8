use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("host '{host}' is too long to build a valid deployment id")]
    HostTooLong { host: String },

    #[error("preview deployments must not run on trunk branch '{0}'")]
    TrunkBranch(String),

    #[error("malformed config {}: {message}", .path.display())]
    MalformedConfig { path: PathBuf, message: String },

    #[error("could not find {field} in {}", .path.display())]
    MissingField { field: String, path: PathBuf },

    #[error("no Sanity CLI config found in {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("incomplete environment: {0}")]
    EnvironmentIncomplete(String),

    #[error("'{0}' was not found on PATH")]
    ToolNotFound(String),

    #[error("'{program}' exited with {}", exit_label(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("github api {operation} failed with status {status}: {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
