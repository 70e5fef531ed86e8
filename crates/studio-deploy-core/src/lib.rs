pub mod actions;
pub mod config_file;
pub mod deployment_id;
pub mod env;
pub mod error;
pub mod github;
pub mod host_override;
pub mod io;
pub mod output;
pub mod paths;
pub mod reconcile;
pub mod report;
pub mod sanity_cli;
pub mod workspace;

pub use error::{DeployError, Result};
