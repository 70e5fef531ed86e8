pub mod build_deploy;
pub mod cleanup;
pub mod deployment_id;
pub mod override_host;
pub mod package_manager;
pub mod parse_output;
