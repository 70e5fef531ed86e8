use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::ValueEnum;
use std::io::Read;
use std::path::Path;
use studio_deploy_core::output::{parse_graphql_output, parse_studio_output};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputKind {
    /// `sanity deploy`
    Studio,
    /// `sanity graphql deploy`
    Graphql,
}

pub fn run(kind: OutputKind, file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    match kind {
        OutputKind::Studio => {
            let deployment = parse_studio_output(&text);
            if json {
                print_json(&deployment)?;
            } else {
                match &deployment.url {
                    Some(url) => println!("{url}"),
                    None => println!("No studio URL found."),
                }
            }
        }
        OutputKind::Graphql => {
            let deployments = parse_graphql_output(&text);
            if json {
                print_json(&deployments)?;
            } else if deployments.is_empty() {
                println!("No GraphQL deployments found.");
            } else {
                let cell = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
                let rows = deployments
                    .iter()
                    .map(|d| vec![cell(&d.project), cell(&d.dataset), cell(&d.tag), cell(&d.url)])
                    .collect();
                print_table(&["PROJECT", "DATASET", "TAG", "URL"], rows);
            }
        }
    }
    Ok(())
}
