//! Parsing the human-readable output of `sanity deploy` and
//! `sanity graphql deploy`.
//!
//! Parsers never fail. A missing URL is an empty result, and the caller
//! decides whether that is fatal.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioDeployment {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlDeployment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl GraphqlDeployment {
    fn is_empty(&self) -> bool {
        self.project.is_none() && self.dataset.is_none() && self.tag.is_none() && self.url.is_none()
    }
}

const BLOCK_TOKEN: &str = "Project:";

static STUDIO_URL_RE: OnceLock<Regex> = OnceLock::new();
static PROJECT_RE: OnceLock<Regex> = OnceLock::new();
static DATASET_RE: OnceLock<Regex> = OnceLock::new();
static TAG_RE: OnceLock<Regex> = OnceLock::new();
static URL_RE: OnceLock<Regex> = OnceLock::new();

fn studio_url_re() -> &'static Regex {
    STUDIO_URL_RE
        .get_or_init(|| Regex::new(r"Success! Studio deployed to (.+)").expect("valid regex"))
}

fn field_re(cell: &'static OnceLock<Regex>, label: &str) -> &'static Regex {
    cell.get_or_init(|| {
        Regex::new(&format!(r"(?m)^[ \t]*{label}:[ \t]*(.+)$")).expect("valid regex")
    })
}

pub fn parse_studio_output(text: &str) -> StudioDeployment {
    let url = studio_url_re()
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|url| !url.is_empty());
    StudioDeployment { url }
}

/// One record per `Project:` block; fields may appear in any subset.
pub fn parse_graphql_output(text: &str) -> Vec<GraphqlDeployment> {
    split_blocks(text)
        .into_iter()
        .filter(|block| !block.trim().is_empty())
        .map(|block| GraphqlDeployment {
            project: capture_field(field_re(&PROJECT_RE, "Project"), block),
            dataset: capture_field(field_re(&DATASET_RE, "Dataset"), block),
            tag: capture_field(field_re(&TAG_RE, "Tag"), block),
            url: capture_field(field_re(&URL_RE, "URL"), block),
        })
        .filter(|deployment| !deployment.is_empty())
        .collect()
}

/// Split before every `Project:` token, keeping the token in its block.
fn split_blocks(text: &str) -> Vec<&str> {
    let mut starts: Vec<usize> = text.match_indices(BLOCK_TOKEN).map(|(i, _)| i).collect();
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}

fn capture_field(re: &Regex, block: &str) -> Option<String> {
    re.captures(block)
        .map(|caps| caps[1].trim().to_string())
        .filter(|value| !value.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(project: &str, dataset: &str, url: &str) -> GraphqlDeployment {
        GraphqlDeployment {
            project: Some(project.into()),
            dataset: Some(dataset.into()),
            tag: None,
            url: Some(url.into()),
        }
    }

    #[test]
    fn studio_url_is_extracted() {
        let out = "Building...\nSuccess! Studio deployed to https://movies.sanity.studio/  \nDone\n";
        assert_eq!(
            parse_studio_output(out).url.as_deref(),
            Some("https://movies.sanity.studio/")
        );
    }

    #[test]
    fn studio_without_success_line_is_empty() {
        assert_eq!(parse_studio_output("Error: nope"), StudioDeployment::default());
        assert_eq!(parse_studio_output(""), StudioDeployment::default());
    }

    #[test]
    fn graphql_two_blocks() {
        let out = "Project: foo\nDataset: bar\nURL: https://x\nProject: foo\nDataset: baz\nURL: https://y\n";
        assert_eq!(
            parse_graphql_output(out),
            vec![
                record("foo", "bar", "https://x"),
                record("foo", "baz", "https://y"),
            ]
        );
    }

    #[test]
    fn graphql_preamble_and_padding() {
        let out = "✔ Generated GraphQL schema\n\nProject: abc\nDataset:   production\nTag:       default\nURL:       https://abc.api.sanity.io/v2023-08-01/graphql/production/default\n";
        let parsed = parse_graphql_output(out);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].project.as_deref(), Some("abc"));
        assert_eq!(parsed[0].dataset.as_deref(), Some("production"));
        assert_eq!(parsed[0].tag.as_deref(), Some("default"));
        assert_eq!(
            parsed[0].url.as_deref(),
            Some("https://abc.api.sanity.io/v2023-08-01/graphql/production/default")
        );
    }

    #[test]
    fn graphql_partial_fields() {
        let parsed = parse_graphql_output("Project: abc\nURL: https://z\n");
        assert_eq!(
            parsed,
            vec![GraphqlDeployment {
                project: Some("abc".into()),
                url: Some("https://z".into()),
                ..Default::default()
            }]
        );
    }

    #[test]
    fn graphql_fields_do_not_bleed_across_lines() {
        let parsed = parse_graphql_output("Project: abc\nTag:\nURL: https://z\n");
        assert_eq!(parsed[0].tag, None);
        assert_eq!(parsed[0].url.as_deref(), Some("https://z"));
    }

    #[test]
    fn graphql_without_fields_is_empty() {
        assert!(parse_graphql_output("").is_empty());
        assert!(parse_graphql_output("nothing deployed\n").is_empty());
    }
}
