//! Markdown body of the PR status comment.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// Hidden marker that identifies the status comment across runs.
pub const STATUS_MARKER: &str = "<!-- sanity-build-and-deploy -->";

const HEADING: &str = "### Sanity Build and Deploy";

/// What happened in this run, as far as the comment is concerned.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentReport {
    pub deployment_id: Option<String>,
    pub studio_deployed: bool,
    pub studio_url: Option<String>,
    pub graphql_deployed: bool,
    pub graphql_urls: Vec<String>,
    pub built: bool,
    pub studio_dist: Option<String>,
    pub studio_dist_size: Option<String>,
    pub source_maps: bool,
    pub no_minify: bool,
    pub schema_path: Option<String>,
    pub schema_workspace: Option<String>,
    pub schema_enforce_required_fields: bool,
    pub schema_required: bool,
}

pub fn render_report(report: &DeploymentReport, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, report, now);
    out
}

fn write_report(out: &mut String, r: &DeploymentReport, now: DateTime<Utc>) -> std::fmt::Result {
    writeln!(out, "{STATUS_MARKER}")?;
    writeln!(out, "{HEADING}\n")?;

    if r.studio_deployed {
        writeln!(
            out,
            "**Studio URL:** {}",
            r.studio_url.as_deref().unwrap_or("unavailable")
        )?;
    }
    if r.graphql_deployed {
        for url in &r.graphql_urls {
            writeln!(out, "**GraphQL URL:** {url}")?;
        }
    }
    out.push_str("\n\n");

    writeln!(out, "#### Details")?;
    writeln!(
        out,
        "**Deployment ID:** `{}`",
        r.deployment_id.as_deref().unwrap_or("none")
    )?;
    if r.built {
        if let Some(dist) = &r.studio_dist {
            writeln!(out, "**Studio output directory:** `{dist}`")?;
        }
        if let Some(size) = &r.studio_dist_size {
            writeln!(out, "**Studio output size:** {size}")?;
        }
        if r.source_maps {
            writeln!(out, "**Studio source maps:** Included")?;
        }
        if r.no_minify {
            writeln!(out, "**Studio minification:** Disabled")?;
        }
        out.push('\n');
        if let Some(path) = &r.schema_path {
            writeln!(out, "**Schema path:** `{path}`")?;
        }
        if let Some(workspace) = &r.schema_workspace {
            writeln!(out, "**Schema workspace:** `{workspace}`")?;
        }
        if r.schema_enforce_required_fields {
            writeln!(out, "**Schema enforce required fields:** `true`")?;
        }
        if r.schema_required {
            writeln!(out, "**Schema build required:** `true`")?;
        }
    }

    out.push_str("\n\n---\n\n");
    out.push_str(
        "<details>\n<summary>ℹ️ <strong>About PR Preview Deployments</strong></summary>\n\n",
    );
    out.push_str(
        "This is an isolated preview deployment for your pull request. \
         It will not affect your production deployment.\n\n",
    );
    out.push_str("- **Auto-cleanup**: Runs when PR is closed\n");
    out.push_str("\n</details>\n\n");

    write!(
        out,
        "<sub>🤖 Deployed by Sanity GitHub Actions at {} UTC</sub>",
        now.format("%-m/%-d/%y, %-I:%M:%S %p")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 7, 14, 5, 9).unwrap()
    }

    #[test]
    fn starts_with_marker_and_heading() {
        let body = render_report(&DeploymentReport::default(), at());
        assert!(body.starts_with("<!-- sanity-build-and-deploy -->\n### Sanity Build and Deploy\n"));
        assert!(body.contains("**Deployment ID:** `none`"));
        assert!(body.ends_with("<sub>🤖 Deployed by Sanity GitHub Actions at 3/7/26, 2:05:09 PM UTC</sub>"));
    }

    #[test]
    fn lists_urls_for_deployed_targets() {
        let report = DeploymentReport {
            deployment_id: Some("movies--fix-42".into()),
            studio_deployed: true,
            studio_url: Some("https://movies--fix-42.sanity.studio".into()),
            graphql_deployed: true,
            graphql_urls: vec!["https://a/graphql".into(), "https://b/graphql".into()],
            ..Default::default()
        };
        let body = render_report(&report, at());
        assert!(body.contains("**Studio URL:** https://movies--fix-42.sanity.studio\n"));
        assert!(body.contains("**GraphQL URL:** https://a/graphql\n**GraphQL URL:** https://b/graphql\n"));
        assert!(body.contains("**Deployment ID:** `movies--fix-42`"));
        assert!(body.contains("About PR Preview Deployments"));
    }

    #[test]
    fn build_details_only_when_built() {
        let mut report = DeploymentReport {
            studio_dist: Some("dist".into()),
            studio_dist_size: Some("4.2 MB".into()),
            source_maps: true,
            schema_required: true,
            ..Default::default()
        };
        assert!(!render_report(&report, at()).contains("Studio output directory"));

        report.built = true;
        let body = render_report(&report, at());
        assert!(body.contains("**Studio output directory:** `dist`"));
        assert!(body.contains("**Studio output size:** 4.2 MB"));
        assert!(body.contains("**Studio source maps:** Included"));
        assert!(!body.contains("minification"));
        assert!(body.contains("**Schema build required:** `true`"));
        assert!(!body.contains("Schema path"));
    }
}
