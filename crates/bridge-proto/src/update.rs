//! Latest-release check against a GitHub-style releases endpoint.

use std::cmp::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Available {
        version: String,
        url: Option<String>,
    },
}

/// Fetch the latest release and compare it with the running version.
pub async fn check_for_updates(release_url: &str) -> Result<UpdateStatus> {
    let client = reqwest::Client::builder()
        .timeout(CHECK_TIMEOUT)
        .user_agent(concat!("remote-bridge/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(release_url)
        .header("Accept", "application/json")
        .send()
        .await
        .context("Failed to check for updates")?;

    if !response.status().is_success() {
        anyhow::bail!("Release API returned status: {}", response.status());
    }

    let release: Release = response
        .json()
        .await
        .context("Failed to parse release info")?;
    debug!("update: latest tag {}", release.tag_name);

    let status = evaluate(CURRENT_VERSION, &release.tag_name, release.html_url);
    if let UpdateStatus::Available { version, .. } = &status {
        info!("update: v{} available (running v{})", version, CURRENT_VERSION);
    }
    Ok(status)
}

fn evaluate(current: &str, tag: &str, url: Option<String>) -> UpdateStatus {
    let latest = strip_tag(tag);
    if compare_versions(latest, current) == Ordering::Greater {
        UpdateStatus::Available {
            version: latest.to_string(),
            url,
        }
    } else {
        UpdateStatus::UpToDate
    }
}

fn strip_tag(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix('v')
        .or_else(|| tag.strip_prefix('V'))
        .unwrap_or(tag)
}

/// Numeric, component-wise comparison of dotted versions.  Missing
/// components count as zero; a pre-release suffix (`-rc1`) is ignored.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        strip_tag(v)
            .split(['-', '+'])
            .next()
            .unwrap_or("")
            .split('.')
            .map(|part| part.parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.10.0", "1.9.3"), Ordering::Greater);
        assert_eq!(compare_versions("0.9.9", "1.0.0"), Ordering::Less);
        assert_eq!(compare_versions("v2.0.0", "1.4.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.2.0-rc1", "1.2.0"), Ordering::Equal);
    }

    #[test]
    fn test_evaluate_strips_prefix() {
        assert_eq!(
            evaluate("1.0.0", "v1.1.0", None),
            UpdateStatus::Available {
                version: "1.1.0".into(),
                url: None
            }
        );
        assert_eq!(evaluate("1.0.0", "v1.0.0", None), UpdateStatus::UpToDate);
    }

    #[test]
    fn test_older_release_is_not_an_update() {
        assert_eq!(evaluate("1.2.0", "v1.1.9", None), UpdateStatus::UpToDate);
    }
}
