//! Fetching task records out of GitHub repositories.
//!
//! Pulls `.tasks/**.json` files from one or more `owner/repo` repositories
//! via the contents API. The fetch is best-effort: unreachable repositories
//! and unparseable files are logged and skipped, never fatal.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Task;

/// GitHub repositories API base URL
const GITHUB_API_BASE: &str = "https://api.github.com/repos";

/// User-Agent header required by the GitHub API
const USER_AGENT: &str = "taskdeck-cli";

/// Errors from the GitHub fetch surface.
#[derive(Debug, Error)]
pub enum GithubError {
    /// Repository is not `owner/repo`
    #[error("Invalid repository '{0}': expected owner/repo")]
    InvalidRepo(String),
}

/// One entry of a contents API directory listing (only fields we use).
#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    #[serde(rename = "type")]
    entry_type: String,
    /// Absent for directories
    download_url: Option<String>,
    /// Present for directories, used to descend into queue subdirectories
    url: Option<String>,
}

/// Fetch task records from the `.tasks` trees of the given repositories.
///
/// Both flat layouts (task files directly under `.tasks`) and queue layouts
/// (one subdirectory per queue) are handled; `meta.json` files are skipped.
/// Per-repository and per-file failures are logged and skipped.
pub fn fetch_github_tasks(repos: &[String], token: Option<&str>) -> Result<Vec<Task>, GithubError> {
    let mut tasks = Vec::new();

    for repo in repos {
        if repo.split('/').count() != 2 {
            return Err(GithubError::InvalidRepo(repo.clone()));
        }
        let contents_url = format!("{}/{}/contents/.tasks", GITHUB_API_BASE, repo);
        collect_tasks(&contents_url, token, &mut tasks);
    }

    Ok(tasks)
}

fn collect_tasks(contents_url: &str, token: Option<&str>, tasks: &mut Vec<Task>) {
    let listing: Vec<ContentsEntry> = match get_json(contents_url, token) {
        Some(listing) => listing,
        None => {
            warn!(url = contents_url, "skipping unreachable listing");
            return;
        }
    };

    for entry in listing {
        match entry.entry_type.as_str() {
            "dir" => {
                if let Some(url) = &entry.url {
                    collect_tasks(url, token, tasks);
                }
            }
            "file" if entry.name.ends_with(".json") && entry.name != "meta.json" => {
                let Some(download_url) = &entry.download_url else {
                    continue;
                };
                match get_json::<Task>(download_url, token) {
                    Some(task) => tasks.push(task),
                    None => debug!(file = %entry.name, "skipping unreadable task file"),
                }
            }
            _ => {}
        }
    }
}

fn get_json<T: serde::de::DeserializeOwned>(url: &str, token: Option<&str>) -> Option<T> {
    let mut request = ureq::get(url)
        .set("Accept", "application/vnd.github+json")
        .set("User-Agent", USER_AGENT);
    if let Some(token) = token {
        request = request.set("Authorization", &format!("Bearer {}", token));
    }

    match request.call() {
        Ok(resp) => match resp.into_json() {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(url, error = %e, "response parse failed");
                None
            }
        },
        Err(e) => {
            debug!(url, error = %e, "request failed");
            None
        }
    }
}
