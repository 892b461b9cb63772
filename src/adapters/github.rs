use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
// Timeline events still sit behind the mockingbird preview media type.
const ACCEPT_TIMELINE: &str = "application/vnd.github.mockingbird-preview+json";
const PER_PAGE: u32 = 100;
const USER_AGENT: &str = concat!("pr-etl/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
pub struct Pull {
    pub number: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub head: Head,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Head {
    pub repo: Option<HeadRepo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadRepo {
    pub full_name: Option<String>,
}

impl Pull {
    /// Full name of the head repository; empty when the fork is gone.
    pub fn head_repo_full_name(&self) -> String {
        self.head
            .repo
            .as_ref()
            .and_then(|r| r.full_name.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineEvent {
    pub event: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub label: Option<Label>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: Option<String>,
}

impl TimelineEvent {
    pub fn label_name(&self) -> Option<&str> {
        self.label.as_ref().and_then(|l| l.name.as_deref())
    }
}

/// Thin client over the forge REST API: auth headers, media types, pagination.
pub struct GithubClient {
    client: Client,
    base: String,
    repo: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(base: String, repo: String, token: Option<String>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            repo,
            token,
        })
    }

    /// All pull requests of the tracked repo, any state, newest first.
    pub async fn list_pulls(&self) -> Result<Vec<Pull>> {
        let url = format!("{}/repos/{}/pulls", self.base, self.repo);
        self.get_paged(&url, ACCEPT_JSON, &[("state", "all")]).await
    }

    /// Issue timeline for a single PR.
    pub async fn issue_timeline(&self, number: u64) -> Result<Vec<TimelineEvent>> {
        let url = format!("{}/repos/{}/issues/{}/timeline", self.base, self.repo, number);
        self.get_paged(&url, ACCEPT_TIMELINE, &[]).await
    }

    /// Follow the page parameter until the API returns an empty page.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        url: &str,
        accept: &str,
        extra: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut page: u32 = 1;
        loop {
            tracing::debug!("Fetching page {} of {}", page, url);
            let mut query: Vec<(&str, String)> = extra
                .iter()
                .map(|(k, v)| (*k, v.to_string()))
                .collect();
            query.push(("per_page", PER_PAGE.to_string()));
            query.push(("page", page.to_string()));

            let mut request = self.client.get(url).header(ACCEPT, accept).query(&query);
            if let Some(token) = &self.token {
                request = request.header(AUTHORIZATION, format!("token {}", token));
            }

            let response = request.send().await?.error_for_status()?;
            let batch: Vec<T> = response.json().await?;
            if batch.is_empty() {
                break;
            }
            out.extend(batch);
            page += 1;
        }
        Ok(out)
    }
}
