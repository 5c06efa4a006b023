// src/sources/drugs_fda.rs - Client for the public drug-application API: approval-letter locations
use anyhow::{bail, Context, Result};
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.fda.gov/drug";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = "exclusivity-matching/0.1";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrugsFdaResponse {
    #[serde(default)]
    pub results: Vec<ApplicationResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationResult {
    pub application_number: Option<String>,
    #[serde(default)]
    pub sponsor_name: Option<String>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submission {
    pub submission_type: Option<String>,
    pub submission_status_date: Option<String>,
    #[serde(default)]
    pub application_docs: Vec<ApplicationDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationDoc {
    pub id: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DrugsFdaConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for DrugsFdaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl DrugsFdaConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("DRUGS_FDA_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: env::var("DRUGS_FDA_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            request_timeout_secs: env::var("DRUGS_FDA_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Search term with the ANDA prefix, added when missing.
pub fn anda_search_term(application_number: &str) -> String {
    let trimmed = application_number.trim();
    match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("ANDA") => format!("ANDA{}", &trimmed[4..]),
        _ => format!("ANDA{}", trimmed),
    }
}

/// Approval-letter PDF locations across all submissions, in response order.
pub fn approval_letter_urls(response: &DrugsFdaResponse) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for url in response
        .results
        .iter()
        .flat_map(|r| r.submissions.iter())
        .flat_map(|s| s.application_docs.iter())
        .filter_map(|doc| doc.url.as_deref())
    {
        let is_letter = url.contains("/appletter/") && url.to_lowercase().ends_with(".pdf");
        if is_letter && !urls.iter().any(|known| known == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// Moves letters filed under the approval year (".../appletter/<year>/...") to the front.
pub fn rank_by_year(urls: Vec<String>, approval_year: Option<i32>) -> Vec<String> {
    let Some(year) = approval_year else {
        return urls;
    };
    let marker = format!("/{}/", year);
    let (mut in_year, others): (Vec<String>, Vec<String>) =
        urls.into_iter().partition(|url| url.contains(&marker));
    in_year.extend(others);
    in_year
}

pub struct DrugsFdaClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl DrugsFdaClient {
    pub fn new(config: &DrugsFdaConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid API base URL '{}'", config.base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn search_url(&self, application_number: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join("drugsfda.json")
            .context("Failed to build search URL")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(
                "search",
                &format!("application_number:{}", anda_search_term(application_number)),
            );
            query.append_pair("limit", "1");
            if let Some(key) = &self.api_key {
                query.append_pair("api_key", key);
            }
        }
        Ok(url)
    }

    /// `None` when the API knows no such application.
    pub async fn search_application(
        &self,
        application_number: &str,
    ) -> Result<Option<DrugsFdaResponse>> {
        let url = self.search_url(application_number)?;
        debug!("Querying {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", application_number))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            bail!("API returned status {} for {}", response.status(), application_number);
        }
        let parsed: DrugsFdaResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse API response for {}", application_number))?;
        Ok(Some(parsed))
    }

    pub async fn resolve_letters(
        &self,
        application_number: &str,
        approval_year: Option<i32>,
    ) -> Result<Vec<String>> {
        let urls = match self.search_application(application_number).await? {
            Some(response) => approval_letter_urls(&response),
            None => Vec::new(),
        };
        if urls.is_empty() {
            debug!("✗ No approval letter found for {}", application_number);
        } else {
            info!("✓ Found {} letter(s) for {}", urls.len(), application_number);
        }
        Ok(rank_by_year(urls, approval_year))
    }

    pub async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Download failed for {}", url))?;
        if !response.status().is_success() {
            bail!("Download of {} returned status {}", url, response.status());
        }
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        tokio::fs::write(destination, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", destination.display()))?;
        Ok(bytes.len() as u64)
    }
}
