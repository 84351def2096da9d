//! Gist-backed [`RemoteStore`].
//!
//! The whole document is one gist with two files. Reads use `GET
//! /gists/{id}`, writes re-supply both files in a single `PATCH`, which the
//! service applies as one revision. The entity tag of each reply is kept as the
//! document [`Version`] and sent back as `If-Match` on the next write.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use http::header::{self, HeaderMap, HeaderValue};
use http::StatusCode;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::error::{Result, SyncError};
use crate::model::Document;
use crate::store::{RemoteStore, Snapshot, Version};
use crate::{ENTRIES_FILE, PROJECTS_FILE};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GistConfig {
    pub api_url: String,
    pub token: String,
    pub gist_id: String,
    pub timeout_secs: u64,
    /// Send `If-Match` on writes. Turn off for services that ignore or
    /// mishandle conditional requests.
    pub conditional_writes: bool,
}

impl Default for GistConfig {
    fn default() -> Self {
        GistConfig {
            api_url: DEFAULT_API_URL.to_string(),
            token: String::new(),
            gist_id: String::new(),
            timeout_secs: 30,
            conditional_writes: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Gist {
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct GistUpdate<'a> {
    files: BTreeMap<&'a str, FileContent>,
}

#[derive(Debug, Serialize)]
struct FileContent {
    content: String,
}

pub struct GistStore {
    config: GistConfig,
    client: Client,
}

impl GistStore {
    pub fn new(config: GistConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.token)).map_err(|_| {
            SyncError::RemoteUnavailable("token contains characters not allowed in a header".into())
        })?;
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(GistStore { config, client })
    }

    fn gist_url(&self) -> String {
        format!(
            "{}/gists/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.gist_id
        )
    }

    /// Content of a named file, following `raw_url` when the API truncated it.
    async fn file_content(&self, gist: &Gist, name: &str) -> Result<Option<String>> {
        let file = match gist.files.get(name) {
            Some(file) => file,
            None => return Ok(None),
        };

        if !file.truncated {
            return match &file.content {
                Some(content) => Ok(Some(content.clone())),
                None => Err(SyncError::MalformedDocument(format!("{} has no content", name))),
            };
        }

        let raw_url = file.raw_url.as_deref().ok_or_else(|| {
            SyncError::MalformedDocument(format!("{} is truncated without a raw_url", name))
        })?;
        debug!(file = name, "fetching truncated file");
        let response = check_status(self.client.get(raw_url).send().await?).await?;
        Ok(Some(response.text().await?))
    }
}

#[async_trait]
impl RemoteStore for GistStore {
    #[instrument(skip(self), fields(gist_id = %self.config.gist_id))]
    async fn read(&self) -> Result<Snapshot> {
        let response = self.client.get(&self.gist_url()).send().await.map_err(|e| {
            error!(error = %e, "gist read failed");
            SyncError::from(e)
        })?;
        let response = check_status(response).await?;
        let version = entity_tag(&response);

        let gist: Gist = response.json().await.map_err(|e| {
            if e.is_decode() {
                SyncError::MalformedDocument(e.to_string())
            } else {
                SyncError::from(e)
            }
        })?;

        let entries = self.file_content(&gist, ENTRIES_FILE).await?;
        let projects = self.file_content(&gist, PROJECTS_FILE).await?;
        if projects.is_none() {
            warn!("{} missing, deriving projects from entries", PROJECTS_FILE);
        }
        let document = Document::from_files(entries.as_deref(), projects.as_deref())?;

        debug!(
            entries = document.entries.len(),
            projects = document.projects.len(),
            "gist read"
        );
        Ok(Snapshot { document, version })
    }

    #[instrument(skip(self, document), fields(gist_id = %self.config.gist_id))]
    async fn write(
        &self,
        document: &Document,
        expected: Option<&Version>,
    ) -> Result<Option<Version>> {
        let mut files = BTreeMap::new();
        files.insert(ENTRIES_FILE, FileContent { content: document.entries_json()? });
        files.insert(PROJECTS_FILE, FileContent { content: document.projects_json()? });
        let body = GistUpdate { files };

        let mut request = self
            .client
            .patch(&self.gist_url())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);
        if self.config.conditional_writes {
            if let Some(version) = expected {
                request = request.header(header::IF_MATCH, version.0.as_str());
            }
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "gist write failed");
            SyncError::from(e)
        })?;
        let response = check_status(response).await?;

        debug!(entries = document.entries.len(), "gist written");
        Ok(entity_tag(&response))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::PRECONDITION_FAILED {
        warn!("remote document changed since last read");
        return Err(SyncError::Conflict);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(%status, "remote store returned an error");
        return Err(SyncError::RemoteUnavailable(format!("status {}: {}", status, body)));
    }
    Ok(response)
}

fn entity_tag(response: &Response) -> Option<Version> {
    response
        .headers()
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| Version(v.to_string()))
}
