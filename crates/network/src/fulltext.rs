//! Open-access full-text lookup and download
//!
//! PDF locations come from Unpaywall (`best_oa_location.url_for_pdf`). The
//! [`Downloader`] stores PDFs under the data directory as
//! `<safe_filename(doi)>.pdf` and remembers DOIs without an open-access copy
//! in `no_oa.txt` so later runs skip them.

use crate::errors::FullTextError;
use crate::models::{WorkId, WorkRecord};
use crate::openalex::WorkLookup;
use async_trait::async_trait;
use citeforge_common::errors::{AppError, Result as AppResult};
use citeforge_common::USER_AGENT;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Name of the skip list inside the data directory
pub const NO_OA_FILE: &str = "no_oa.txt";

/// Where full texts come from
#[async_trait]
pub trait FullTextSource: Send + Sync {
    /// Whether an open-access PDF is known for the work
    async fn has_fulltext(&self, work: &WorkRecord) -> Result<bool, FullTextError>;

    /// PDF bytes, or `None` when no open-access copy is available
    async fn fetch_fulltext(&self, work: &WorkRecord) -> Result<Option<Vec<u8>>, FullTextError>;
}

#[derive(Debug, Deserialize)]
struct UnpaywallRecord {
    best_oa_location: Option<UnpaywallLocation>,
}

#[derive(Debug, Deserialize)]
struct UnpaywallLocation {
    url_for_pdf: Option<String>,
}

/// Unpaywall REST client
pub struct UnpaywallClient {
    client: reqwest::Client,
    base_url: String,
    email: Option<String>,
}

impl UnpaywallClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, email: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email,
        }
    }

    /// Client with its own timeout and user agent
    pub fn with_timeout(base_url: impl Into<String>, email: Option<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self::new(client, base_url, email))
    }

    /// Open-access PDF link for a bare DOI
    pub async fn pdf_url(&self, doi: &str) -> Result<Option<String>, FullTextError> {
        let url = format!("{}/v2/{}", self.base_url, doi);
        let mut request = self.client.get(&url);
        if let Some(email) = &self.email {
            request = request.query(&[("email", email)]);
        }

        let response = request.send().await?;
        if !check_status(response.status(), &url)? {
            debug!(doi, status = response.status().as_u16(), "Unpaywall has no record");
            return Ok(None);
        }

        let record: UnpaywallRecord = match response.json().await {
            Ok(record) => record,
            Err(e) => {
                warn!(doi, error = %e, "Undecodable Unpaywall record");
                return Ok(None);
            }
        };

        Ok(record.best_oa_location.and_then(|location| location.url_for_pdf))
    }
}

#[async_trait]
impl FullTextSource for UnpaywallClient {
    async fn has_fulltext(&self, work: &WorkRecord) -> Result<bool, FullTextError> {
        match work.bare_doi() {
            Some(doi) => Ok(self.pdf_url(doi).await?.is_some()),
            None => Ok(false),
        }
    }

    async fn fetch_fulltext(&self, work: &WorkRecord) -> Result<Option<Vec<u8>>, FullTextError> {
        let Some(doi) = work.bare_doi() else {
            return Ok(None);
        };
        let Some(url) = self.pdf_url(doi).await? else {
            return Ok(None);
        };

        let response = self.client.get(&url).send().await?;
        if !check_status(response.status(), &url)? {
            warn!(doi, url = %url, status = response.status().as_u16(), "PDF download refused");
            return Ok(None);
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }
}

/// `Ok(true)` on success, `Ok(false)` when the resource is refused for good
///
/// Rate limiting and server errors are returned as errors so the work is
/// counted as failed and stays off the skip list.
pub(crate) fn check_status(status: StatusCode, url: &str) -> Result<bool, FullTextError> {
    if status.is_success() {
        return Ok(true);
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Err(FullTextError::Unavailable {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(false)
}

/// File-system safe name for a DOI
pub fn safe_filename(doi: &str) -> String {
    doi.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Outcome of a download run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadReport {
    /// Works whose PDF is on disk
    pub available: Vec<WorkId>,
    pub no_doi: usize,
    pub not_open_access: usize,
    pub failed: usize,
}

/// Fetches PDFs for a list of works into a data directory
pub struct Downloader {
    metadata: Arc<dyn WorkLookup>,
    source: Arc<dyn FullTextSource>,
    data_dir: PathBuf,
}

impl Downloader {
    pub fn new(metadata: Arc<dyn WorkLookup>, source: Arc<dyn FullTextSource>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            metadata,
            source,
            data_dir: data_dir.into(),
        }
    }

    pub fn pdf_path(&self, doi: &str) -> PathBuf {
        self.data_dir.join(format!("{}.pdf", safe_filename(doi)))
    }

    fn skip_list_path(&self) -> PathBuf {
        self.data_dir.join(NO_OA_FILE)
    }

    async fn read_skip_list(&self) -> Result<HashSet<String>, FullTextError> {
        match tokio::fs::read_to_string(self.skip_list_path()).await {
            Ok(raw) => Ok(raw
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn append_skip_list(&self, doi: &str) -> Result<(), FullTextError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.skip_list_path())
            .await?;
        file.write_all(format!("{}\n", doi).as_bytes()).await?;
        Ok(())
    }

    /// Download every work's PDF that is not already on disk
    ///
    /// Metadata and download failures are logged and counted; only local
    /// I/O errors abort the run.
    pub async fn download(&self, works: &[WorkId]) -> Result<DownloadReport, FullTextError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let mut skip = self.read_skip_list().await?;
        let mut report = DownloadReport::default();

        for id in works {
            let record = match self.metadata.work(id).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(work_id = %id, error = %e, "Metadata lookup failed");
                    report.failed += 1;
                    continue;
                }
            };

            let Some(doi) = record.bare_doi() else {
                info!(work_id = %id, "Work has no DOI");
                report.no_doi += 1;
                continue;
            };

            if skip.contains(doi) {
                debug!(work_id = %id, doi, "Work not open access");
                report.not_open_access += 1;
                continue;
            }

            let path = self.pdf_path(doi);
            if exists(&path).await {
                debug!(work_id = %id, path = %path.display(), "PDF already on disk");
                report.available.push(id.clone());
                continue;
            }

            match self.source.fetch_fulltext(&record).await {
                Ok(Some(bytes)) => {
                    write_atomic(&path, &bytes).await?;
                    info!(work_id = %id, bytes = bytes.len(), path = %path.display(), "Downloaded paper");
                    report.available.push(id.clone());
                }
                Ok(None) => {
                    info!(work_id = %id, doi, "Paper not found, adding to skip list");
                    self.append_skip_list(doi).await?;
                    skip.insert(doi.to_string());
                    report.not_open_access += 1;
                }
                Err(e) => {
                    warn!(work_id = %id, doi, error = %e, "Download failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            requested = works.len(),
            available = report.available.len(),
            no_doi = report.no_doi,
            not_open_access = report.not_open_access,
            failed = report.failed,
            "Download run finished"
        );
        Ok(report)
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Write next to `path` and rename into place, so `path` only ever holds a
/// complete file
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), FullTextError> {
    let partial = path.with_extension("pdf.part");
    tokio::fs::write(&partial, bytes).await?;
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    Ok(())
}
