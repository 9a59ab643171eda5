//! The content-store boundary: listing and fetching source documents.
//!
//! The indexer only ever needs two operations from the remote side — list
//! the names in the container and fetch the bytes for one name — so that
//! is the whole [`ContentStore`] trait. [`AzureBlobStore`] talks to an
//! Azure Blob container over its REST interface using a SAS token;
//! [`MemoryStore`] backs tests and local experiments.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Url;

/// A remote collection of named documents.
///
/// Listing failures are fatal to an indexing run (there is nothing to do
/// without an inventory); fetch failures are contained per file by the
/// caller.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All document names currently in the store.
    async fn list(&self) -> Result<Vec<String>>;

    /// The raw bytes of one document.
    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;
}

/// Azure Blob Storage container accessed with a SAS token.
///
/// The SAS token authorizes list and read; download links handed to users
/// are the plain blob URLs without the token, matching how the container
/// is published.
#[derive(Debug, Clone)]
pub struct AzureBlobStore {
    http: reqwest::Client,
    endpoint: String,
    sas_query: String,
}

impl AzureBlobStore {
    pub fn new(account: &str, container: &str, sas_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("https://{account}.blob.core.windows.net/{container}"),
            sas_query: sas_token.trim_start_matches('?').to_string(),
        }
    }

    /// Base URL that download references are built from (no SAS token).
    pub fn resource_base(&self) -> String {
        self.endpoint.clone()
    }

    fn blob_url(&self, name: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).context("invalid store endpoint")?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("store endpoint cannot be a base URL"))?;
            for segment in name.split('/') {
                segments.push(segment);
            }
        }
        url.set_query(Some(&self.sas_query));
        Ok(url)
    }
}

#[async_trait]
impl ContentStore for AzureBlobStore {
    async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut marker = String::new();

        // The list call pages; follow NextMarker until exhausted.
        loop {
            let mut query = format!("restype=container&comp=list&{}", self.sas_query);
            if !marker.is_empty() {
                query.push_str("&marker=");
                query.push_str(&marker);
            }
            let url = format!("{}?{}", self.endpoint, query);

            let response = self
                .http
                .get(&url)
                .send()
                .await
                .context("listing blob container")?
                .error_for_status()
                .context("blob container list rejected")?;
            let body = response.text().await.context("reading blob listing")?;

            let page = parse_blob_listing(&body)?;
            names.extend(page.names);
            match page.next_marker {
                Some(next) if !next.is_empty() => marker = next,
                _ => break,
            }
        }

        tracing::debug!(count = names.len(), "listed blob container");
        Ok(names)
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.blob_url(name)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("fetching blob {name}"))?
            .error_for_status()
            .with_context(|| format!("blob {name} fetch rejected"))?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("reading blob {name}"))?;
        Ok(bytes.to_vec())
    }
}

struct BlobListing {
    names: Vec<String>,
    next_marker: Option<String>,
}

/// Pull `<Name>` entries (and `NextMarker`) out of the container listing XML.
fn parse_blob_listing(xml: &str) -> Result<BlobListing> {
    let mut reader = Reader::from_str(xml);
    let mut names = Vec::new();
    let mut next_marker = None;
    let mut current: Option<&'static str> = None;

    loop {
        match reader.read_event().context("parsing blob listing XML")? {
            Event::Start(e) => {
                current = match e.local_name().as_ref() {
                    b"Name" => Some("name"),
                    b"NextMarker" => Some("marker"),
                    _ => None,
                };
            }
            Event::Text(t) => {
                let text = t.unescape().context("decoding blob listing text")?;
                match current {
                    Some("name") => names.push(text.into_owned()),
                    Some("marker") => next_marker = Some(text.into_owned()),
                    _ => {}
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(BlobListing { names, next_marker })
}

/// In-memory store for tests and demos. Names list in sorted order so
/// runs are deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>, B: Into<Vec<u8>>>(&mut self, name: S, bytes: B) {
        self.documents.insert(name.into(), bytes.into());
    }

    pub fn remove(&mut self, name: &str) {
        self.documents.remove(name);
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.documents.keys().cloned().collect())
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        self.documents
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such document: {name}"))
    }
}
