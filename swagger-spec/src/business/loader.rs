//! Fetching of documents referenced from outside the root document.

use crate::utils::config::FetchConfig;
use crate::utils::error::{Result, SpecError};
use once_cell::unsync::OnceCell;
use reqwest::blocking::Client;
use std::time::Duration;
use url::Url;

/// Fetches the raw bytes of the document at `uri` (fragment already stripped).
pub trait DocLoader {
    fn load(&self, uri: &str) -> Result<Vec<u8>>;
}

impl<F> DocLoader for F
where
    F: Fn(&str) -> Result<Vec<u8>>,
{
    fn load(&self, uri: &str) -> Result<Vec<u8>> {
        self(uri)
    }
}

/// Default loader: `file://` from disk, `http(s)://` with a blocking GET.
pub struct HttpFileLoader {
    config: FetchConfig,
    client: OnceCell<Client>,
}

impl HttpFileLoader {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            config: config.clone(),
            client: OnceCell::new(),
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| {
            Client::builder()
                .timeout(Duration::from_secs(self.config.timeout_secs))
                .user_agent(self.config.user_agent.clone())
                .build()
                .map_err(SpecError::from)
        })
    }

    fn load_file(&self, url: &Url) -> Result<Vec<u8>> {
        if !self.config.allow_file {
            return Err(SpecError::fetch(url.as_str(), "file access is disabled"));
        }
        let path = url
            .to_file_path()
            .map_err(|_| SpecError::fetch(url.as_str(), "not a local file path"))?;
        std::fs::read(&path).map_err(|e| SpecError::fetch(url.as_str(), e.to_string()))
    }

    fn load_http(&self, url: &Url) -> Result<Vec<u8>> {
        if !self.config.allow_remote {
            return Err(SpecError::fetch(url.as_str(), "remote fetching is disabled"));
        }
        let response = self.client()?.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SpecError::fetch(
                url.as_str(),
                format!("unexpected HTTP status {}", status),
            ));
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl Default for HttpFileLoader {
    fn default() -> Self {
        Self::new(&FetchConfig::default())
    }
}

impl DocLoader for HttpFileLoader {
    fn load(&self, uri: &str) -> Result<Vec<u8>> {
        let url = Url::parse(uri)
            .map_err(|e| SpecError::fetch(uri, format!("not an absolute URI: {}", e)))?;
        tracing::debug!("Loading document {}", url);
        match url.scheme() {
            "file" => self.load_file(&url),
            "http" | "https" => self.load_http(&url),
            other => Err(SpecError::fetch(uri, format!("unsupported scheme '{}'", other))),
        }
    }
}
