//! Minimal WebDAV transport over blocking `reqwest`.

use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{NotebookError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:"><d:prop><d:resourcetype/></d:prop></d:propfind>"#;

/// Server address and credentials, cached in the local store as plain JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebDavConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

/// File operations the sync service needs from a remote server.
///
/// Paths are absolute within the remote root (`/notebook/data.json`).
pub trait RemoteStore: Send + Sync {
    /// Returns the hrefs of `path` and its direct children.
    fn list_dir(&self, path: &str) -> Result<Vec<String>>;
    fn exists(&self, path: &str) -> Result<bool>;
    /// Creates the collection at `path`. An existing collection is not an error.
    fn create_dir(&self, path: &str) -> Result<()>;
    /// Writes `body` to `path`, overwriting any existing file.
    fn put(&self, path: &str, body: &str) -> Result<()>;
    /// Reads `path`; `None` when the file does not exist.
    fn get(&self, path: &str) -> Result<Option<String>>;
}

pub struct WebDavClient {
    base_url: String,
    username: String,
    password: String,
    http: Client,
}

impl WebDavClient {
    /// Builds a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::InvalidConfig`] if the URL is not http(s), or
    /// [`NotebookError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &WebDavConfig) -> Result<Self> {
        Self::with_builder(config, Client::builder().timeout(REQUEST_TIMEOUT))
    }

    fn with_builder(config: &WebDavConfig, builder: ClientBuilder) -> Result<Self> {
        let url = config.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(NotebookError::InvalidConfig(format!(
                "WebDAV URL must start with http:// or https://: {url}"
            )));
        }
        let http = builder.build()?;
        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .basic_auth(&self.username, Some(&self.password))
    }

    fn propfind(&self, path: &str, depth: &str) -> Result<Response> {
        let response = self
            .request(dav_method("PROPFIND")?, path)
            .header("Depth", depth)
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(PROPFIND_BODY)
            .send()?;
        Ok(response)
    }
}

impl RemoteStore for WebDavClient {
    fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let response = self.propfind(path, "1")?;
        let response = expect_success(response, path)?;
        Ok(extract_hrefs(&response.text()?))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let response = self.propfind(path, "0")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        expect_success(response, path)?;
        Ok(true)
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        let response = self.request(dav_method("MKCOL")?, path).send()?;
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            log::debug!("MKCOL {path}: collection already exists");
            return Ok(());
        }
        expect_success(response, path)?;
        Ok(())
    }

    fn put(&self, path: &str, body: &str) -> Result<()> {
        let response = self
            .request(Method::PUT, path)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()?;
        expect_success(response, path)?;
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Option<String>> {
        let response = self.request(Method::GET, path).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success(response, path)?;
        Ok(Some(response.text()?))
    }
}

fn dav_method(name: &str) -> Result<Method> {
    Method::from_bytes(name.as_bytes())
        .map_err(|_| NotebookError::InvalidConfig(format!("Invalid HTTP method: {name}")))
}

fn expect_success(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(NotebookError::HttpStatus {
            status: status.as_u16(),
            path: path.to_string(),
        })
    }
}

/// Pulls the text of every `<href>` element out of a multistatus body,
/// whatever namespace prefix the server uses.
///
/// Hrefs are returned as they appear in the XML: entities such as `&amp;`
/// are not decoded.
fn extract_hrefs(body: &str) -> Vec<String> {
    let mut hrefs = Vec::new();
    let mut rest = body;
    while let Some(pos) = rest.find("href>") {
        let head = &rest[..pos];
        let after = &rest[pos + "href>".len()..];
        let opening = head
            .rfind('<')
            .map(|start| &head[start..])
            .is_some_and(|tag| !tag.starts_with("</") && !tag.contains('>'));
        if opening {
            if let Some(end) = after.find('<') {
                let href = after[..end].trim();
                if !href.is_empty() {
                    hrefs.push(href.to_string());
                }
            }
        }
        rest = after;
    }
    hrefs
}
