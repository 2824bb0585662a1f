//! WebDAV client over `reqwest`.

use std::{path::Path, time::Duration};

use {
    async_trait::async_trait,
    http::{
        Method, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    reqwest::{Body, RequestBuilder, redirect},
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info},
    url::Url,
};

use crate::{
    Error, Result,
    store::{RemoteEntry, RemoteStore},
};

const DAV_NS: &str = "DAV:";

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:"><d:prop><d:resourcetype/></d:prop></d:propfind>"#;

/// WebDAV client rooted at a base collection URL.
pub struct WebDavClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: Secret<String>,
}

impl std::fmt::Debug for WebDavClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDavClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl WebDavClient {
    /// Build a client for `base_url`. An empty `username` disables basic auth.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: Secret<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut url = Url::parse(base_url).map_err(|e| Error::invalid_url(base_url, e))?;
        if url.cannot_be_a_base() {
            return Err(Error::invalid_url(base_url, "URL cannot be a base"));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        // Redirects are reported, not followed: reqwest rewrites
        // PROPFIND/MKCOL to GET when following a 301.
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            base_url: url,
            username: username.into(),
            password,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resource_url(&self, path: &str, collection: bool) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::invalid_url(self.base_url.as_str(), "URL cannot be a base"))?;
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
            if collection {
                segments.push("");
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(self.password.expose_secret()))
        }
    }

    fn propfind(&self, url: Url, depth: &'static str) -> Result<RequestBuilder> {
        Ok(self
            .request(Method::from_bytes(b"PROPFIND")?, url)
            .header("Depth", depth)
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(PROPFIND_BODY))
    }

    /// Whether an href from a listing points at the base collection itself.
    fn is_root_href(&self, href_path: &str) -> bool {
        decode(href_path.trim_matches('/')) == decode(self.base_url.path().trim_matches('/'))
    }
}

fn unexpected(method: &'static str, path: &str, status: StatusCode) -> Error {
    Error::UnexpectedStatus {
        method,
        path: path.to_string(),
        status: status.as_u16(),
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Path component of an href, which servers send either absolute or as a path.
fn href_path(href: &str) -> String {
    if (href.starts_with("http://") || href.starts_with("https://"))
        && let Ok(url) = Url::parse(href)
    {
        return url.path().to_string();
    }
    href.to_string()
}

#[async_trait]
impl RemoteStore for WebDavClient {
    async fn exists(&self, path: &str) -> Result<bool> {
        let url = self.resource_url(path, false)?;
        let response = self.propfind(url, "0")?.send().await?;
        let status = response.status();
        debug!(path, status = status.as_u16(), "PROPFIND depth 0");

        match status {
            StatusCode::NOT_FOUND => Ok(false),
            // Collections addressed without a trailing slash redirect to it.
            s if s.is_success() || s.is_redirection() => Ok(true),
            s => Err(unexpected("PROPFIND", path, s)),
        }
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        let url = self.resource_url(path, true)?;
        let response = self
            .request(Method::from_bytes(b"MKCOL")?, url)
            .send()
            .await?;

        match response.status() {
            StatusCode::METHOD_NOT_ALLOWED => {
                debug!(path, "directory already exists");
                Ok(())
            },
            s if s.is_success() => {
                info!(path, "created remote directory");
                Ok(())
            },
            s => Err(unexpected("MKCOL", path, s)),
        }
    }

    async fn list_top_level(&self) -> Result<Vec<RemoteEntry>> {
        let url = self.resource_url("", true)?;
        let response = self.propfind(url, "1")?.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(unexpected("PROPFIND", "/", status));
        }

        let body = response.text().await?;
        let entries: Vec<RemoteEntry> = parse_multistatus(&body)?
            .into_iter()
            .filter_map(|resource| {
                let path = href_path(&resource.href);
                if self.is_root_href(&path) {
                    return None;
                }
                let raw_name = path.trim_end_matches('/').rsplit('/').next()?;
                if raw_name.is_empty() {
                    return None;
                }
                Some(RemoteEntry {
                    name: decode(raw_name),
                    is_directory: resource.is_collection,
                })
            })
            .collect();

        debug!(count = entries.len(), "listed remote root");
        Ok(entries)
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        let file = tokio::fs::File::open(local_path).await?;
        let size = file.metadata().await?.len();
        let url = self.resource_url(remote_path, false)?;

        let response = self
            .request(Method::PUT, url)
            .header(CONTENT_LENGTH, size)
            .body(Body::from(file))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {
                info!(remote_path, size, "uploaded file");
                Ok(())
            },
            s => Err(unexpected("PUT", remote_path, s)),
        }
    }
}

/// One `DAV:response` of a multistatus body.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DavResource {
    /// Href as sent by the server, entities resolved but still percent-encoded.
    href: String,
    is_collection: bool,
}

/// Read the responses of a `207 Multi-Status` body.
fn parse_multistatus(body: &str) -> Result<Vec<DavResource>> {
    let doc = roxmltree::Document::parse(body).map_err(Error::malformed)?;
    let root = doc.root_element();
    if !root.has_tag_name((DAV_NS, "multistatus")) {
        return Err(Error::malformed("root element is not DAV:multistatus"));
    }

    root.children()
        .filter(|node| node.has_tag_name((DAV_NS, "response")))
        .map(|response| {
            let href = response
                .children()
                .find(|node| node.has_tag_name((DAV_NS, "href")))
                .and_then(|node| node.text())
                .map(str::trim)
                .filter(|href| !href.is_empty())
                .ok_or_else(|| Error::malformed("response without href"))?;
            let is_collection = response
                .descendants()
                .any(|node| node.has_tag_name((DAV_NS, "collection")));
            Ok(DavResource {
                href: href.to_string(),
                is_collection,
            })
        })
        .collect()
}
