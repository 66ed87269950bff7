//! HTTP content API client
//!
//! Talks to a GitHub-style repository contents endpoint:
//!
//! - `GET  {api}/repos/{owner}/{repo}/contents/{path}?ref={branch}` returns the
//!   base64 file content and its blob `sha`, which serves as the revision.
//! - `PUT  {api}/repos/{owner}/{repo}/contents/{path}` with
//!   `{message, content, branch, sha?}` writes the file. The service rejects
//!   the write when `sha` is stale (409) or missing for an existing file (422).

use super::remote::{ContentApi, RemoteFile};
use super::Revision;
use crate::config::RemoteConfig;
use crate::error::{KbError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

const USER_AGENT: &str = concat!("kbase/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: Option<String>,
    sha: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

/// Content API client over HTTP
pub struct HttpContentApi {
    config: RemoteConfig,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpContentApi {
    /// Create a client. `token` is the bearer credential; without one, reads
    /// go out unauthenticated and writes fail with `AuthError`.
    pub fn new(config: RemoteConfig, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| KbError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            token: token.filter(|t| !t.trim().is_empty()),
            client,
        })
    }

    fn contents_url(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| KbError::Config(format!("Invalid api_url '{}': {e}", self.config.api_url)))?;

        url.path_segments_mut()
            .map_err(|_| KbError::Config(format!("api_url '{}' cannot be a base", self.config.api_url)))?
            .pop_if_empty()
            .extend([
                "repos",
                self.config.owner.as_str(),
                self.config.repo.as_str(),
                "contents",
            ])
            .extend(path.split('/'));

        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn error_from_response(
        path: &str,
        expected: Option<&Revision>,
        response: reqwest::Response,
    ) -> KbError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND => KbError::not_found(path),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                KbError::AuthError(format!("{status} for {path}: {body}"))
            }
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => KbError::Conflict {
                path: path.to_string(),
                expected: expected.map_or("<absent>".to_string(), |r| r.to_string()),
                actual: "<unknown>".to_string(),
            },
            _ => KbError::Remote {
                status: status.as_u16(),
                message: body,
            },
        }
    }

    fn transport_error(err: reqwest::Error) -> KbError {
        KbError::Remote {
            status: err.status().map_or(0, |s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn fetch(&self, path: &str) -> Result<Option<RemoteFile>> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.config.branch);

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(path, None, response).await);
        }

        let body: ContentResponse = response.json().await.map_err(|e| {
            KbError::malformed(path, format!("unexpected contents response: {e}"))
        })?;

        if let Some(encoding) = body.encoding.as_deref() {
            if encoding != "base64" {
                return Err(KbError::malformed(
                    path,
                    format!("unsupported content encoding '{encoding}'"),
                ));
            }
        }

        let encoded: String = body
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let content = BASE64
            .decode(encoded)
            .map_err(|e| KbError::malformed(path, format!("invalid base64 content: {e}")))?;

        Ok(Some(RemoteFile {
            content,
            revision: Revision::new(body.sha),
        }))
    }

    async fn store(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&Revision>,
        message: &str,
    ) -> Result<Revision> {
        if self.token.is_none() {
            return Err(KbError::AuthError(format!(
                "writing {path} requires a token (set KBASE_TOKEN)"
            )));
        }

        let request = PutRequest {
            message,
            content: BASE64.encode(content),
            branch: &self.config.branch,
            sha: expected.map(|r| r.as_str()),
        };

        let response = self
            .authorize(self.client.put(self.contents_url(path)?))
            .json(&request)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(path, expected, response).await);
        }

        let body: PutResponse = response
            .json()
            .await
            .map_err(|e| KbError::malformed(path, format!("unexpected write response: {e}")))?;
        Ok(Revision::new(body.content.sha))
    }
}
