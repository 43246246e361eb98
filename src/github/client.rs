//! Authenticated REST gateway for the repository-hosting API.
//!
//! `call` never fails on a non-2xx status: a 404 from the merge endpoint is
//! an answer, not an error. Only transport failures are errors here.

use crate::error::{GitHubError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::OnceLock;
use url::Url;

const ACCEPT_V3: &str = "application/vnd.github.v3+json";
const API_VERSION: &str = "2022-11-28";

/// One-time initialization guard for rustls crypto provider
static RUSTLS_INITIALIZED: OnceLock<()> = OnceLock::new();

/// HTTP methods the suite issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// DELETE
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        })
    }
}

/// Raw response: status plus body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// API path the request was sent to
    pub path: String,
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl ApiResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body, reporting a shape mismatch as a setup failure
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            GitHubError::UnexpectedShape {
                path: self.path.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Decode a 2xx body, or fail with the unexpected status
    pub fn expect_json<T: DeserializeOwned>(&self, method: Method) -> Result<T> {
        if !self.is_success() {
            return Err(self.unexpected(method));
        }
        self.json()
    }

    /// Error describing this response as unexpected
    pub fn unexpected(&self, method: Method) -> crate::error::E2eError {
        let mut body = self.body.clone();
        if body.len() > 512 {
            let mut cut = 512;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push('…');
        }
        GitHubError::UnexpectedStatus {
            method: method.to_string(),
            path: self.path.clone(),
            status: self.status,
            body,
        }
        .into()
    }
}

/// Thin authenticated client
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a client for `base` authenticating with `token`
    pub fn new(base: Url, token: impl Into<String>) -> Result<Self> {
        RUSTLS_INITIALIZED.get_or_init(|| {
            // Err means a provider is already installed, which is fine.
            let _ = rustls::crypto::ring::default_provider().install_default();
        });

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V3));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("chart-owners-e2e/", env!("CARGO_PKG_VERSION"))),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GitHubError::Transport {
                method: "INIT".to_string(),
                path: base.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base,
            token: token.into(),
        })
    }

    /// Issue a request with bearer auth; `path` is relative to the base
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse> {
        let path = path.trim_start_matches('/');
        let url = self.base.join(path).map_err(|e| GitHubError::InvalidBaseUrl {
            url: format!("{}{}", self.base, path),
            reason: e.to_string(),
        })?;

        log::debug!("{method} {path}");

        let mut request = match method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Delete => self.http.delete(url),
        }
        .header(AUTHORIZATION, format!("Bearer {}", self.token));

        if let Some(body) = body {
            request = request.json(body);
        }

        let transport = |e: reqwest::Error| GitHubError::Transport {
            method: method.to_string(),
            path: path.to_string(),
            reason: e.without_url().to_string(),
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport)?;

        log::debug!("{method} {path} -> {status}");

        Ok(ApiResponse {
            path: path.to_string(),
            status,
            body: text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            path: "repos/acme/sandbox/pulls/1".to_string(),
            status,
            body: body.to_string(),
        }
    }

    #[derive(Debug, Deserialize)]
    struct Numbered {
        number: u64,
    }

    #[test]
    fn test_json_decodes_body() {
        let n: Numbered = response(201, r#"{"number": 12}"#).json().unwrap();
        assert_eq!(n.number, 12);
    }

    #[test]
    fn test_shape_mismatch_is_setup_error() {
        let err = response(200, r#"{"title": "x"}"#).json::<Numbered>().unwrap_err();
        assert!(matches!(
            err,
            crate::error::E2eError::GitHub(GitHubError::UnexpectedShape { .. })
        ));
    }

    #[test]
    fn test_expect_json_rejects_non_success() {
        let err = response(422, r#"{"message": "Validation Failed"}"#)
            .expect_json::<Numbered>(Method::Post)
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("422"));
        assert!(text.contains("POST"));
    }

    #[test]
    fn test_unexpected_body_is_truncated() {
        let long = "x".repeat(2000);
        let err = response(500, &long).unexpected(Method::Get);
        assert!(err.to_string().len() < 700);
    }

    #[test]
    fn test_client_debug_hides_token() {
        let client = GitHubClient::new(
            Url::parse("https://api.github.com/").unwrap(),
            "ghp_secret",
        )
        .unwrap();
        assert!(!format!("{client:?}").contains("ghp_secret"));
    }
}
