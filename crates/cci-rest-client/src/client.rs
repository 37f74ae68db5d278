// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main REST API client implementation

use reqwest::{Client as HttpClient, Method, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ClientError, ClientResult};
use cci_api_contract::{BuildPayload, ProjectPayload, User};

/// Production endpoint of the v1 API.
pub const DEFAULT_BASE_URL: &str = "https://circleci.com/api/v1/";

const TOKEN_PARAM: &str = "circle-token";

/// REST API client for CircleCI v1
#[derive(Debug, Clone)]
pub struct CircleClient {
    http_client: HttpClient,
    base_url: Url,
    token: Option<String>,
}

impl CircleClient {
    /// Create a client against the production endpoint.
    pub fn new(token: Option<String>) -> Self {
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid");
        Self::with_base_url(base_url, token)
    }

    /// Create a client against an arbitrary endpoint (tests, proxies).
    pub fn with_base_url(base_url: Url, token: Option<String>) -> Self {
        let http_client = HttpClient::builder()
            .user_agent("cci-rest-client/0.1")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            base_url,
            token,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.http_client
    }

    /// The authenticated user; used to validate an API token.
    pub async fn me(&self) -> ClientResult<User> {
        self.get("me", &[]).await
    }

    /// Followed projects, including their `branches` maps.
    pub async fn projects(&self) -> ClientResult<Vec<ProjectPayload>> {
        self.get("projects", &[]).await
    }

    /// Recent builds of a project across all branches.
    pub async fn recent_builds(
        &self,
        username: &str,
        reponame: &str,
        limit: u32,
        offset: u32,
    ) -> ClientResult<Vec<BuildPayload>> {
        self.get(
            &format!("project/{username}/{reponame}"),
            &[("limit", &limit.to_string()), ("offset", &offset.to_string())],
        )
        .await
    }

    /// Recent builds of one branch. `branch` is the raw (still
    /// percent-encoded) branch name as it appears in composite ids.
    pub async fn branch_builds(
        &self,
        username: &str,
        reponame: &str,
        branch: &str,
        limit: u32,
        offset: u32,
    ) -> ClientResult<Vec<BuildPayload>> {
        self.get(
            &format!("project/{username}/{reponame}/tree/{branch}"),
            &[("limit", &limit.to_string()), ("offset", &offset.to_string())],
        )
        .await
    }

    /// Full build detail, including steps and their actions.
    pub async fn build(
        &self,
        username: &str,
        reponame: &str,
        build_num: u64,
    ) -> ClientResult<BuildPayload> {
        self.get(&format!("project/{username}/{reponame}/{build_num}"), &[]).await
    }

    /// Re-run a build. Returns the summary of the new build.
    pub async fn retry_build(
        &self,
        username: &str,
        reponame: &str,
        build_num: u64,
    ) -> ClientResult<BuildPayload> {
        self.post(&format!("project/{username}/{reponame}/{build_num}/retry")).await
    }

    /// Cancel a running build.
    pub async fn cancel_build(
        &self,
        username: &str,
        reponame: &str,
        build_num: u64,
    ) -> ClientResult<BuildPayload> {
        self.post(&format!("project/{username}/{reponame}/{build_num}/cancel")).await
    }

    /// Clear a project's build cache. Completion only, no mapped response.
    pub async fn clear_build_cache(
        &self,
        username: &str,
        reponame: &str,
    ) -> ClientResult<()> {
        self.delete(&format!("project/{username}/{reponame}/build-cache")).await
    }

    // --- URL construction --------------------------------------------------

    /// Join a relative path and query parameters onto the base endpoint and
    /// attach authentication.
    pub fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> ClientResult<Url> {
        let mut url = self.base_url.join(path)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(self.authed_url(&url))
    }

    /// The single attach-auth step every outgoing URL goes through: any
    /// pre-existing `circle-token` parameters are stripped, then the
    /// client's token is appended once.
    pub fn authed_url(&self, url: &Url) -> Url {
        let mut authed = url.clone();
        let kept: Vec<(String, String)> = authed
            .query_pairs()
            .filter(|(name, _)| name != TOKEN_PARAM)
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        authed.set_query(None);
        if !kept.is_empty() || self.token.is_some() {
            let mut pairs = authed.query_pairs_mut();
            pairs.extend_pairs(kept);
            if let Some(token) = &self.token {
                pairs.append_pair(TOKEN_PARAM, token);
            }
        }
        authed
    }

    // --- private helpers ---------------------------------------------------

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> ClientResult<T> {
        let url = self.endpoint(path, params)?;
        self.request(Method::GET, url).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = self.endpoint(path, &[])?;
        self.request(Method::POST, url).await
    }

    async fn delete(&self, path: &str) -> ClientResult<()> {
        let url = self.endpoint(path, &[])?;
        let response = self
            .http_client
            .request(Method::DELETE, url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        self.trace(Method::DELETE, &url, &response);

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::Server { status, body })
        }
    }

    async fn request<T: DeserializeOwned>(&self, method: Method, url: Url) -> ClientResult<T> {
        let response = self
            .http_client
            .request(method.clone(), url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        self.trace(method, &url, &response);
        self.handle_response(response).await
    }

    // Request/response tracing hook. The token never reaches the log.
    fn trace(&self, method: Method, url: &Url, response: &Response) {
        tracing::debug!(
            %method,
            url = %redacted(url),
            status = %response.status(),
            "api request"
        );
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            serde_json::from_str(&text).map_err(|source| ClientError::Decode { source })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::Server { status, body })
        }
    }
}

/// Copy of `url` with any `circle-token` value masked, for diagnostics.
pub fn redacted(url: &Url) -> Url {
    if !url.query_pairs().any(|(name, _)| name == TOKEN_PARAM) {
        return url.clone();
    }
    let mut safe = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if name == TOKEN_PARAM {
                "REDACTED".to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();
    safe.set_query(None);
    safe.query_pairs_mut().extend_pairs(pairs);
    safe
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_token() -> CircleClient {
        CircleClient::new(Some("aabbccddeeff00112233445566778899aabbccdd".into()))
    }

    fn token_count(url: &Url) -> usize {
        url.query_pairs().filter(|(name, _)| name == TOKEN_PARAM).count()
    }

    #[test]
    fn endpoint_attaches_the_token_exactly_once() {
        let client = client_with_token();

        let plain = client.endpoint("projects", &[]).unwrap();
        assert_eq!(token_count(&plain), 1);

        let with_params = client
            .endpoint("project/octocat/hello", &[("limit", "30"), ("offset", "0")])
            .unwrap();
        assert_eq!(token_count(&with_params), 1);
        assert!(with_params.query().unwrap().contains("limit=30"));

        // Even a hostile caller that smuggles the parameter in can't
        // duplicate it.
        let smuggled = client
            .endpoint("me", &[("circle-token", "other"), ("a", "b")])
            .unwrap();
        assert_eq!(token_count(&smuggled), 1);
        assert!(smuggled.query().unwrap().contains("aabbccdd"));
        assert!(!smuggled.query().unwrap().contains("other"));
    }

    #[test]
    fn tokenless_client_builds_clean_urls() {
        let client = CircleClient::new(None);
        let url = client.endpoint("projects", &[]).unwrap();
        assert_eq!(token_count(&url), 0);
        assert_eq!(url.as_str(), "https://circleci.com/api/v1/projects");
    }

    #[test]
    fn relative_paths_join_the_versioned_base() {
        let client = CircleClient::new(None);
        let url = client.endpoint("project/octocat/hello/42", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://circleci.com/api/v1/project/octocat/hello/42"
        );
    }

    #[test]
    fn redaction_masks_the_token_value() {
        let client = client_with_token();
        let url = client.endpoint("me", &[]).unwrap();
        let safe = redacted(&url);
        assert!(safe.query().unwrap().contains("circle-token=REDACTED"));
        assert!(!safe.as_str().contains("aabbccdd"));
    }

    #[test]
    fn authed_url_preserves_foreign_parameters() {
        let client = client_with_token();
        let raw = Url::parse("https://circleci.com/api/v1/project/x/y?limit=5&offset=10").unwrap();
        let authed = client.authed_url(&raw);
        assert!(authed.query().unwrap().contains("limit=5"));
        assert!(authed.query().unwrap().contains("offset=10"));
        assert_eq!(token_count(&authed), 1);
    }
}
