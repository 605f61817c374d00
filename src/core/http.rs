// src/core/http.rs

use crate::config::RuntimeConfig;
use crate::core::models::{Headers, HttpMethod, HttpResponse, RequestInfo};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::{Client, redirect};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// What modules use to issue follow-up requests.
///
/// Each call resolves once the exchange completes; the code after `.await`
/// is the module's completion logic. Transport failures come back as `Err`
/// and are the module's to handle; nothing is retried here.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, method: HttpMethod, url: &Url) -> Result<HttpResponse>;

    async fn get(&self, url: &Url) -> Result<HttpResponse> {
        self.request(HttpMethod::Get, url).await
    }

    async fn post(&self, url: &Url) -> Result<HttpResponse> {
        self.request(HttpMethod::Post, url).await
    }
}

/// Folds a `HeaderMap` into [`Headers`], joining repeated names with ", ".
///
/// Values that are not valid UTF-8 are replaced with a placeholder rather
/// than dropped.
pub fn collect_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let value = value.to_str().unwrap_or("[Invalid UTF-8]");
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestClient {
    client: Client,
    user_agent: String,
}

impl ReqwestClient {
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(if config.redirect_limit == 0 {
                redirect::Policy::none()
            } else {
                redirect::Policy::limited(config.redirect_limit)
            })
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(&self, method: HttpMethod, url: &Url) -> Result<HttpResponse> {
        // Set explicitly so the captured request headers show it.
        let request = self
            .client
            .request(method.into(), url.clone())
            .header(USER_AGENT, &self.user_agent)
            .build()?;
        let request_info = RequestInfo {
            method,
            url: request.url().clone(),
            headers: collect_headers(request.headers()),
        };

        debug!(%method, url = %url, "Sending request.");
        let response = self.client.execute(request).await?;
        let status_code = response.status().as_u16();
        let effective_url = response.url().clone();
        let headers = collect_headers(response.headers());
        let body = response.text().await?;
        info!(%method, url = %effective_url, status = status_code, "Received response.");

        Ok(HttpResponse {
            effective_url,
            status_code,
            body,
            headers,
            request: request_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, SET_COOKIE};

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut map = HeaderMap::new();
        map.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        map.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        map.insert("x-frame-options", HeaderValue::from_static("DENY"));

        let headers = collect_headers(&map);
        assert_eq!(headers["set-cookie"], "a=1, b=2");
        assert_eq!(headers["x-frame-options"], "DENY");
    }

    #[test]
    fn test_client_builds_from_defaults() {
        assert!(ReqwestClient::from_config(&RuntimeConfig::default()).is_ok());
    }
}
