use crate::repository::Repository;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to parse repositories from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub fn make_http_client(api_token: &str) -> anyhow::Result<Client> {
    let mut headers = HeaderMap::new();
    let mut authorization = HeaderValue::from_str(&format!("Bearer {}", api_token))
        .with_context(|| "Invalid token: cannot be set as HTTP header")?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        )),
    );

    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .default_headers(headers)
        .build()
        .with_context(|| "Failed to create http client")
}

async fn fetch_repositories_paginated(
    client: &Client,
    api_url: &str,
    page: u32,
) -> Result<Vec<Repository>, TransportError> {
    let url = format!(
        "{}/user/repos?visibility=all&affiliation=owner&per_page={}&page={}",
        api_url.trim_end_matches('/'),
        PER_PAGE,
        page
    );
    log::debug!("Fetching repositories page={}", page);

    let res = client
        .get(&url)
        .send()
        .await
        .map_err(|source| TransportError::Request {
            url: url.clone(),
            source,
        })?;
    let status = res.status();
    let json = res.text().await.map_err(|source| TransportError::Request {
        url: url.clone(),
        source,
    })?;

    if !status.is_success() {
        return Err(TransportError::Status {
            url,
            status,
            body: json,
        });
    }

    let repositories: Vec<Repository> =
        serde_json::from_str(&json).map_err(|source| TransportError::Decode { url, source })?;

    log::debug!(
        "Fetched repositories: page={} count={}",
        page,
        repositories.len()
    );
    Ok(repositories)
}

/// Lists every repository owned by the authenticated user, walking pages until an empty one.
///
/// The first failing page aborts the listing; nothing fetched before it is returned.
pub async fn fetch_repositories(
    client: &Client,
    api_url: &str,
) -> Result<Vec<Repository>, TransportError> {
    let mut repositories = Vec::new();
    for page in 1u32.. {
        let page_repositories = fetch_repositories_paginated(client, api_url, page).await?;
        if page_repositories.is_empty() {
            break;
        }
        repositories.extend(page_repositories);
    }

    log::debug!("Fetched all repositories: count={}", repositories.len());
    Ok(repositories)
}
