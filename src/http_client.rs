use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Serialize;

// Transport ceiling; each request sets its own shorter timeout.
const CLIENT_TIMEOUT_SECS: u64 = 120;
const AGENT: &str = concat!("h2h_terminal/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Joins `segments` onto `base`, percent-encoding each one as a single path segment.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("invalid base url {base:?}"))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base url cannot carry a path: {base}"))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

pub fn get_text(url: Url, timeout: Duration, bearer: Option<&str>) -> Result<String> {
    let client = http_client()?;
    let req = with_bearer(client.get(url), bearer);
    send_text(req, timeout)
}

pub fn post_json_text<B: Serialize + ?Sized>(
    url: Url,
    body: &B,
    timeout: Duration,
    bearer: Option<&str>,
) -> Result<String> {
    let client = http_client()?;
    let req = with_bearer(client.post(url).json(body), bearer);
    send_text(req, timeout)
}

fn with_bearer(req: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
    match bearer {
        Some(token) => req.header(AUTHORIZATION, format!("Bearer {token}")),
        None => req,
    }
}

// One attempt only; callers decide what a failure means.
fn send_text(req: RequestBuilder, timeout: Duration) -> Result<String> {
    let resp = req
        .header(USER_AGENT, AGENT)
        .header(ACCEPT, "application/json")
        .timeout(timeout)
        .send()
        .context("request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {}: {}", status, snippet(&body)));
    }
    Ok(body)
}

fn snippet(body: &str) -> &str {
    const MAX: usize = 160;
    let trimmed = body.trim();
    if trimmed.len() <= MAX {
        return trimmed;
    }
    let mut end = MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    &trimmed[..end]
}
