use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::PageExtractor;
use crate::core::errors::CoreError;

/// Fetches a page over HTTP and strips it down to its visible text.
pub struct HttpPageExtractor {
    client: Client,
}

impl HttpPageExtractor {
    pub fn new(timeout_secs: u64) -> Result<Self, CoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(CoreError::upstream)?;
        Ok(HttpPageExtractor { client })
    }
}

#[async_trait]
impl PageExtractor for HttpPageExtractor {
    async fn extract(&self, url: &str) -> Result<String, CoreError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(CoreError::upstream)?;

        if !response.status().is_success() {
            return Err(CoreError::Upstream(format!(
                "fetching {} returned {}",
                url,
                response.status()
            )));
        }

        let body = response.text().await.map_err(CoreError::upstream)?;
        Ok(strip_html(&body))
    }
}

/// Reduce an HTML document to its text content.
///
/// Drops tags and the bodies of `<script>`/`<style>` elements, decodes the
/// common entities, and collapses blank lines.
pub(crate) fn strip_html(html: &str) -> String {
    let chars: Vec<char> = html.chars().collect();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '<' {
            let name = tag_name(&chars, i + 1);
            if name == "script" || name == "style" {
                i = skip_element(&chars, i, &name);
            } else {
                i = skip_past_tag(&chars, i);
                text.push(' ');
            }
            continue;
        }
        text.push(chars[i]);
        i += 1;
    }

    let decoded = decode_entities(&text);
    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercased element name starting at `i` (skipping a leading `/`).
fn tag_name(chars: &[char], mut i: usize) -> String {
    if i < chars.len() && chars[i] == '/' {
        i += 1;
    }
    let mut name = String::new();
    while i < chars.len() && chars[i].is_ascii_alphanumeric() {
        name.push(chars[i].to_ascii_lowercase());
        i += 1;
    }
    name
}

/// Index just past the `>` closing the tag that starts at `i`.
fn skip_past_tag(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i] != '>' {
        i += 1;
    }
    i + 1
}

/// Index just past the closing tag of the element starting at `i`.
fn skip_element(chars: &[char], i: usize, name: &str) -> usize {
    let mut i = skip_past_tag(chars, i);
    while i < chars.len() {
        if chars[i] == '<'
            && i + 1 < chars.len()
            && chars[i + 1] == '/'
            && tag_name(chars, i + 1) == name
        {
            return skip_past_tag(chars, i);
        }
        i += 1;
    }
    i
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
