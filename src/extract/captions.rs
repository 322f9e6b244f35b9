use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use url::Url;

use super::CaptionExtractor;
use crate::core::errors::CoreError;

/// Caption languages probed in order; the original product targeted
/// English-India uploads first.
const CAPTION_LANGS: [&str; 2] = ["en-IN", "en"];

static TIMING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}:\d{2}:\d{2}[,.]\d{3}\s*-->").expect("caption timing pattern")
});

/// Fetches a video's SRT caption track from a timed-text endpoint and
/// reduces it to plain text.
pub struct TimedTextCaptionExtractor {
    client: Client,
    base_url: String,
}

impl TimedTextCaptionExtractor {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, CoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(CoreError::upstream)?;
        Ok(TimedTextCaptionExtractor {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl CaptionExtractor for TimedTextCaptionExtractor {
    async fn extract_captions(&self, url: &str) -> Result<Option<String>, CoreError> {
        let video_id = video_id_from_url(url).ok_or_else(|| {
            CoreError::invalid_argument(format!("not a recognizable video url: {}", url))
        })?;

        for lang in CAPTION_LANGS {
            let request_url = format!(
                "{}?v={}&lang={}&fmt=srt",
                self.base_url, video_id, lang
            );
            let response = self
                .client
                .get(&request_url)
                .send()
                .await
                .map_err(CoreError::upstream)?;

            if !response.status().is_success() {
                continue;
            }

            let body = response.text().await.map_err(CoreError::upstream)?;
            let text = srt_to_plain_text(&body);
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }

        Ok(None)
    }
}

/// Pull the video id out of the common watch-URL shapes.
pub(crate) fn video_id_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;

    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
        if !id.is_empty() {
            return Some(id.into_owned());
        }
    }

    let host = url.host_str()?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    if host.ends_with("youtu.be") {
        return segments.next().map(str::to_string);
    }

    match segments.next() {
        Some("embed") | Some("shorts") | Some("v") => segments.next().map(str::to_string),
        _ => None,
    }
}

/// Strip SRT sequence numbers and timing lines, keeping the caption text.
pub(crate) fn srt_to_plain_text(srt: &str) -> String {
    srt.lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.chars().all(|c| c.is_ascii_digit())
                && !TIMING_LINE.is_match(line)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
