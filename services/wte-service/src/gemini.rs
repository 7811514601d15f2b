use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const CHUNK_SIZE: usize = 30;
pub const MAX_CONCURRENT_CHUNKS: usize = 10;

/// What the model sees of a place.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceSummary {
    pub name: String,
    pub types: Vec<String>,
}

/// Category label to the place names filed under it.
pub type NameCategories = BTreeMap<String, Vec<String>>;

#[async_trait]
pub trait Categorizer: Send + Sync {
    async fn categorize(&self, places: &[PlaceSummary]) -> Result<NameCategories>;
}

pub struct GeminiCategorizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiCategorizer {
    pub fn new(
        http: reqwest::Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn categorize_chunk(&self, chunk: &[PlaceSummary]) -> Result<NameCategories> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(chunk)?,
                }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("gemini generateContent transport")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("gemini generateContent HTTP {status}: {text}");
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .context("gemini generateContent parse")?;
        let text = reply
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .map(|p| p.text)
            .collect::<String>();

        parse_categories(&text)
    }
}

#[async_trait]
impl Categorizer for GeminiCategorizer {
    /// Sends the places in chunks with bounded concurrency. Chunks that fail
    /// are skipped; an error is returned only when all of them fail.
    async fn categorize(&self, places: &[PlaceSummary]) -> Result<NameCategories> {
        let pending: Vec<_> = places
            .chunks(CHUNK_SIZE)
            .map(|chunk| self.categorize_chunk(chunk))
            .collect();
        let total = pending.len();

        let results: Vec<Result<NameCategories>> = stream::iter(pending)
            .buffer_unordered(MAX_CONCURRENT_CHUNKS)
            .collect()
            .await;

        let mut merged = NameCategories::new();
        let mut failed = 0;
        for result in results {
            match result {
                Ok(categories) => {
                    for (label, names) in categories {
                        merged.entry(label).or_default().extend(names);
                    }
                }
                Err(err) => {
                    failed += 1;
                    warn!(error = %err, "categorization chunk skipped");
                }
            }
        }

        if total > 0 && failed == total {
            anyhow::bail!("AI classification failed for every chunk");
        }
        info!(chunks = total, failed, categories = merged.len(), "categorization finished");
        Ok(merged)
    }
}

fn build_prompt(chunk: &[PlaceSummary]) -> Result<String> {
    let listing = serde_json::to_string_pretty(chunk)?;
    Ok(format!(
        r#"你是美食分類專家。請依照每間餐廳最主要的「具體食物」分類下列餐廳。

規則：
1. 使用具體食物名稱（例如「牛肉麵」、「炒飯」），不要用「麵食」這類大分類。
2. 主要依餐廳名稱判斷，types 僅供參考。
3. 每間餐廳只放進一個分類。
4. 每個分類名稱最後加上一個代表該分類的 Emoji，例如：牛肉麵 🍜、壽司 🍣、火鍋 🍲、咖啡廳 ☕️、手搖飲 🍹。

餐廳資料：
{listing}

只輸出 JSON，不要其他文字，格式如下：
{{"牛肉麵 🍜": ["餐廳A"], "炒飯 🍚": ["餐廳B"]}}"#
    ))
}

/// Parses the model reply, tolerating a Markdown code fence around the JSON.
fn parse_categories(text: &str) -> Result<NameCategories> {
    serde_json::from_str(strip_code_fence(text)).context("gemini reply is not a category map")
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None => after.trim(),
    }
}

// ── generateContent payloads ─────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
