//! Title and hashtag generation.
//!
//! [`Enricher`] is the capability the export engine depends on;
//! [`OllamaEnricher`] implements it against an Ollama-compatible
//! `/api/generate` endpoint.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::models::content_preview;
use crate::domain::{AppError, EnrichmentConfig, Result};

/// Prompt input is cut to this many characters.
const MAX_PROMPT_CHARS: usize = 1000;
/// Generated titles are cut to this many characters.
const MAX_TITLE_CHARS: usize = 100;
/// Longest hashtag we accept from the model.
const MAX_HASHTAG_CHARS: usize = 30;

/// Compile one of the literal patterns below. They are fixed at compile time
/// and covered by `test_builtin_patterns_compile`, so a failure here is a bug.
fn regex(pattern: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

static MD_IMAGE: LazyLock<Regex> = LazyLock::new(|| regex(r"!\[([^\]]*)\]\([^)]+\)"));
static MD_LINK: LazyLock<Regex> = LazyLock::new(|| regex(r"\[([^\]]+)\]\([^)]+\)"));
static MD_BOLD: LazyLock<Regex> = LazyLock::new(|| regex(r"\*\*([^*]+)\*\*"));
static MD_ITALIC: LazyLock<Regex> = LazyLock::new(|| regex(r"\*([^*]+)\*"));
static MD_HEADING: LazyLock<Regex> = LazyLock::new(|| regex(r"#{1,6}\s*"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| regex(r"\s+"));
static TITLE_PREFIX: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^(title:\s*|post:\s*)"));
static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| regex(r"#\w+"));
static HASHTAG_WORD: LazyLock<Regex> = LazyLock::new(|| regex(r"^[a-zA-Z0-9_]+$"));

/// Something that can title and tag a post body.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Name recorded on enriched posts.
    fn provider(&self) -> &str;

    /// Short title for `text`. Empty when nothing useful came back.
    async fn generate_title(&self, text: &str) -> Result<String>;

    /// Up to `max_count` hashtags for `text`, without the leading `#`.
    async fn extract_hashtags(&self, text: &str, max_count: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Enricher backed by an Ollama-compatible HTTP endpoint.
pub struct OllamaEnricher {
    client: reqwest::Client,
    config: EnrichmentConfig,
}

impl OllamaEnricher {
    /// Build the HTTP client from enrichment settings.
    ///
    /// # Errors
    /// Returns a config error if the HTTP client cannot be built.
    pub fn new(config: EnrichmentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("channel-archiver/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config {
                message: format!("Failed to build enrichment HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let url = format!("{}/api/generate", self.config.base_url.trim_end_matches('/'));
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AppError::transport(format!("Enrichment request to {url} failed"), e))?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::transport("Malformed enrichment response", e))?;

        Ok(body.response)
    }
}

#[async_trait]
impl Enricher for OllamaEnricher {
    fn provider(&self) -> &str {
        &self.config.provider
    }

    async fn generate_title(&self, text: &str) -> Result<String> {
        let cleaned = clean_content_for_prompt(text);
        if cleaned.is_empty() {
            return Ok(String::new());
        }

        let prompt = format!(
            "Write a short, engaging headline in {} for the channel post below.\n\
             Use 3 to 8 words that name the main topic.\n\
             No hashtags, quotes or formatting. Reply with the headline only.\n\n\
             Post:\n{cleaned}",
            self.config.language
        );

        let title = clean_generated_title(&self.generate(prompt).await?);
        tracing::debug!(title = %title, "Generated title");
        Ok(title)
    }

    async fn extract_hashtags(&self, text: &str, max_count: usize) -> Result<Vec<String>> {
        let cleaned = clean_content_for_prompt(text);
        let max_count = max_count.min(self.config.max_hashtags);
        if cleaned.is_empty() || max_count == 0 {
            return Ok(Vec::new());
        }

        let prompt = format!(
            "List {max_count} searchable hashtags in {} for the channel post below.\n\
             Each hashtag is one to three words joined together, without the # sign.\n\
             Put one hashtag per line and reply with nothing else.\n\n\
             Post:\n{cleaned}",
            self.config.language
        );

        let hashtags = parse_hashtags(&self.generate(prompt).await?, max_count);
        tracing::debug!(count = hashtags.len(), "Extracted hashtags");
        Ok(hashtags)
    }
}

/// Strip markdown noise and collapse whitespace before sending text to a model.
#[must_use]
pub fn clean_content_for_prompt(content: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }

    let text = MD_IMAGE.replace_all(content, "");
    let text = MD_LINK.replace_all(&text, "$1");
    let text = MD_BOLD.replace_all(&text, "$1");
    let text = MD_ITALIC.replace_all(&text, "$1");
    let text = MD_HEADING.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");

    content_preview(text.trim(), MAX_PROMPT_CHARS)
}

/// Normalize a model-produced title.
#[must_use]
pub fn clean_generated_title(title: &str) -> String {
    let title = title.trim_matches(|c| c == '"' || c == '\'' || c == ' ');
    let title = TITLE_PREFIX.replace(title, "");
    let title = INLINE_TAG.replace_all(&title, "");

    content_preview(title.trim(), MAX_TITLE_CHARS)
}

/// Parse one-hashtag-per-line model output.
#[must_use]
pub fn parse_hashtags(response: &str, max_count: usize) -> Vec<String> {
    let mut hashtags: Vec<String> = Vec::new();

    let candidates = response
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(max_count)
        .map(|line| line.trim().replace(['#', '-', '*'], "").trim().to_string());

    for tag in candidates {
        let valid = !tag.is_empty()
            && tag.chars().count() <= MAX_HASHTAG_CHARS
            && HASHTAG_WORD.is_match(&tag);
        if valid && !hashtags.contains(&tag) {
            hashtags.push(tag);
        }
    }

    hashtags.truncate(max_count);
    hashtags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_content_strips_markdown() {
        let input = "# Heading\n\n![img](./media/1_photo.jpg) Read **this** and *that* at [the site](https://example.com)";
        assert_eq!(
            clean_content_for_prompt(input),
            "Heading Read this and that at the site"
        );
    }

    #[test]
    fn test_clean_content_truncates() {
        let long = "a".repeat(1500);
        let cleaned = clean_content_for_prompt(&long);
        assert_eq!(cleaned.chars().count(), MAX_PROMPT_CHARS + 3);
        assert!(cleaned.ends_with("..."));
        assert_eq!(clean_content_for_prompt("   \n "), "");
    }

    #[test]
    fn test_clean_generated_title() {
        assert_eq!(
            clean_generated_title("\"Title: Rust 2024 Edition Lands #rust\""),
            "Rust 2024 Edition Lands"
        );
        assert_eq!(clean_generated_title("post: Weekly digest"), "Weekly digest");
        let long = "word ".repeat(40);
        assert!(clean_generated_title(&long).ends_with("..."));
    }

    #[test]
    fn test_parse_hashtags() {
        let response = "#rust\n- async\n\n* tokio\nnot valid\nrust\nwebassembly";
        assert_eq!(
            parse_hashtags(response, 5),
            vec!["rust".to_string(), "async".into(), "tokio".into()]
        );
    }

    #[test]
    fn test_parse_hashtags_respects_max() {
        let response = "one\ntwo\nthree\nfour";
        assert_eq!(parse_hashtags(response, 2), vec!["one", "two"]);
        assert!(parse_hashtags("", 5).is_empty());
    }

    #[test]
    fn test_builtin_patterns_compile() {
        for pattern in [
            &MD_IMAGE,
            &MD_LINK,
            &MD_BOLD,
            &MD_ITALIC,
            &MD_HEADING,
            &WHITESPACE,
            &TITLE_PREFIX,
            &INLINE_TAG,
            &HASHTAG_WORD,
        ] {
            assert!(!LazyLock::force(pattern).as_str().is_empty());
        }
    }

    #[test]
    fn test_ollama_enricher_builds() {
        let enricher = OllamaEnricher::new(EnrichmentConfig::default()).unwrap();
        assert_eq!(enricher.provider(), "ollama");
    }
}
