//! Text generation for health blog posts.
//!
//! [`ChatCompletionsGenerator`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint. [`TemplateGenerator`] is used when no remote
//! generator is configured and always produces the same post for a topic.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::BlogGeneratorConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPost {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generator returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generator returned no content")]
    EmptyResponse,
}

#[async_trait]
pub trait BlogGenerator: Send + Sync {
    async fn generate(&self, topic: &str) -> Result<GeneratedPost, GeneratorError>;

    /// Label used in logs and metrics.
    fn source(&self) -> &'static str;
}

/// Builds the configured generator.
pub fn from_config(cfg: &BlogGeneratorConfig) -> Result<Box<dyn BlogGenerator>, GeneratorError> {
    if cfg.enabled {
        Ok(Box::new(ChatCompletionsGenerator::new(cfg)?))
    } else {
        Ok(Box::new(TemplateGenerator))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

#[async_trait]
impl BlogGenerator for TemplateGenerator {
    async fn generate(&self, topic: &str) -> Result<GeneratedPost, GeneratorError> {
        let topic = topic.trim();
        let title = format!("Understanding {}: A Practical Guide", title_case(topic));
        let content = format!(
            "{topic} affects many people, and small daily habits make a real difference.\n\n\
             ## What to know\n\
             Learn the common signs related to {topic} and keep track of any changes you notice.\n\n\
             ## Everyday care\n\
             A balanced diet, regular movement such as yoga, and enough sleep support your overall health.\n\n\
             ## When to see a doctor\n\
             If symptoms persist or get worse, book a consultation with a qualified doctor. \
             This article is general information and not a substitute for medical advice."
        );
        Ok(GeneratedPost { title, content })
    }

    fn source(&self) -> &'static str {
        "template"
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You write short, accurate health blog posts for patients. \
Start with the title on the first line, then the article body in Markdown.";

impl ChatCompletionsGenerator {
    pub fn new(cfg: &BlogGeneratorConfig) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        })
    }
}

#[async_trait]
impl BlogGenerator for ChatCompletionsGenerator {
    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint, model = %self.model))]
    async fn generate(&self, topic: &str) -> Result<GeneratedPost, GeneratorError> {
        let messages = [
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: format!("Write a blog post about: {topic}"),
            },
        ];
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "model": self.model, "messages": messages }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(GeneratorError::EmptyResponse)?;
        split_post(&text, topic).ok_or(GeneratorError::EmptyResponse)
    }

    fn source(&self) -> &'static str {
        "remote"
    }
}

/// First non-empty line is the title (Markdown heading marks and a `Title:`
/// prefix are dropped), the rest is the body. A single-line reply becomes the
/// body under a title derived from the topic.
fn split_post(text: &str, topic: &str) -> Option<GeneratedPost> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let title = first.trim().trim_start_matches('#').trim();
    let title = title
        .strip_prefix("Title:")
        .unwrap_or(title)
        .trim()
        .trim_matches('"')
        .to_string();
    let rest = rest.trim();
    if rest.is_empty() {
        return Some(GeneratedPost {
            title: title_case(topic),
            content: text.to_string(),
        });
    }
    Some(GeneratedPost {
        title,
        content: rest.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn template_is_deterministic() {
        let a = TemplateGenerator.generate("healthy sleep").await.unwrap();
        let b = TemplateGenerator.generate("healthy sleep").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.title, "Understanding Healthy Sleep: A Practical Guide");
        assert!(a.content.contains("healthy sleep"));
    }

    #[test]
    fn split_post_strips_heading() {
        let post = split_post("# Title: \"Hydration\"\n\nDrink water.", "water").unwrap();
        assert_eq!(post.title, "Hydration");
        assert_eq!(post.content, "Drink water.");
    }

    #[test]
    fn split_post_single_line() {
        let post = split_post("Just one line.", "diabetes care").unwrap();
        assert_eq!(post.title, "Diabetes Care");
        assert_eq!(post.content, "Just one line.");
        assert!(split_post("   ", "x").is_none());
    }

    #[test]
    fn disabled_config_uses_template() {
        let generator = from_config(&BlogGeneratorConfig::default()).unwrap();
        assert_eq!(generator.source(), "template");
    }
}
