use blog_common::extract::extract_json_object;
use blog_common::openrouter::{ChatCompletionRequest, Message, OpenRouterClient, OpenRouterError};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::model::GenerationResult;

const MAX_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.7;
const DEFAULT_VIBE: &str = "default";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("OpenRouter API key not set in environment variables")]
    UpstreamConfig,

    #[error("failed to generate blog with OpenRouter: {0}")]
    UpstreamRequest(#[source] OpenRouterError),

    #[error("failed to parse OpenRouter response: {0}")]
    UpstreamParse(String),
}

impl From<OpenRouterError> for GenerateError {
    fn from(err: OpenRouterError) -> Self {
        match err {
            OpenRouterError::MissingApiKey => GenerateError::UpstreamConfig,
            other => GenerateError::UpstreamRequest(other),
        }
    }
}

/// Turns thread text into a blog post with one chat-completion call.
pub struct BlogGenerator {
    client: OpenRouterClient,
}

impl BlogGenerator {
    pub fn new(client: OpenRouterClient) -> Self {
        Self { client }
    }

    pub async fn generate(
        &self,
        thread: &str,
        tone: Option<&str>,
        custom_prompt: Option<&str>,
    ) -> Result<GenerationResult, GenerateError> {
        let vibe = resolve_vibe(tone, custom_prompt);
        let prompt = build_prompt(thread, vibe);

        let config = self.client.config();
        if !config.has_api_key() {
            return Err(GenerateError::UpstreamConfig);
        }

        let request = ChatCompletionRequest {
            model: config.model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
        };
        info!(
            model = %request.model,
            vibe,
            thread_chars = thread.chars().count(),
            "requesting blog generation"
        );

        let response = self.client.chat_completions(&request).await?;
        let content = response.first_content().ok_or_else(|| {
            GenerateError::UpstreamParse("missing choices[0].message.content".to_string())
        })?;
        debug!(content_chars = content.chars().count(), "model replied");

        parse_generation(content)
    }
}

/// `custom_prompt` beats `tone`; empty strings count as absent. Whitespace-only values
/// are kept, the same as any other non-empty text.
pub fn resolve_vibe<'a>(tone: Option<&'a str>, custom_prompt: Option<&'a str>) -> &'a str {
    custom_prompt
        .filter(|s| !s.is_empty())
        .or(tone.filter(|s| !s.is_empty()))
        .unwrap_or(DEFAULT_VIBE)
}

pub fn build_prompt(thread: &str, vibe: &str) -> String {
    format!(
        r#"
You are a professional blog writer.

Take the following X (Twitter) thread and convert it into a high-quality, engaging blog post.

Thread:
{thread}

Target tone or style: {vibe}

Return only a JSON object in the following format (markdown-escaped):
{{
  "title": "...",
  "contentMarkdown": "...",
  "tags": ["...", "..."],
  "seo": {{
    "title": "...",
    "description": "...",
    "slug": "..."
  }},
  "imagePrompt": "..." // A short, vivid prompt for an AI image generator to create a cover image for this blog post
}}

Ensure:
- The blog is well-structured with intro, headings, body, and a clear conclusion.
- Use Markdown format with ## Headings, **bold**, bullet points, etc.
- Add a CTA at the end (e.g., follow, share, comment).
- Make sure tone matches: {vibe}
- SEO title should be catchy and descriptive (50-60 characters)
- SEO description should be compelling (150-160 characters)
- The imagePrompt should be vivid, descriptive, and suitable for a blog cover image, but should not mention any text or words.
"#
    )
}

/// Pull the JSON object out of the model's reply and normalize its SEO block.
pub fn parse_generation(content: &str) -> Result<GenerationResult, GenerateError> {
    let Some(json) = extract_json_object(content) else {
        warn!(content_chars = content.chars().count(), "no JSON object in model reply");
        return Err(GenerateError::UpstreamParse(
            "no JSON object found in model reply".to_string(),
        ));
    };
    // Only the JSON syntax and the top-level object shape are checked; field types are not.
    let fields: Map<String, Value> = serde_json::from_str(json).map_err(|e| {
        warn!(error = %e, "model reply JSON did not parse");
        GenerateError::UpstreamParse(e.to_string())
    })?;
    let mut result = GenerationResult::new(fields);
    result.backfill_seo();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blog_common::openrouter::OpenRouterConfig;
    use blog_common::slug::slugify;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator_for(server: &MockServer, api_key: Option<&str>) -> BlogGenerator {
        let config = OpenRouterConfig {
            api_key: api_key.map(str::to_string),
            ..OpenRouterConfig::default()
        }
        .with_base_url(&server.uri());
        BlogGenerator::new(OpenRouterClient::new(config).expect("client"))
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        }))
    }

    #[test]
    fn vibe_precedence() {
        assert_eq!(resolve_vibe(Some("funny"), Some("pirate speak")), "pirate speak");
        assert_eq!(resolve_vibe(Some("funny"), Some("")), "funny");
        assert_eq!(resolve_vibe(Some("funny"), None), "funny");
        assert_eq!(resolve_vibe(None, None), "default");
        assert_eq!(resolve_vibe(Some(""), None), "default");
        assert_eq!(resolve_vibe(Some("funny"), Some("  ")), "  ");
    }

    #[test]
    fn prompt_embeds_thread_vibe_and_schema() {
        let prompt = build_prompt("1/ Rust is great\n2/ Really", "gen-z");
        assert!(prompt.contains("1/ Rust is great\n2/ Really"));
        assert!(prompt.contains("Target tone or style: gen-z"));
        assert!(prompt.contains("Make sure tone matches: gen-z"));
        assert!(prompt.contains("\"contentMarkdown\": \"...\""));
        assert!(prompt.contains("\"seo\": {"));
        assert!(prompt.contains("(50-60 characters)"));
        assert!(prompt.contains("(150-160 characters)"));
        assert!(prompt.contains("should not mention any text or words"));
        assert!(prompt.contains("Add a CTA at the end"));
    }

    #[test]
    fn parse_fenced_block_without_seo_backfills() {
        let content = "Here is your post:\n```json\n{\"title\": \"Ten Lessons From Shipping Rust\", \"contentMarkdown\": \"## Intro\", \"tags\": [\"rust\"], \"imagePrompt\": \"a forge\"}\n```";
        let result = parse_generation(content).expect("parses");
        assert_eq!(result.seo_field("title"), result.get("title"));
        assert_eq!(
            result.seo_field("slug"),
            Some(&json!(slugify(&result.title_text())))
        );
        assert_eq!(result.seo_field("slug"), Some(&json!("ten-lessons-from-shipping-rust")));
        assert_eq!(result.get("tags"), Some(&json!(["rust"])));
    }

    #[test]
    fn parse_bare_object_in_prose() {
        let content = "Sure thing! {\"title\": \"A {curly} title\", \"seo\": {\"slug\": \"given\"}} Enjoy!";
        let result = parse_generation(content).expect("parses");
        assert_eq!(result.title_text(), "A {curly} title");
        assert_eq!(result.seo_field("slug"), Some(&json!("given")));
        assert_eq!(result.seo_field("title"), Some(&json!("A {curly} title")));
    }

    #[test]
    fn off_schema_field_types_are_returned_not_rejected() {
        let content = r#"```json
{"title": "T", "tags": "rust, web", "imagePrompt": {"style": "oil"}, "seo": {"title": 5}}
```"#;
        let result = parse_generation(content).expect("any JSON object is accepted");
        assert_eq!(result.get("tags"), Some(&json!("rust, web")));
        assert_eq!(result.get("imagePrompt"), Some(&json!({"style": "oil"})));
        assert_eq!(result.seo_field("title"), Some(&json!(5)));
        assert_eq!(result.seo_field("slug"), Some(&json!("t")));

        let result = parse_generation(r#"{"title": "T", "tags": ["rust", 2024]}"#).expect("parses");
        assert_eq!(result.get("tags"), Some(&json!(["rust", 2024])));
    }

    #[test]
    fn parse_failures_are_terminal() {
        for content in [
            "I could not do that.",
            "```json\n{not valid json}\n```",
            "{\"title\": \"unterminated\"",
            "[\"an\", \"array\"]",
            "```json\n[1, 2]\n```",
        ] {
            let err = parse_generation(content).unwrap_err();
            assert!(
                matches!(err, GenerateError::UpstreamParse(_)),
                "content {content:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn generate_sends_fixed_parameters_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "sarvamai/sarvam-m:free",
                "max_tokens": 2048,
                "temperature": 0.7
            })))
            .respond_with(completion(
                "```json\n{\"title\": \"Hello World\", \"contentMarkdown\": \"## Hi\", \"tags\": [], \"imagePrompt\": \"sunrise\"}\n```",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let generator = generator_for(&server, Some("sk-test"));
        let result = generator
            .generate("a thread", Some("poetic"), None)
            .await
            .expect("generates");
        assert_eq!(result.seo_field("title"), Some(&json!("Hello World")));
        assert_eq!(result.seo_field("slug"), Some(&json!("hello-world")));
        assert_eq!(result.get("imagePrompt"), Some(&json!("sunrise")));
    }

    #[tokio::test]
    async fn prompt_carries_custom_vibe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion("{\"title\": \"T\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let generator = generator_for(&server, Some("sk-test"));
        generator
            .generate("thread body", Some("funny"), Some("like a pirate"))
            .await
            .expect("generates");

        let requests = server.received_requests().await.expect("recording enabled");
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = body["messages"][0]["content"].as_str().unwrap();
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(prompt.contains("Target tone or style: like a pirate"));
        assert!(prompt.contains("thread body"));
    }

    #[tokio::test]
    async fn missing_api_key_is_config_error_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let generator = generator_for(&server, None);
        let err = generator.generate("t", None, None).await.unwrap_err();
        assert!(matches!(err, GenerateError::UpstreamConfig));
    }

    #[tokio::test]
    async fn upstream_failure_includes_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("{\"error\":\"slow down\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let generator = generator_for(&server, Some("sk-test"));
        let err = generator.generate("t", None, None).await.unwrap_err();
        assert!(matches!(err, GenerateError::UpstreamRequest(_)));
        assert!(err.to_string().contains("slow down"), "{err}");
    }

    #[tokio::test]
    async fn reply_without_content_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let generator = generator_for(&server, Some("sk-test"));
        let err = generator.generate("t", None, None).await.unwrap_err();
        assert!(matches!(err, GenerateError::UpstreamParse(_)));
    }
}
