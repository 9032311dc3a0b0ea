use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use blog_common::slug::slugify;

/// Body of `POST /api/generate`. Every field is optional here; the handler validates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub thread_text: Option<String>,
    pub thread_url: Option<String>,
    pub selected_tone: Option<String>,
    pub custom_vibe: Option<String>,
}

impl GenerationRequest {
    /// Lenient parse: anything that is not a JSON object of this shape becomes an empty request.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

/// The generated post as returned to the client.
///
/// This is the JSON object the model produced, kept as-is apart from the `seo` block.
/// The requested schema is `title`, `contentMarkdown`, `tags`, `seo{title,description,slug}`
/// and `imagePrompt`, but field types are not enforced: a model that sends `tags` as a
/// string still gets its reply passed through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationResult(Map<String, Value>);

const SEO_FIELDS: [&str; 3] = ["title", "description", "slug"];

impl GenerationResult {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn seo_field(&self, field: &str) -> Option<&Value> {
        self.0.get("seo").and_then(|seo| seo.get(field))
    }

    /// Top-level `title` as text; non-string titles are rendered as JSON.
    pub fn title_text(&self) -> String {
        self.0.get("title").map(display_text).unwrap_or_default()
    }

    /// Fill falsy SEO fields from the rest of the payload.
    ///
    /// A missing or non-object `seo` becomes `{}`. `seo.title` copies `title`,
    /// `seo.description` copies a top-level `description` (the prompt never asks for one,
    /// so it usually stays empty) and `seo.slug` is derived from `title`. Any of the three
    /// still absent afterwards is set to `""`.
    pub fn backfill_seo(&mut self) {
        let title = self.0.get("title").filter(|v| is_truthy(v)).cloned();
        let description = self.0.get("description").filter(|v| is_truthy(v)).cloned();
        let slug = title
            .as_ref()
            .map(|t| Value::String(slugify(&display_text(t))));

        let seo = self
            .0
            .entry("seo")
            .or_insert_with(|| Value::Object(Map::new()));
        if !seo.is_object() {
            *seo = Value::Object(Map::new());
        }
        let Value::Object(seo) = seo else {
            return;
        };

        fill_if_falsy(seo, "title", title);
        fill_if_falsy(seo, "description", description);
        fill_if_falsy(seo, "slug", slug);
        for field in SEO_FIELDS {
            let entry = seo.entry(field).or_insert(Value::Null);
            if entry.is_null() {
                *entry = Value::String(String::new());
            }
        }
    }
}

fn fill_if_falsy(seo: &mut Map<String, Value>, field: &str, value: Option<Value>) {
    if seo.get(field).is_some_and(is_truthy) {
        return;
    }
    if let Some(value) = value {
        seo.insert(field.to_string(), value);
    }
}

/// JavaScript truthiness, which the model-facing contract was written against.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Stylistic presets offered to clients. `customVibe` free text overrides any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Vibe {
    Funny,
    Poetic,
    Business,
    Sarcastic,
    GenZ,
    Technical,
    Inspirational,
}

impl Vibe {
    pub const ALL: [Vibe; 7] = [
        Vibe::Funny,
        Vibe::Poetic,
        Vibe::Business,
        Vibe::Sarcastic,
        Vibe::GenZ,
        Vibe::Technical,
        Vibe::Inspirational,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Vibe::Funny => "Funny",
            Vibe::Poetic => "Poetic",
            Vibe::Business => "Business",
            Vibe::Sarcastic => "Sarcastic",
            Vibe::GenZ => "Gen-Z",
            Vibe::Technical => "Technical",
            Vibe::Inspirational => "Inspirational",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Vibe::Funny => "😄",
            Vibe::Poetic => "🎭",
            Vibe::Business => "💼",
            Vibe::Sarcastic => "😏",
            Vibe::GenZ => "🔥",
            Vibe::Technical => "⚡",
            Vibe::Inspirational => "✨",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VibeOption {
    pub id: Vibe,
    pub label: &'static str,
    pub emoji: &'static str,
}

impl From<Vibe> for VibeOption {
    fn from(vibe: Vibe) -> Self {
        Self {
            id: vibe,
            label: vibe.label(),
            emoji: vibe.emoji(),
        }
    }
}
