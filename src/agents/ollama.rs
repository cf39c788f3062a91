//! Ollama-backed vision, text, and translation agents
//!
//! One shared HTTP client talks to the Ollama `/api/generate` endpoint; the
//! three agents wrap it with stage-specific prompts and response parsing.

use crate::agents::{AgentError, TextAgent, TranslatorAgent, VisionAgent};
use crate::core::config::OllamaConfig;
use crate::core::outputs::{ImageAnalysis, RefinementConfidence, TextRefinement, Translation};
use async_trait::async_trait;
use base64::Engine as _;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Thin client for the Ollama generate API.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    model: Option<String>,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Http(e.to_string()))?;
        Ok(Self {
            http,
            host: config.host.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Run a single non-streaming generation. `images` carries base64 payloads.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        images: Vec<String>,
        temperature: f32,
    ) -> Result<(String, Option<String>), AgentError> {
        let mut body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": temperature },
        });
        if !images.is_empty() {
            body["images"] = json!(images);
        }

        debug!(model, host = %self.host, "calling ollama generate");
        let response = self
            .http
            .post(format!("{}/api/generate", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(self.timeout_secs)
                } else {
                    AgentError::Http(e.to_string())
                }
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AgentError::ModelUnavailable(model.to_string()));
        }
        if !response.status().is_success() {
            return Err(AgentError::Http(format!(
                "ollama returned {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AgentError::MalformedResponse(e.to_string()))?;
        Ok((parsed.response, parsed.model))
    }

    fn encode_image(image: &Path) -> Result<String, AgentError> {
        let bytes = std::fs::read(image)
            .map_err(|e| AgentError::Input(format!("{}: {e}", image.display())))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

/// Vision agent prompting for description, scene, visible text, and story.
pub struct OllamaVisionAgent {
    client: OllamaClient,
    model: String,
    temperature: f32,
}

impl OllamaVisionAgent {
    pub fn new(client: OllamaClient, config: &OllamaConfig) -> Self {
        Self {
            client,
            model: config.vision_model.clone(),
            temperature: config.vision_temperature,
        }
    }

}

const ANALYSIS_PROMPT: &str = "Analyze this image and provide a detailed analysis with the \
following sections:\n\
1. **Description**: what you see in the image (objects, people, colors, composition)\n\
2. **Scene**: the type of scene or setting (indoor/outdoor, document/photo, nature/urban)\n\
3. **Text**: any visible text, word for word, with no translation or commentary. \
If there is no text, state \"No visible text\"\n\
4. **Story**: a brief narrative about what might be happening in the image\n\n\
Structure your response with clear section headers.";

/// Split a sectioned model response into named parts.
///
/// Accepts `**Description**:`, `Description:`, or `1. Description:` headers.
fn parse_sections(response: &str) -> std::collections::HashMap<String, String> {
    let header =
        Regex::new(r"(?mi)^\s*(?:\d+\.\s*)?\*{0,2}(description|scene|text|story)\*{0,2}\s*:\s*")
            .expect("section header regex");
    let mut sections = std::collections::HashMap::new();
    let mut matches: Vec<(usize, usize, String)> = header
        .captures_iter(response)
        .map(|c| {
            let whole = c.get(0).unwrap();
            (whole.start(), whole.end(), c[1].to_lowercase())
        })
        .collect();
    matches.sort_by_key(|m| m.0);
    for (i, (_, body_start, name)) in matches.iter().enumerate() {
        let body_end = matches
            .get(i + 1)
            .map(|next| next.0)
            .unwrap_or(response.len());
        sections.insert(name.clone(), response[*body_start..body_end].trim().to_string());
    }
    sections
}

#[async_trait]
impl VisionAgent for OllamaVisionAgent {
    async fn analyze(&self, image: &Path) -> Result<ImageAnalysis, AgentError> {
        let encoded = OllamaClient::encode_image(image)?;
        let (response, model) = self
            .client
            .generate(&self.model, ANALYSIS_PROMPT, vec![encoded], self.temperature)
            .await?;

        if response.trim().is_empty() {
            return Err(AgentError::MalformedResponse(
                "vision model returned an empty response".to_string(),
            ));
        }

        let mut sections = parse_sections(&response);
        let analysis = ImageAnalysis {
            description: sections.remove("description").unwrap_or_default(),
            scene: sections.remove("scene").unwrap_or_default(),
            text: sections.remove("text").unwrap_or_default(),
            story: sections.remove("story").unwrap_or_default(),
            model: model.or_else(|| Some(self.model.clone())),
        };
        // A response without headers still carries information; keep it as
        // the description rather than dropping it.
        if analysis.description.is_empty()
            && analysis.scene.is_empty()
            && analysis.text.is_empty()
            && analysis.story.is_empty()
        {
            warn!("vision response had no recognizable sections; using raw text");
            return Ok(ImageAnalysis {
                description: response.trim().to_string(),
                model: Some(self.model.clone()),
                ..Default::default()
            });
        }
        Ok(analysis)
    }
}

/// Text agent correcting extracted text, then detecting its language.
pub struct OllamaTextAgent {
    client: OllamaClient,
    model: String,
    temperature: f32,
}

impl OllamaTextAgent {
    pub fn new(client: OllamaClient, config: &OllamaConfig) -> Self {
        Self {
            client,
            model: config.text_model.clone(),
            temperature: config.text_temperature,
        }
    }

    fn build_prompt(text: &str, context: Option<&ImageAnalysis>) -> String {
        let mut ctx = String::new();
        if let Some(analysis) = context {
            ctx.push_str("\n\nImage Context:\n");
            if !analysis.description.is_empty() {
                ctx.push_str(&format!("- Description: {}\n", analysis.description));
            }
            if !analysis.scene.is_empty() {
                ctx.push_str(&format!("- Scene: {}\n", analysis.scene));
            }
            if !analysis.text.is_empty() {
                ctx.push_str(&format!(
                    "- Visible text (from vision model): {}\n",
                    analysis.text
                ));
            }
        }
        format!(
            "I have extracted text from an image using OCR. Review and correct any errors, \
complete incomplete words or sentences, and improve readability while keeping the original \
meaning.{ctx}\nOCR Extracted Text:\n{text}\n\n\
Format your response as:\nCORRECTED TEXT:\n[your corrected text here]\n\n\
CHANGES:\n[list of changes made]\n\nCONFIDENCE:\n[low/medium/high]"
        )
    }

    fn parse_refinement(response: &str) -> TextRefinement {
        let mut refinement = TextRefinement::default();
        if let Some(after) = response.split("CORRECTED TEXT:").nth(1) {
            refinement.corrected_text = after
                .split("CHANGES:")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
        }
        if let Some(after) = response.split("CHANGES:").nth(1) {
            refinement.changes = after
                .split("CONFIDENCE:")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
        }
        if let Some(after) = response.split("CONFIDENCE:").nth(1) {
            let lowered = after.trim().to_lowercase();
            refinement.confidence = if lowered.contains("high") {
                RefinementConfidence::High
            } else if lowered.contains("medium") {
                RefinementConfidence::Medium
            } else if lowered.contains("low") {
                RefinementConfidence::Low
            } else {
                RefinementConfidence::Unknown
            };
        }
        if refinement.corrected_text.is_empty() {
            // No structured sections; treat the whole response as the correction
            refinement.corrected_text = response.trim().to_string();
            refinement.changes = "unable to parse structured response".to_string();
        }
        refinement
    }

    async fn detect_language(&self, text: &str) -> Result<(String, String, bool), AgentError> {
        let prompt = format!(
            "Identify the primary language of the following text. Answer in JSON only:\n\
{{\"language\": \"<name>\", \"code\": \"<ISO 639-1 code>\", \"needs_translation\": <true/false>}}\n\
Treat needs_translation as true when the language is not English.\n\nText:\n{text}"
        );
        let (response, _) = self.client.generate(&self.model, &prompt, vec![], 0.0).await?;

        #[derive(Deserialize)]
        struct LanguageInfo {
            #[serde(default)]
            language: String,
            #[serde(default)]
            code: String,
            #[serde(default)]
            needs_translation: bool,
        }

        // The model may wrap the JSON in prose; take the first object it emits
        let start = response.find('{');
        let end = response.rfind('}');
        let info = match (start, end) {
            (Some(s), Some(e)) if e > s => {
                serde_json::from_str::<LanguageInfo>(&response[s..=e]).ok()
            }
            _ => None,
        };
        match info {
            Some(info) => {
                let code = info.code.to_lowercase();
                let needs = info.needs_translation
                    || (!code.is_empty() && code != "en" && code != "eng");
                Ok((info.language, code, needs))
            }
            None => Err(AgentError::MalformedResponse(
                "language detection returned no JSON".to_string(),
            )),
        }
    }
}

#[async_trait]
impl TextAgent for OllamaTextAgent {
    async fn refine(
        &self,
        text: &str,
        context: Option<&ImageAnalysis>,
    ) -> Result<TextRefinement, AgentError> {
        let prompt = Self::build_prompt(text, context);
        let (response, model) = self
            .client
            .generate(&self.model, &prompt, vec![], self.temperature)
            .await?;
        if response.trim().is_empty() {
            return Err(AgentError::MalformedResponse(
                "text model returned an empty response".to_string(),
            ));
        }

        let mut refinement = Self::parse_refinement(&response);
        refinement.model = model.or_else(|| Some(self.model.clone()));

        // Language detection failure is not fatal; assume no translation needed
        match self.detect_language(&refinement.corrected_text).await {
            Ok((language, code, needs)) => {
                refinement.language = language;
                refinement.language_code = code;
                refinement.needs_translation = needs;
            }
            Err(e) => {
                warn!(error = %e, "language detection failed; assuming no translation");
                refinement.language = "unknown".to_string();
                refinement.needs_translation = false;
            }
        }
        Ok(refinement)
    }
}

/// Translator agent producing target-language text.
pub struct OllamaTranslatorAgent {
    client: OllamaClient,
    model: String,
}

impl OllamaTranslatorAgent {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TranslatorAgent for OllamaTranslatorAgent {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<Translation, AgentError> {
        let prompt = format!(
            "Translate the following text to fluent, natural {target_language}. If the text is \
already {target_language}, return it unchanged. Return ONLY the translation.\n\nText:\n{text}"
        );
        let (response, model) = self.client.generate(&self.model, &prompt, vec![], 0.0).await?;
        let translated = response.trim().to_string();
        if translated.is_empty() {
            return Err(AgentError::MalformedResponse(
                "translator returned an empty response".to_string(),
            ));
        }
        Ok(Translation {
            translated_text: translated,
            source_language: String::new(),
            target_language: target_language.to_string(),
            model: model.or_else(|| Some(self.model.clone())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_with_markdown_headers() {
        let response = "\
1. **Description**: A weathered sign above a doorway.\n\
2. **Scene**: Outdoor, urban street.\n\
3. **Text**: OPEN DAILY\n\
4. **Story**: A shop waiting for its first customer.";
        let sections = parse_sections(response);
        assert_eq!(
            sections.get("description").map(String::as_str),
            Some("A weathered sign above a doorway.")
        );
        assert_eq!(sections.get("text").map(String::as_str), Some("OPEN DAILY"));
        assert_eq!(
            sections.get("story").map(String::as_str),
            Some("A shop waiting for its first customer.")
        );
    }

    #[test]
    fn test_parse_sections_plain_headers() {
        let response = "Description: a cat\nScene: indoor\nText: No visible text\nStory: nap";
        let sections = parse_sections(response);
        assert_eq!(sections.len(), 4);
        assert_eq!(sections.get("scene").map(String::as_str), Some("indoor"));
    }

    #[test]
    fn test_parse_refinement_structured() {
        let response = "\
CORRECTED TEXT:\nHello World\n\nCHANGES:\nJoined split words\n\nCONFIDENCE:\nhigh";
        let refinement = OllamaTextAgent::parse_refinement(response);
        assert_eq!(refinement.corrected_text, "Hello World");
        assert_eq!(refinement.changes, "Joined split words");
        assert_eq!(refinement.confidence, RefinementConfidence::High);
    }

    #[test]
    fn test_parse_refinement_falls_back_to_raw() {
        let refinement = OllamaTextAgent::parse_refinement("just some text");
        assert_eq!(refinement.corrected_text, "just some text");
        assert_eq!(refinement.confidence, RefinementConfidence::Unknown);
    }
}
