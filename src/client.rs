use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::textutil::lang_label;

/// What kind of text a batch carries; selects the prompt register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextDomain {
    /// Word-family paragraphs.
    Paragraphs,
    /// Spreadsheet cell values.
    Cells,
}

/// Boundary to the external translation capability. One outbound call per
/// invocation, no retries at this layer: the chunk executor alone decides
/// whether to retry as a batch or degrade to singletons.
///
/// The output array always has exactly the input's length and order, or the
/// call fails with `ClientError::MalformedResponse`.
pub trait TranslationClient {
    fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
        domain: TextDomain,
    ) -> Result<Vec<String>, ClientError>;

    /// Singleton translate, expressed as a one-element batch so the strict
    /// shape validator stays the only parsing path.
    fn translate_one(
        &self,
        text: &str,
        target_lang: &str,
        domain: TextDomain,
    ) -> Result<String, ClientError> {
        let texts = [text.to_string()];
        let mut out = self.translate_batch(&texts, target_lang, domain)?;
        Ok(out.pop().unwrap_or_default())
    }
}

const PARAGRAPH_PROMPT: &str = "\
You are a professional document translator.
Translate the following JSON array of paragraphs into \"{target_lang}\" language.
Each element is a complete paragraph. Maintain paragraph structure and meaning.
IMPORTANT: Return ONLY a raw JSON array of strings. No markdown, no explanations.
The output array must have exactly the same number of elements as the input.

Input JSON:
{input_json}
";

const CELL_PROMPT: &str = "\
You are a professional spreadsheet translator.
Translate the following JSON array of cell values into \"{target_lang}\" language.
Maintain terminology and formatting appropriate for spreadsheets.
IMPORTANT: Return ONLY a raw JSON array of strings. No markdown, no explanations.
The output array must have exactly the same number of elements as the input.

Input JSON:
{input_json}
";

fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (k, v) in vars {
        out = out.replace(&format!("{{{k}}}"), v);
    }
    out
}

/// Build the single prompt for a batch call: inputs embedded as a JSON
/// array of independent strings, translated without merging or reordering.
pub fn build_batch_prompt(texts: &[String], target_lang: &str, domain: TextDomain) -> String {
    let template = match domain {
        TextDomain::Paragraphs => PARAGRAPH_PROMPT,
        TextDomain::Cells => CELL_PROMPT,
    };
    let input_json = serde_json::to_string(texts).unwrap_or_else(|_| "[]".to_string());
    render_template(
        template,
        &[
            ("target_lang", lang_label(target_lang).as_str()),
            ("input_json", input_json.as_str()),
        ],
    )
}

/// Drop the code fences models add despite instructions.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Strict shape validation for a batch reply: JSON array of strings, exact
/// input length. Violations are `MalformedResponse` and route through the
/// executor's fallback, never up to the pipeline caller.
pub fn parse_batch_response(raw: &str, expected_len: usize) -> Result<Vec<String>, ClientError> {
    let cleaned = strip_code_fences(raw);
    let parsed: Vec<String> = serde_json::from_str(&cleaned).map_err(|e| {
        let head: String = cleaned.chars().take(120).collect();
        ClientError::MalformedResponse(format!("not a JSON string array: {e} (got: {head})"))
    })?;
    if parsed.len() != expected_len {
        return Err(ClientError::MalformedResponse(format!(
            "expected {expected_len} elements, got {}",
            parsed.len()
        )));
    }
    Ok(parsed)
}

/// Gemini `generateContent` client, the production `TranslationClient`.
/// Constructed once per process and passed into the pipeline explicitly;
/// there is no shared global model handle.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

impl GeminiClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Request(format!("build http client: {e}")))?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn generate(&self, prompt: &str) -> Result<String, ClientError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base.trim_end_matches('/'),
            self.model,
            self.api_key
        );
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        let resp = self.http.post(&url).json(&body).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: resp.text().unwrap_or_default(),
            });
        }
        let parsed: GenerateResponse = resp
            .json()
            .map_err(|e| ClientError::MalformedResponse(format!("response envelope: {e}")))?;
        let text: String = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .concat()
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ClientError::MalformedResponse(
                "empty completion".to_string(),
            ));
        }
        Ok(text)
    }
}

impl TranslationClient for GeminiClient {
    fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
        domain: TextDomain,
    ) -> Result<Vec<String>, ClientError> {
        let prompt = build_batch_prompt(texts, target_lang, domain);
        let raw = self.generate(&prompt)?;
        parse_batch_response(&raw, texts.len())
    }
}
