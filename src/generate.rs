//! Generative answer backend, treated as an opaque `prompt -> text` call.
//!
//! One synchronous request per question, no retries or streaming. Any
//! transport, quota or auth failure surfaces as [`Error::Generative`]
//! for that question only and never terminates the session.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_BASE: &str =
    "https://generativelanguage.googleapis.com/v1beta/models";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// An opaque generative model: prompt in, text out.
pub trait Generator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Gemini-backed [`Generator`] over the REST API.
pub struct GeminiGenerator {
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl GeminiGenerator {
    /// Build a generator for `model` (default: [`DEFAULT_MODEL`]).
    ///
    /// The API key comes from `GEMINI_API_KEY`, falling back to
    /// `GOOGLE_API_KEY`; missing both is a configuration error.
    pub fn from_env(model: Option<&str>) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .map_err(|_| {
                Error::Config(
                    "set GEMINI_API_KEY (or GOOGLE_API_KEY) to use the \
                     generative answer mode"
                        .into(),
                )
            })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::Generative(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            api_key,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Generator for GeminiGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{API_BASE}/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| Error::Generative(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Generative(format!(
                "model endpoint returned {status}: {text}"
            )));
        }

        let parsed: GenerateResponse = resp.json().map_err(|e| {
            Error::Generative(format!("unparseable response: {e}"))
        })?;

        let answer = parsed
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if answer.is_empty() {
            return Err(Error::Generative(
                "model returned no candidates".into(),
            ));
        }

        Ok(answer)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}
