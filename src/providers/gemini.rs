use std::time::Duration;

use reqwest::{Client as HttpClient, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::GeminiConfig,
    errors::{AppError, Result},
    models::{Fragment, GenerationRequest},
    providers::GenerationClient,
};

/// Gemini `generateContent` over REST, asking for image output only.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        let mut builder = HttpClient::builder().user_agent("tryon-studio/0.1");
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http_client: builder.build()?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl GenerationClient for GeminiClient {
    fn preflight(&self) -> Result<()> {
        if self
            .api_key
            .as_deref()
            .map(str::trim)
            .is_none_or(str::is_empty)
        {
            return Err(AppError::Dispatch(
                "no API key configured (set gemini.api_key or GEMINI_API_KEY)".to_string(),
            ));
        }

        let url = Url::parse(&self.url())
            .map_err(|err| AppError::Dispatch(format!("invalid endpoint {:?}: {err}", self.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Dispatch(format!(
                "endpoint scheme {:?} is not http(s)",
                url.scheme()
            )));
        }

        Ok(())
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerateContentResponse> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let payload = GenerateContentRequest::from_request(request);

        debug!(
            target: "gemini",
            model = %self.model,
            title = %request.title,
            parts = payload.contents[0].parts.len(),
            images = request.image_count(),
            prompt_chars = request.instruction_text().len(),
            "sending generateContent request"
        );

        let started = std::time::Instant::now();
        let response = self
            .http_client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "service returned {status}: {}",
                truncate(&body, 300)
            )));
        }

        let body: GenerateContentResponse = response.json().await?;
        debug!(
            target: "gemini",
            title = %request.title,
            candidates = body.candidates.len(),
            elapsed_ms = elapsed_ms(started.elapsed()),
            "generateContent response received"
        );
        Ok(body)
    }
}

fn elapsed_ms(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfigBody<'a>,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        let parts = request
            .fragments
            .iter()
            .map(|fragment| match fragment {
                Fragment::Text(text) => RequestPart::Text {
                    text: text.as_str(),
                },
                Fragment::Image(image) => RequestPart::InlineData {
                    inline_data: InlineDataRef {
                        mime_type: image.media_type(),
                        data: image.data(),
                    },
                },
            })
            .collect();

        Self {
            contents: [RequestContent { role: "user", parts }],
            generation_config: GenerationConfigBody {
                response_modalities: ["IMAGE"],
                image_config: ImageConfigBody {
                    aspect_ratio: request.aspect_ratio.as_str(),
                },
            },
        }
    }
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataRef<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataRef<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigBody<'a> {
    response_modalities: [&'static str; 1],
    image_config: ImageConfigBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfigBody<'a> {
    aspect_ratio: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// The first inline image across candidates and their parts, in order.
    /// Any further images are ignored.
    pub fn first_image(&self) -> Option<&InlineData> {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .find_map(|part| part.inline_data.as_ref().filter(|data| !data.data.is_empty()))
    }

    /// Explains an image-less response as well as the payload allows.
    pub fn missing_image_reason(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return format!("request blocked: {reason}");
        }

        if let Some(reason) = self
            .candidates
            .iter()
            .find_map(|candidate| candidate.finish_reason.as_deref())
            .filter(|reason| *reason != "STOP")
        {
            return format!("no image returned (finish reason {reason})");
        }

        let text = self
            .candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join(" ");

        if text.trim().is_empty() {
            "no image returned".to_string()
        } else {
            format!("no image returned: {}", truncate(text.trim(), 200))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

impl InlineData {
    #[cfg(test)]
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}
