use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::classify::ReviewClassifier;
use crate::config::LlmConfig;
use crate::extract::{append_email_block, extract_report, ExtractOutcome};
use crate::models::{Classification, Sentiment, TaggedReview, Theme, ThemeStat};
use crate::prompts;
use crate::pulse::{default_subject, PulseSynthesizer, NOTE_WORD_BUDGET};
use crate::redact::{cap_words_by_line, scrub, strip_braces, summary_line};

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct RawClassification {
    theme: String,
    sentiment: String,
    #[serde(default)]
    summary_1line: String,
}

/// Thin client for an OpenAI-compatible `/chat/completions` endpoint.
/// One request per call, no retries.
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    config: LlmConfig,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    pub async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String> {
        let start = std::time::Instant::now();
        let url = format!("{}/chat/completions", self.config.api_base);
        debug!("LLM call starting - prompt_length={} chars", user.len());

        let body = json!({
            "model": self.config.model,
            "temperature": 0.2,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("model endpoint returned {status}: {detail}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("model endpoint returned an unreadable body")?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("model endpoint returned no content"))?;

        info!(
            "LLM API call completed - duration={:.2}s, response_length={} chars",
            start.elapsed().as_secs_f32(),
            answer.len()
        );
        Ok(answer)
    }
}

/// Removes a surrounding markdown code fence, if any.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.strip_suffix("```").unwrap_or(trimmed).trim_end();
    };
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Pulls an email block that sits in its own fence after the note out of
/// that fence, dropping the fence lines and their language tag. A reply
/// that is fenced as a whole is left for `strip_code_fence`.
fn unfence_trailing_block(reply: &str) -> String {
    let trimmed = reply.trim();
    let Some(body) = trimmed.strip_suffix("```") else {
        return trimmed.to_string();
    };
    let Some(open) = body.rfind("```") else {
        return trimmed.to_string();
    };
    let block = body[open + 3..]
        .split_once('\n')
        .map_or("", |(_, rest)| rest)
        .trim();
    if open == 0 || !block.starts_with('{') {
        return trimmed.to_string();
    }
    format!("{}\n\n{}", body[..open].trim_end(), block)
}

/// Validates a classifier reply against the closed theme and sentiment sets
/// and forces the summary through the PII scrubber and length cap.
pub fn parse_classification(reply: &str) -> anyhow::Result<Classification> {
    let body = strip_code_fence(reply);
    let start = body.find('{').context("classifier reply has no JSON object")?;
    let end = body.rfind('}').context("classifier reply has no JSON object")?;
    if end < start {
        bail!("classifier reply has no JSON object");
    }

    let raw: RawClassification =
        serde_json::from_str(&body[start..=end]).context("classifier reply is not valid JSON")?;
    let theme = Theme::from_label(&raw.theme)
        .ok_or_else(|| anyhow!("classifier returned unknown theme {:?}", raw.theme))?;
    let sentiment = Sentiment::from_label(&raw.sentiment)
        .ok_or_else(|| anyhow!("classifier returned unknown sentiment {:?}", raw.sentiment))?;

    Ok(Classification {
        theme,
        sentiment,
        summary_1line: summary_line(&raw.summary_1line),
    })
}

/// Rebuilds a model-written pulse so it honors the note contract: PII
/// scrubbed, no stray braces, at most the word budget, and a well-formed
/// email block at the end.
pub fn enforce_pulse_contract(reply: &str, week: &str) -> anyhow::Result<String> {
    let reply = unfence_trailing_block(reply);
    let extraction = extract_report(strip_code_fence(&reply));
    if extraction.outcome != ExtractOutcome::WellFormed {
        debug!("Model reply had no usable email block ({:?})", extraction.outcome);
    }

    let note = cap_words_by_line(&strip_braces(&scrub(&extraction.report.weekly_note)), NOTE_WORD_BUDGET);
    if note.trim().is_empty() {
        bail!("model returned an empty weekly note");
    }

    let subject = match scrub(extraction.report.email_subject.trim()) {
        subject if subject.is_empty() => default_subject(week),
        subject => subject,
    };
    let body = match scrub(extraction.report.email_body.trim()) {
        body if body.is_empty() => note.clone(),
        body => body,
    };

    append_email_block(&note, &subject, &body)
}

pub struct LlmClassifier {
    client: ChatClient,
    system: String,
}

impl LlmClassifier {
    pub fn new(client: ChatClient, app_name: &str) -> Self {
        Self {
            client,
            system: prompts::classifier_system(app_name),
        }
    }
}

#[async_trait]
impl ReviewClassifier for LlmClassifier {
    async fn classify(&self, full_text: &str, rating: i32) -> anyhow::Result<Classification> {
        let reply = self
            .client
            .complete(&self.system, &prompts::classifier_user(full_text, rating))
            .await?;
        parse_classification(&reply)
    }
}

pub struct LlmSynthesizer {
    client: ChatClient,
    app_name: String,
}

impl LlmSynthesizer {
    pub fn new(client: ChatClient, app_name: &str) -> Self {
        Self {
            client,
            app_name: app_name.to_string(),
        }
    }
}

#[async_trait]
impl PulseSynthesizer for LlmSynthesizer {
    async fn synthesize(
        &self,
        stats: &[ThemeStat],
        reviews: &[TaggedReview],
        week: &str,
    ) -> anyhow::Result<String> {
        let system = prompts::pulse_system(&self.app_name);
        let user = prompts::pulse_user(&self.app_name, stats, reviews, week);
        let reply = self.client.complete(&system, &user).await?;
        enforce_pulse_contract(&reply, week)
    }
}
