#![doc = "Concrete Slack Web API client: implements the core SlackApi contract over reqwest."]
//!
//! Bridges the trait abstraction in `picrelay-core::contract` to the real
//! platform: `files.upload` (multipart, user token), `files.sharedPublicURL`
//! (user token) and `chat.postMessage` (bot token, threaded). Every
//! response's `ok` field is checked and the platform's `error` string is
//! carried into the returned error, so a silent failure upstream still
//! surfaces as a typed stage failure in the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use picrelay_core::contract::{SlackApi, ThreadRef};

use crate::load_config::AppConfig;

const API_BASE: &str = "https://slack.com/api";
const API_TIMEOUT: Duration = Duration::from_secs(30);

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct SlackClient {
    http: reqwest::Client,
    bot_token: String,
    user_token: String,
    base_url: String,
}

impl SlackClient {
    pub fn new(config: &AppConfig) -> Result<Self, BoxError> {
        let http = reqwest::Client::builder().timeout(API_TIMEOUT).build()?;
        Ok(Self {
            http,
            bot_token: config.bot_token.clone(),
            user_token: config.user_token.clone(),
            base_url: API_BASE.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    ok: bool,
    error: Option<String>,
    file: Option<UploadedFile>,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ShareResponse {
    ok: bool,
    error: Option<String>,
    file: Option<SharedFile>,
}

#[derive(Debug, Deserialize)]
struct SharedFile {
    permalink_public: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

fn api_error(call: &str, error: Option<String>) -> BoxError {
    format!(
        "{call} returned ok=false: {}",
        error.unwrap_or_else(|| "no error field".to_string())
    )
    .into()
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, BoxError> {
        tracing::info!(file_name, bytes = bytes.len(), "files.upload");
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("filename", file_name.to_string());

        let response: UploadResponse = self
            .http
            .post(format!("{}/files.upload", self.base_url))
            .bearer_auth(&self.user_token)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(api_error("files.upload", response.error));
        }
        let file = response
            .file
            .ok_or("files.upload response carried no file object")?;
        tracing::info!(file_id = %file.id, "upload accepted");
        Ok(file.id)
    }

    async fn share_public(&self, file_id: &str) -> Result<String, BoxError> {
        tracing::info!(file_id, "files.sharedPublicURL");
        let response: ShareResponse = self
            .http
            .post(format!("{}/files.sharedPublicURL", self.base_url))
            .bearer_auth(&self.user_token)
            .form(&[("file", file_id)])
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(api_error("files.sharedPublicURL", response.error));
        }
        response
            .file
            .and_then(|f| f.permalink_public)
            .ok_or_else(|| "share response carried no permalink_public".into())
    }

    async fn post_reply(&self, text: &str, thread: &ThreadRef) -> Result<(), BoxError> {
        tracing::info!(channel = %thread.channel, ts = %thread.ts, "chat.postMessage");
        let response: PostMessageResponse = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.bot_token)
            .json(&serde_json::json!({
                "channel": thread.channel,
                "text": text,
                "thread_ts": thread.ts,
            }))
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(api_error("chat.postMessage", response.error));
        }
        Ok(())
    }
}
