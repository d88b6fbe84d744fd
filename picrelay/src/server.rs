//! Events endpoint: receives Slack Events API callbacks, verifies the
//! request signature, and dispatches one pipeline task per triggering
//! message.
//!
//! Each accepted message runs in its own spawned task so concurrent
//! triggers never share mutable state; artifact naming in the core keeps
//! the shared working directory safe.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info, warn};

use picrelay_core::contract::MessageEvent;
use picrelay_core::fetch::HttpFetcher;
use picrelay_core::pipeline;

use crate::load_config::AppConfig;
use crate::slack::SlackClient;

/// Signed requests older than this are replays as far as we care.
const SIGNATURE_MAX_AGE_SECS: i64 = 300;

struct AppState {
    fetcher: HttpFetcher,
    api: SlackClient,
    signing_secret: String,
    work_dir: PathBuf,
}

pub async fn serve(config: AppConfig) -> Result<()> {
    let fetcher = HttpFetcher::new(config.bot_token.clone())?;
    let api = SlackClient::new(&config).map_err(|e| anyhow::anyhow!("slack client: {e}"))?;
    let work_dir = std::env::current_dir()?;

    let state = Arc::new(AppState {
        fetcher,
        api,
        signing_secret: config.signing_secret,
        work_dir,
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "listening for Slack events");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/slack/events", post(events))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventsPayload {
    UrlVerification { challenge: String },
    EventCallback { event: serde_json::Value },
    #[serde(other)]
    Other,
}

async fn events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let timestamp = header(&headers, "x-slack-request-timestamp");
    let signature = header(&headers, "x-slack-signature");
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    if !verify_signature(&state.signing_secret, timestamp, &body, signature, now) {
        warn!("rejected events request with bad signature");
        return (StatusCode::UNAUTHORIZED, String::new());
    }

    let payload: EventsPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "undecodable events payload");
            return (StatusCode::BAD_REQUEST, String::new());
        }
    };

    match payload {
        EventsPayload::UrlVerification { challenge } => (StatusCode::OK, challenge),
        EventsPayload::EventCallback { event } => {
            dispatch_message(state, event);
            (StatusCode::OK, String::new())
        }
        EventsPayload::Other => (StatusCode::OK, String::new()),
    }
}

/// Filter the callback down to plain user messages and spawn the pipeline
/// for them. The HTTP response never waits on a conversion.
fn dispatch_message(state: Arc<AppState>, event: serde_json::Value) {
    if event.get("type").and_then(|t| t.as_str()) != Some("message") {
        debug!("ignoring non-message event callback");
        return;
    }
    // Skip bot messages (loop prevention) and subtypes (edits, deletes).
    if event.get("bot_id").is_some() || event.get("subtype").is_some() {
        debug!("ignoring bot message or message subtype");
        return;
    }

    let message: MessageEvent = match serde_json::from_value(event) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "message event missing expected fields");
            return;
        }
    };

    tokio::spawn(async move {
        pipeline::handle_message(&state.fetcher, &state.api, &state.work_dir, &message).await;
    });
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Check the platform's `v0=` HMAC-SHA256 request signature over
/// `v0:<timestamp>:<body>`, with a bounded timestamp window.
fn verify_signature(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    provided: &str,
    now_epoch: i64,
) -> bool {
    let Ok(ts) = timestamp.parse::<i64>() else {
        return false;
    };
    if (now_epoch - ts).abs() > SIGNATURE_MAX_AGE_SECS {
        return false;
    }
    let Some(hex_signature) = provided.strip_prefix("v0=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_signature) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
