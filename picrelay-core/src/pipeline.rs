//! High-level pipeline: orchestrates trigger → fetch → convert → upload →
//! reply for one inbound message.
//!
//! The hosting process runs one of these per triggering message, each in
//! its own task; requests share nothing mutable but the working directory,
//! and artifact names are request-unique (see [`crate::artifact`]).
//!
//! # Failure semantics
//! Any stage failure aborts the request, releases whatever artifact the
//! pipeline still holds, and produces exactly one threaded reply quoting a
//! short reason. Cleanup failures are logged, never re-raised: cleanup
//! must not crash the reply path. No failure is fatal to the process.

use std::path::Path;

use tracing::{error, info, warn};

use crate::artifact::{self, TempArtifact};
use crate::contract::{Fetcher, MessageEvent, SlackApi, ThreadRef};
use crate::convert;
use crate::error::RelayError;
use crate::relay;
use crate::trigger::{self, TargetFormat, TriggerDecision};

/// What one inbound message amounted to.
#[derive(Debug)]
pub enum Outcome {
    /// No trigger: the message was not addressed to us.
    Ignored,
    /// Conversion succeeded; carries the derived public link.
    Converted(String),
    /// The pipeline aborted; an error reply was sent.
    Failed(RelayError),
}

/// Everything the pipeline does for one request, created when the trigger
/// accepts the message and discarded once the reply is out.
#[derive(Debug)]
struct ConversionRequest<'a> {
    source_file_name: &'a str,
    source_url: &'a str,
    target: TargetFormat,
    thread: ThreadRef,
}

/// Run the full pipeline for one inbound message and send the reply.
pub async fn handle_message<F, A>(
    fetcher: &F,
    api: &A,
    work_dir: &Path,
    event: &MessageEvent,
) -> Outcome
where
    F: Fetcher + ?Sized,
    A: SlackApi + ?Sized,
{
    let thread = event.thread();
    let request = match trigger::match_trigger(&event.text, &event.files) {
        TriggerDecision::Ignore => return Outcome::Ignored,
        TriggerDecision::MissingAttachment => {
            return fail(api, &thread, RelayError::NoAttachment).await;
        }
        TriggerDecision::Convert(target) => {
            // Only the first attachment is considered.
            let Some(file) = event.files.first() else {
                return fail(api, &thread, RelayError::NoAttachment).await;
            };
            ConversionRequest {
                source_file_name: &file.name,
                source_url: &file.url_private,
                target,
                thread,
            }
        }
    };

    info!(
        file = request.source_file_name,
        target = %request.target,
        ts = %request.thread.ts,
        "trigger accepted, starting conversion"
    );

    match run(fetcher, api, work_dir, event, &request).await {
        Ok(link) => {
            let text = format!("Here's your {}! {}", request.target, link);
            send_reply(api, &text, &request.thread).await;
            info!(link = %link, "conversion complete");
            Outcome::Converted(link)
        }
        Err(e) => fail(api, &request.thread, e).await,
    }
}

async fn run<F, A>(
    fetcher: &F,
    api: &A,
    work_dir: &Path,
    event: &MessageEvent,
    request: &ConversionRequest<'_>,
) -> Result<String, RelayError>
where
    F: Fetcher + ?Sized,
    A: SlackApi + ?Sized,
{
    info!(stage = "fetching", url = request.source_url, "downloading attachment");
    let stream = fetcher.fetch(request.source_url).await?;

    info!(stage = "writing", "persisting original artifact");
    let token = artifact::request_token(&event.ts);
    let sanitized = artifact::sanitize_file_name(request.source_file_name);
    let disk_name = format!("{token}_{sanitized}");
    let original = TempArtifact::write_from_stream(work_dir, &disk_name, stream).await?;

    info!(stage = "converting", target = %request.target, "re-encoding image");
    let stem = file_stem(&sanitized);
    let converted = convert::convert(
        original,
        work_dir,
        &format!("{token}_{stem}"),
        request.target,
    )?;

    info!(stage = "uploading", "relaying converted artifact");
    let display_name = format!("{stem}.{}", request.target.extension());
    let link = relay::upload_and_share(api, converted, &display_name).await?;
    Ok(link)
}

async fn fail<A>(api: &A, thread: &ThreadRef, e: RelayError) -> Outcome
where
    A: SlackApi + ?Sized,
{
    warn!(error = %e, ts = %thread.ts, "pipeline failed");
    let text = format!("Sorry, that conversion failed ({e}). Try again?");
    send_reply(api, &text, thread).await;
    Outcome::Failed(e)
}

async fn send_reply<A>(api: &A, text: &str, thread: &ThreadRef)
where
    A: SlackApi + ?Sized,
{
    info!(stage = "replying", ts = %thread.ts, "posting threaded reply");
    if let Err(e) = api.post_reply(text, thread).await {
        // The request is already terminal either way; nothing left to do
        // but record that the user never saw the reply.
        error!(error = %e, ts = %thread.ts, "could not post reply");
    }
}

/// Name portion before the final extension, `Cat_Photo.png` → `Cat_Photo`.
fn file_stem(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}
