//! # contract: trait seams for the pipeline's external collaborators
//!
//! This module defines the inbound event shape the pipeline reads and the
//! two traits it calls out through: [`Fetcher`] for the authenticated
//! attachment download and [`SlackApi`] for upload, public share and
//! threaded replies.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests.
//!
//! ## Adding New Platforms
//! - Implement both traits for your platform client.
//! - Convert all meaningful upstream errors into the typed errors (for
//!   [`Fetcher`]) or a boxed error (for [`SlackApi`]); the relay stage maps
//!   boxed errors to its own taxonomy per sub-step.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use mockall::automock;
use serde::Deserialize;

use crate::error::FetchError;

/// One attached file on an inbound message. The pipeline only ever reads
/// the private URL and the platform-provided name.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub url_private: String,
    pub name: String,
}

/// The inbound message shape the pipeline consumes. Delivery, retries and
/// authentication of these events belong to the hosting layer.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub files: Vec<Attachment>,
    pub channel: String,
    pub ts: String,
}

impl MessageEvent {
    /// Reply target for this message: same channel, threaded on its ts.
    pub fn thread(&self) -> ThreadRef {
        ThreadRef {
            channel: self.channel.clone(),
            ts: self.ts.clone(),
        }
    }
}

/// Opaque reply target: the platform needs both the channel and the
/// message timestamp to thread a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRef {
    pub channel: String,
    pub ts: String,
}

/// Byte stream yielded by a [`Fetcher`]; items surface transport failures
/// mid-download as [`FetchError`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>;

/// Trait for the authenticated download of an attachment's private URL.
/// Single best-effort attempt; the implementor applies a bounded timeout.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET the private URL with bearer authorization, following redirects.
    /// Non-success status or transport failure is a [`FetchError`].
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError>;
}

/// Trait for the platform's file and messaging API. Implemented by the
/// real Slack client in the binary crate and by test mocks.
///
/// The trait is `Send` + `Sync` and intended for async/await usage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Upload raw file bytes under the given display name, returning the
    /// platform's internal file identifier.
    async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Request a public share for an uploaded file, returning the
    /// permalink string from the platform's response.
    async fn share_public(
        &self,
        file_id: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Post a threaded reply.
    async fn post_reply(
        &self,
        text: &str,
        thread: &ThreadRef,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
