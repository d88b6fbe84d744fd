//! Relay uploader: push the converted artifact back to the platform,
//! request a public share, and derive the stable public download URL.
//!
//! Each sub-step (upload, share, permalink parse) fails independently and
//! is identified in the resulting [`UploadError`]. The local artifact is
//! released on every exit path of this stage; only a parse failure after a
//! successful upload leaves the remote copy behind.

use std::sync::LazyLock;

use regex::Regex;

use crate::artifact::TempArtifact;
use crate::contract::SlackApi;
use crate::error::UploadError;

static PERMALINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://slack-files\.com/([^-/]+)-([^-/]+)-(.+)$").unwrap()
});

/// Components parsed out of the platform's share-permalink response. Used
/// only to reconstruct the public URL; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareResult {
    pub team_id: String,
    pub file_id: String,
    pub pub_secret: String,
}

/// Structural parse of a share permalink. Anything that does not match the
/// known shape (the platform changed its response, or the share silently
/// failed) is a typed [`UploadError::LinkParse`], not an unchecked fault.
pub fn parse_permalink(permalink: &str) -> Result<ShareResult, UploadError> {
    let captures = PERMALINK
        .captures(permalink)
        .ok_or_else(|| UploadError::LinkParse(permalink.to_string()))?;
    Ok(ShareResult {
        team_id: captures[1].to_string(),
        file_id: captures[2].to_string(),
        pub_secret: captures[3].to_string(),
    })
}

/// Platform normalization of public file names: lower-cased, spaces
/// replaced with underscores.
pub fn normalize_file_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Stable public download URL for a shared file, per the platform's known
/// URL template.
pub fn public_url(share: &ShareResult, file_name: &str) -> String {
    format!(
        "https://files.slack.com/files-pri/{}-{}/{}?pub_secret={}",
        share.team_id,
        share.file_id,
        normalize_file_name(file_name),
        share.pub_secret
    )
}

/// Upload the converted artifact under `display_name`, share it publicly,
/// and derive the public link.
pub async fn upload_and_share<A>(
    api: &A,
    mut artifact: TempArtifact,
    display_name: &str,
) -> Result<String, UploadError>
where
    A: SlackApi + ?Sized,
{
    let release = |artifact: &mut TempArtifact| {
        if let Err(e) = artifact.release() {
            tracing::warn!(error = %e, "cleanup of converted artifact failed");
        }
    };

    let bytes = match artifact.read_for_upload() {
        Ok(bytes) => bytes,
        Err(e) => {
            release(&mut artifact);
            return Err(UploadError::Read(e));
        }
    };

    tracing::info!(file_name = display_name, bytes = bytes.len(), "uploading converted file");
    let file_id = match api.upload_file(display_name, bytes).await {
        Ok(id) => id,
        Err(e) => {
            release(&mut artifact);
            return Err(UploadError::Upload(e.to_string()));
        }
    };

    tracing::info!(file_id = %file_id, "requesting public share");
    let permalink = match api.share_public(&file_id).await {
        Ok(link) => link,
        Err(e) => {
            release(&mut artifact);
            return Err(UploadError::Share(e.to_string()));
        }
    };

    // Local space is reclaimed before the parse: a bad permalink must not
    // leave the converted file on disk.
    release(&mut artifact);

    let share = parse_permalink(&permalink)?;
    Ok(public_url(&share, display_name))
}
