//! End-to-end pipeline runs against mocked collaborators: no network, no
//! real Slack, just the conversion semantics and the cleanup contract.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tempfile::tempdir;

use picrelay_core::contract::{
    Attachment, ByteStream, MessageEvent, MockFetcher, MockSlackApi,
};
use picrelay_core::error::{FetchError, RelayError, UploadError};
use picrelay_core::pipeline::{handle_message, Outcome};

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 120, 200]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn event(text: &str, files: Vec<Attachment>) -> MessageEvent {
    MessageEvent {
        text: text.to_string(),
        files,
        channel: "C123".to_string(),
        ts: "1616045677.000300".to_string(),
    }
}

fn fetcher_serving(bytes: Vec<u8>) -> MockFetcher {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().returning(move |_| {
        let chunks: Vec<Result<Bytes, FetchError>> = vec![Ok(Bytes::from(bytes.clone()))];
        let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
        Ok(stream)
    });
    fetcher
}

/// Mock API capturing every reply text, with upload/share wired for the
/// happy path unless overridden.
fn api_with_replies(replies: Arc<Mutex<Vec<String>>>) -> MockSlackApi {
    let mut api = MockSlackApi::new();
    api.expect_post_reply().returning(move |text, _| {
        replies.lock().unwrap().push(text.to_string());
        Ok(())
    });
    api
}

#[tokio::test]
async fn heic_attachment_converted_to_png_yields_png_link() {
    let dir = tempdir().unwrap();
    let replies = Arc::new(Mutex::new(Vec::new()));

    let fetcher = fetcher_serving(png_bytes());
    let mut api = api_with_replies(Arc::clone(&replies));
    api.expect_upload_file()
        .returning(|_, _| Ok("F42".to_string()));
    api.expect_share_public()
        .returning(|_| Ok("https://slack-files.com/T1-F42-secret".to_string()));

    let event = event(
        "please convert to PNG",
        vec![Attachment {
            url_private: "https://files.slack.com/private/photo".into(),
            name: "Holiday Snap.heic".into(),
        }],
    );

    let outcome = handle_message(&fetcher, &api, dir.path(), &event).await;

    let link = match outcome {
        Outcome::Converted(link) => link,
        other => panic!("expected Converted, got {other:?}"),
    };
    assert_eq!(
        link,
        "https://files.slack.com/files-pri/T1-F42/holiday_snap.png?pub_secret=secret"
    );
    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains(&link), "reply must carry the link");
    assert!(link.ends_with(".png?pub_secret=secret"));
    assert_eq!(
        std::fs::read_dir(dir.path()).unwrap().count(),
        0,
        "no artifacts may survive the run"
    );
}

#[tokio::test]
async fn same_extension_request_round_trips_to_a_link() {
    let dir = tempdir().unwrap();
    let replies = Arc::new(Mutex::new(Vec::new()));

    let fetcher = fetcher_serving(png_bytes());
    let mut api = api_with_replies(Arc::clone(&replies));
    api.expect_upload_file()
        .returning(|_, _| Ok("F7".to_string()));
    api.expect_share_public()
        .returning(|_| Ok("https://slack-files.com/T1-F7-s".to_string()));

    // Target format equals the attachment's own extension; the converted
    // artifact lands on the original's path and must survive to upload.
    let event = event(
        "png please",
        vec![Attachment {
            url_private: "https://files.slack.com/private/photo".into(),
            name: "photo.png".into(),
        }],
    );
    let outcome = handle_message(&fetcher, &api, dir.path(), &event).await;

    let link = match outcome {
        Outcome::Converted(link) => link,
        other => panic!("expected Converted, got {other:?}"),
    };
    assert_eq!(
        link,
        "https://files.slack.com/files-pri/T1-F7/photo.png?pub_secret=s"
    );
    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains(&link));
    assert_eq!(
        std::fs::read_dir(dir.path()).unwrap().count(),
        0,
        "no artifacts may survive the run"
    );
}

#[tokio::test]
async fn keyword_without_attachment_replies_with_the_error() {
    let dir = tempdir().unwrap();
    let replies = Arc::new(Mutex::new(Vec::new()));

    let fetcher = MockFetcher::new();
    let api = api_with_replies(Arc::clone(&replies));

    let outcome = handle_message(&fetcher, &api, dir.path(), &event("png please", vec![])).await;

    assert!(matches!(outcome, Outcome::Failed(RelayError::NoAttachment)));
    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert!(
        replies[0].contains("carried no file"),
        "reply must name the failure: {}",
        replies[0]
    );
}

#[tokio::test]
async fn message_without_keyword_is_silently_ignored() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new();
    // No expectations: any reply would panic the mock.
    let api = MockSlackApi::new();

    let outcome = handle_message(&fetcher, &api, dir.path(), &event("good morning", vec![])).await;
    assert!(matches!(outcome, Outcome::Ignored));
}

#[tokio::test]
async fn forbidden_download_fails_without_writing_anything() {
    let dir = tempdir().unwrap();
    let replies = Arc::new(Mutex::new(Vec::new()));

    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_fetch()
        .returning(|_| Err(FetchError::Status(403)));
    let api = api_with_replies(Arc::clone(&replies));

    let event = event(
        "jpeg it",
        vec![Attachment {
            url_private: "https://files.slack.com/private/photo".into(),
            name: "photo.png".into(),
        }],
    );
    let outcome = handle_message(&fetcher, &api, dir.path(), &event).await;

    assert!(matches!(
        outcome,
        Outcome::Failed(RelayError::Fetch(FetchError::Status(403)))
    ));
    assert_eq!(
        std::fs::read_dir(dir.path()).unwrap().count(),
        0,
        "no artifact may be written when the download is rejected"
    );
    assert_eq!(replies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_permalink_fails_but_leaves_no_local_artifact() {
    let dir = tempdir().unwrap();
    let replies = Arc::new(Mutex::new(Vec::new()));

    let fetcher = fetcher_serving(png_bytes());
    let mut api = api_with_replies(Arc::clone(&replies));
    api.expect_upload_file()
        .returning(|_, _| Ok("F42".to_string()));
    api.expect_share_public()
        .returning(|_| Ok("https://example.com/not-a-permalink".to_string()));

    let event = event(
        "bmp please",
        vec![Attachment {
            url_private: "https://files.slack.com/private/photo".into(),
            name: "photo.png".into(),
        }],
    );
    let outcome = handle_message(&fetcher, &api, dir.path(), &event).await;

    assert!(matches!(
        outcome,
        Outcome::Failed(RelayError::Upload(UploadError::LinkParse(_)))
    ));
    assert_eq!(
        std::fs::read_dir(dir.path()).unwrap().count(),
        0,
        "converted artifact must be deleted even when the permalink is bad"
    );
}

#[tokio::test]
async fn upload_failure_cleans_up_the_converted_artifact() {
    let dir = tempdir().unwrap();
    let replies = Arc::new(Mutex::new(Vec::new()));

    let fetcher = fetcher_serving(png_bytes());
    let mut api = api_with_replies(Arc::clone(&replies));
    api.expect_upload_file()
        .returning(|_, _| Err("service unavailable".into()));

    let event = event(
        "tiff",
        vec![Attachment {
            url_private: "https://files.slack.com/private/photo".into(),
            name: "photo.png".into(),
        }],
    );
    let outcome = handle_message(&fetcher, &api, dir.path(), &event).await;

    assert!(matches!(
        outcome,
        Outcome::Failed(RelayError::Upload(UploadError::Upload(_)))
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
