use anyhow::Result;
use httpmock::prelude::*;
use httpmock::MockServer;
use oxide_media_relay::media::resolver::ResolvedMedia;
use oxide_media_relay::media::ytdlp::YtDlp;
use oxide_media_relay::media::{CobaltClient, MediaDownloader, ResolverError};
use serde_json::json;
use std::sync::Arc;

const API_KEY: &str = "test-key";

fn client(server: &MockServer) -> Result<CobaltClient> {
    Ok(CobaltClient::new(&server.url("/"), Some(API_KEY))?)
}

#[tokio::test]
async fn resolve_sends_key_and_payload() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/")
            .header("authorization", "Api-Key test-key")
            .header("accept", "application/json")
            .json_body(json!({"url": "https://www.instagram.com/reel/abc/", "downloadMode": "auto"}));
        then.status(200).json_body(json!({
            "status": "redirect",
            "url": "https://cdn.example.com/abc.mp4",
            "filename": "instagram_abc.mp4"
        }));
    });

    let media = client(&server)?
        .resolve("https://www.instagram.com/reel/abc/", "1080")
        .await;

    mock.assert();
    assert_eq!(
        media,
        Some(ResolvedMedia {
            url: "https://cdn.example.com/abc.mp4".to_string(),
            filename: "instagram_abc.mp4".to_string(),
        })
    );
    Ok(())
}

#[tokio::test]
async fn picker_reply_selects_first_media_item() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/");
        then.status(200).json_body(json!({
            "status": "picker",
            "picker": [{"type": "text", "url": "a"}, {"type": "video", "url": "b"}],
            "filename": "f.mp4"
        }));
    });

    let media = client(&server)?.try_resolve("https://instagram.com/p/x", "1080").await?;
    assert_eq!(
        media,
        ResolvedMedia {
            url: "b".to_string(),
            filename: "f.mp4".to_string(),
        }
    );
    Ok(())
}

#[tokio::test]
async fn error_reply_carries_code() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/");
        then.status(200).json_body(json!({
            "status": "error",
            "error": {"code": "error.api.fetch.empty"}
        }));
    });

    let result = client(&server)?.try_resolve("https://instagram.com/p/x", "1080").await;
    assert!(matches!(
        result,
        Err(ResolverError::Remote { ref code, .. }) if code == "error.api.fetch.empty"
    ));
    Ok(())
}

#[tokio::test]
async fn http_failure_and_bad_bodies() -> Result<()> {
    let server = MockServer::start_async().await;
    let mut failing = server.mock(|when, then| {
        when.method(POST).path("/");
        then.status(500).body("boom");
    });

    let cobalt = client(&server)?;
    let result = cobalt.try_resolve("https://instagram.com/p/x", "1080").await;
    assert!(matches!(result, Err(ResolverError::Status { status: 500, .. })));
    failing.delete();

    let mut not_json = server.mock(|when, then| {
        when.method(POST).path("/");
        then.status(200).body("<html>nope</html>");
    });
    let result = cobalt.try_resolve("https://instagram.com/p/x", "1080").await;
    assert!(matches!(result, Err(ResolverError::Malformed(_))));
    not_json.delete();

    server.mock(|when, then| {
        when.method(POST).path("/");
        then.status(200).json_body(json!({"status": "local-processing"}));
    });
    let result = cobalt.try_resolve("https://instagram.com/p/x", "1080").await;
    assert!(matches!(result, Err(ResolverError::UnexpectedResponse(_))));
    Ok(())
}

#[tokio::test]
async fn instagram_download_streams_resolved_media() -> Result<()> {
    let server = MockServer::start_async().await;
    let media_url = server.url("/media/clip.mp4");
    server.mock(|when, then| {
        when.method(POST).path("/");
        then.status(200).json_body(json!({
            "status": "redirect",
            "url": media_url.as_str(),
            "filename": "../escape/My Reel.mp4"
        }));
    });
    let fetch = server.mock(|when, then| {
        when.method(GET).path("/media/clip.mp4");
        then.status(200).body("fake video bytes");
    });

    let dir = tempfile::tempdir()?;
    let downloader = MediaDownloader::with_backends(
        Arc::new(YtDlp::new("yt-dlp")),
        client(&server)?,
        dir.path().to_path_buf(),
        None,
        None,
    );

    let result = downloader
        .download_instagram("https://www.instagram.com/reel/abc/")
        .await
        .ok_or_else(|| anyhow::anyhow!("instagram download failed"))?;

    fetch.assert();
    assert_eq!(result.file_path.parent(), Some(dir.path()));
    assert!(result
        .file_path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("instagram_") && n.ends_with("_My Reel.mp4")));
    assert_eq!(std::fs::read(&result.file_path)?, b"fake video bytes");
    assert_eq!(result.title, "My Reel");
    assert_eq!(result.duration_seconds, None);
    assert_eq!(result.thumbnail_url, None);

    MediaDownloader::cleanup(&result.file_path).await;
    assert!(!result.file_path.exists());
    Ok(())
}

#[tokio::test]
async fn instagram_media_fetch_failure_leaves_no_file() -> Result<()> {
    let server = MockServer::start_async().await;
    let media_url = server.url("/media/gone.mp4");
    server.mock(|when, then| {
        when.method(POST).path("/");
        then.status(200)
            .json_body(json!({"status": "redirect", "url": media_url.as_str()}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/media/gone.mp4");
        then.status(404);
    });

    let dir = tempfile::tempdir()?;
    let downloader = MediaDownloader::with_backends(
        Arc::new(YtDlp::new("yt-dlp")),
        client(&server)?,
        dir.path().to_path_buf(),
        None,
        None,
    );

    assert!(downloader
        .download_instagram("https://www.instagram.com/p/abc/")
        .await
        .is_none());
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn closed_downloader_cannot_resolve() -> Result<()> {
    let server = MockServer::start_async().await;
    let resolve = server.mock(|when, then| {
        when.method(POST).path("/");
        then.status(200)
            .json_body(json!({"status": "redirect", "url": "https://cdn/x.mp4"}));
    });

    let dir = tempfile::tempdir()?;
    let downloader = MediaDownloader::with_backends(
        Arc::new(YtDlp::new("yt-dlp")),
        client(&server)?,
        dir.path().to_path_buf(),
        None,
        None,
    );
    downloader.close().await;

    assert!(downloader
        .download_instagram("https://www.instagram.com/p/abc/")
        .await
        .is_none());
    resolve.assert_hits(0);
    Ok(())
}
