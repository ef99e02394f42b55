use httpmock::prelude::*;
use serde_json::json;
use youtube_mcp_server::adapters::YoutubeDataClient;
use youtube_mcp_server::domain::model::VideoId;
use youtube_mcp_server::domain::ports::VideoDetailsProvider;
use youtube_mcp_server::{ServerConfig, ServerError};

fn config_for(server: &MockServer) -> ServerConfig {
    let mut config = ServerConfig::new("test-api-key");
    config.api_base = server.base_url();
    config.request_timeout_seconds = 5;
    config
}

fn video_id() -> VideoId {
    VideoId::parse("dQw4w9WgXcQ").unwrap()
}

#[tokio::test]
async fn test_video_details_success() {
    let server = MockServer::start_async().await;

    let api_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/videos")
                .query_param("part", "snippet,statistics,contentDetails")
                .query_param("id", "dQw4w9WgXcQ")
                .query_param("key", "test-api-key");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "kind": "youtube#videoListResponse",
                    "items": [{
                        "id": "dQw4w9WgXcQ",
                        "snippet": {
                            "publishedAt": "2009-10-25T06:57:33Z",
                            "title": "Rick Astley - Never Gonna Give You Up",
                            "description": "The official video",
                            "channelTitle": "Rick Astley"
                        },
                        "contentDetails": {"duration": "PT3M34S"},
                        "statistics": {
                            "viewCount": "1600000000",
                            "likeCount": "18000000",
                            "commentCount": "2400000"
                        }
                    }]
                }));
        })
        .await;

    let client = YoutubeDataClient::new(&config_for(&server)).unwrap();
    let details = client.video_details(&video_id()).await.unwrap();

    api_mock.assert_async().await;
    assert_eq!(details.title, "Rick Astley - Never Gonna Give You Up");
    assert_eq!(details.channel_title, "Rick Astley");
    assert_eq!(details.published_at, "2009-10-25T06:57:33Z");
    assert_eq!(details.duration, "PT3M34S");
    assert_eq!(details.view_count, "1600000000");
    assert_eq!(details.like_count, "18000000");
    assert_eq!(details.comment_count, "2400000");
}

#[tokio::test]
async fn test_hidden_statistics_default_to_zero() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/videos");
            then.status(200).json_body(json!({
                "items": [{"snippet": {"title": "No stats"}, "statistics": {"viewCount": "5"}}]
            }));
        })
        .await;

    let client = YoutubeDataClient::new(&config_for(&server)).unwrap();
    let details = client.video_details(&video_id()).await.unwrap();

    assert_eq!(details.view_count, "5");
    assert_eq!(details.like_count, "0");
    assert_eq!(details.comment_count, "0");
    assert_eq!(details.duration, "");
}

#[tokio::test]
async fn test_video_not_found() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/videos");
            then.status(200).json_body(json!({"items": []}));
        })
        .await;

    let client = YoutubeDataClient::new(&config_for(&server)).unwrap();
    let result = client.video_details(&video_id()).await;

    match result {
        Err(e @ ServerError::VideoNotFound { .. }) => {
            assert_eq!(e.to_string(), "Video not found or unavailable")
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_non_200_status_is_reported() {
    let server = MockServer::start_async().await;

    let api_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/videos");
            then.status(403).json_body(json!({"error": {"code": 403, "message": "quotaExceeded"}}));
        })
        .await;

    let client = YoutubeDataClient::new(&config_for(&server)).unwrap();
    let result = client.video_details(&video_id()).await;

    api_mock.assert_async().await;
    match result {
        Err(e) => assert_eq!(e.to_string(), "YouTube API request failed with status 403"),
        Ok(details) => panic!("unexpected details: {:?}", details),
    }
}
