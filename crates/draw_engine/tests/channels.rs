use std::time::Duration;

use draw_engine::{
    ChannelClient, ChannelFailure, DiscordClient, HttpSettings, LineClient, MessageHandle,
    TelegramClient,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn line_push_sends_bearer_token_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/push"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({
            "to": "C123",
            "messages": [{ "type": "text", "text": "hello" }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = LineClient::new(&HttpSettings::default(), "secret", "C123")
        .unwrap()
        .with_api_base(server.uri());
    assert_eq!(client.name(), "line:C123");
    assert_eq!(client.send("hello").await.unwrap(), None);
}

#[tokio::test]
async fn line_rate_limit_uses_retry_after_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/push"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let client = LineClient::new(&HttpSettings::default(), "secret", "C123")
        .unwrap()
        .with_api_base(server.uri());
    let err = client.send("hello").await.unwrap_err();
    assert_eq!(
        err.kind,
        ChannelFailure::RateLimited {
            retry_after: Duration::from_secs(7)
        }
    );
}

#[tokio::test]
async fn line_cannot_edit() {
    let client = LineClient::new(&HttpSettings::default(), "secret", "C123").unwrap();
    let err = client
        .edit(&MessageHandle("1".to_string()), "hello")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ChannelFailure::Unsupported);
}

#[tokio::test]
async fn line_rejection_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/push"))
        .respond_with(ResponseTemplate::new(400).set_body_string("{\"message\":\"bad to\"}"))
        .mount(&server)
        .await;

    let client = LineClient::new(&HttpSettings::default(), "secret", "C123")
        .unwrap()
        .with_api_base(server.uri());
    let err = client.send("hello").await.unwrap_err();
    assert_eq!(err.kind, ChannelFailure::HttpStatus(400));
    assert!(err.message.contains("bad to"));
}

#[tokio::test]
async fn telegram_send_returns_message_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botTOKEN/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": "-100", "text": "digest" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "message_id": 42 },
        })))
        .mount(&server)
        .await;

    let client = TelegramClient::new(&HttpSettings::default(), "TOKEN", "-100")
        .unwrap()
        .with_api_base(server.uri());
    let handle = client.send("digest").await.unwrap();
    assert_eq!(handle, Some(MessageHandle("42".to_string())));
}

#[tokio::test]
async fn telegram_edit_of_missing_message_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botTOKEN/editMessageText"))
        .and(body_partial_json(json!({ "message_id": 42 })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: message to edit not found",
        })))
        .mount(&server)
        .await;

    let client = TelegramClient::new(&HttpSettings::default(), "TOKEN", "-100")
        .unwrap()
        .with_api_base(server.uri());
    let err = client
        .edit(&MessageHandle("42".to_string()), "digest")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ChannelFailure::NotFound);
}

#[tokio::test]
async fn telegram_unchanged_edit_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botTOKEN/editMessageText"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: message is not modified: specified new message content is exactly the same",
        })))
        .mount(&server)
        .await;

    let client = TelegramClient::new(&HttpSettings::default(), "TOKEN", "-100")
        .unwrap()
        .with_api_base(server.uri());
    client
        .edit(&MessageHandle("42".to_string()), "digest")
        .await
        .unwrap();
}

#[tokio::test]
async fn telegram_rate_limit_reads_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botTOKEN/sendMessage"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 3",
            "parameters": { "retry_after": 3 },
        })))
        .mount(&server)
        .await;

    let client = TelegramClient::new(&HttpSettings::default(), "TOKEN", "-100")
        .unwrap()
        .with_api_base(server.uri());
    let err = client.send("digest").await.unwrap_err();
    assert_eq!(
        err.kind,
        ChannelFailure::RateLimited {
            retry_after: Duration::from_secs(3)
        }
    );
}

#[tokio::test]
async fn discord_send_then_edit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/123/abc"))
        .and(query_param("wait", "true"))
        .and(body_partial_json(json!({ "content": "first" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "987" })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/webhooks/123/abc/messages/987"))
        .and(body_partial_json(json!({ "content": "second" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "987" })))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/api/webhooks/123/abc", server.uri());
    let client = DiscordClient::new(&HttpSettings::default(), url).unwrap();
    assert_eq!(client.name(), "discord:123");

    let handle = client.send("first").await.unwrap().unwrap();
    assert_eq!(handle, MessageHandle("987".to_string()));
    client.edit(&handle, "second").await.unwrap();
}

#[tokio::test]
async fn discord_deleted_message_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/webhooks/123/abc/messages/1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Unknown Message",
            "code": 10008,
        })))
        .mount(&server)
        .await;

    let url = format!("{}/api/webhooks/123/abc", server.uri());
    let client = DiscordClient::new(&HttpSettings::default(), url).unwrap();
    let err = client
        .edit(&MessageHandle("1".to_string()), "text")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ChannelFailure::NotFound);
}

#[tokio::test]
async fn discord_rate_limit_reads_fractional_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/123/abc"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "message": "You are being rate limited.",
            "retry_after": 1.5,
            "global": false,
        })))
        .mount(&server)
        .await;

    let url = format!("{}/api/webhooks/123/abc", server.uri());
    let client = DiscordClient::new(&HttpSettings::default(), url).unwrap();
    let err = client.send("text").await.unwrap_err();
    assert_eq!(
        err.kind,
        ChannelFailure::RateLimited {
            retry_after: Duration::from_millis(1500)
        }
    );
}
