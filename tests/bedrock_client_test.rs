use howto_bot::config::AnalysisSettings;
use howto_bot::core::{AnalysisRequest, AnalysisService, ImageAttachment};
use howto_bot::{BedrockClient, BotError};
use httpmock::prelude::*;
use serde_json::json;
use std::path::PathBuf;

fn settings(server: &MockServer) -> AnalysisSettings {
    AnalysisSettings {
        endpoint: server.base_url(),
        api_token: "bedrock-token".to_string(),
        model_id: "test-model".to_string(),
        temperature: 0.1,
        timeout_seconds: 5,
    }
}

#[tokio::test]
async fn test_invoke_sends_images_and_joins_text_blocks() {
    let server = MockServer::start();

    let invoke_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/model/test-model/invoke")
            .header("authorization", "Bearer bedrock-token")
            .json_body_partial(
                r#"{
                    "anthropic_version": "bedrock-2023-05-31",
                    "max_tokens": 4000
                }"#,
            )
            .body_contains(r#""role":"user""#)
            .body_contains(r#""media_type":"image/png""#)
            .body_contains("Describe the dashboard");
        then.status(200).json_body(json!({
            "id": "msg_1",
            "content": [
                {"type": "text", "text": "<h2>Objective</h2>"},
                {"type": "text", "text": "<p>Track care KPIs</p>"}
            ],
            "stop_reason": "end_turn"
        }));
    });

    let client = BedrockClient::new(&settings(&server)).unwrap();
    let request = AnalysisRequest::text("Describe the dashboard", 4000).with_images(vec![
        ImageAttachment {
            path: PathBuf::from("view.png"),
            media_type: "image/png".to_string(),
            data: "iVBORw0KGgo=".to_string(),
            size_bytes: 8,
        },
    ]);

    let text = client.invoke(&request).await.unwrap();

    invoke_mock.assert();
    assert_eq!(text, "<h2>Objective</h2><p>Track care KPIs</p>");
    assert_eq!(client.model_id(), "test-model");
}

#[tokio::test]
async fn test_expired_token_is_reported_with_suggestion() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/model/test-model/invoke");
        then.status(403)
            .body(r#"{"message":"ExpiredTokenException: The security token included in the request is expired"}"#);
    });

    let client = BedrockClient::new(&settings(&server)).unwrap();
    let err = client
        .invoke(&AnalysisRequest::text("hello", 10))
        .await
        .unwrap_err();

    match &err {
        BotError::ServiceError { status, message, .. } => {
            assert_eq!(*status, 403);
            assert!(message.contains("ExpiredToken"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.recovery_suggestion().contains("expired"));
}

#[tokio::test]
async fn test_reply_without_text_is_a_format_error() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/model/test-model/invoke");
        then.status(200).json_body(json!({"content": []}));
    });

    let client = BedrockClient::new(&settings(&server)).unwrap();
    let err = client
        .invoke(&AnalysisRequest::text("hello", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::ResponseFormatError { .. }));
}

#[tokio::test]
async fn test_configured_temperature_is_sent() {
    let server = MockServer::start();

    let warm = server.mock(|when, then| {
        when.method(POST)
            .path("/model/test-model/invoke")
            .body_contains(r#""temperature":0.7"#);
        then.status(200)
            .json_body(json!({"content": [{"type": "text", "text": "ok"}]}));
    });

    let client = BedrockClient::new(&AnalysisSettings {
        temperature: 0.7,
        ..settings(&server)
    })
    .unwrap();
    let text = client.invoke(&AnalysisRequest::text("hello", 10)).await.unwrap();

    warm.assert();
    assert_eq!(text, "ok");
}
