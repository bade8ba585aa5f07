//! HTTP contract tests for the chat-completions provider and the signature
//! client, against a local mock server.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use nescrowee_llm::{
    AttestationError, AttestationSource, CompletionRequest, LLMError, LLMProvider, Message,
    OpenAICompatConfig, OpenAICompatProvider, SignatureClient, ToolSpec,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> OpenAICompatProvider {
    OpenAICompatProvider::new(OpenAICompatConfig {
        base_url: server.uri(),
        api_key: "test-key".to_string(),
        default_model: "test-model".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn list_evidence_tool() -> ToolSpec {
    ToolSpec {
        name: "list_evidence".to_string(),
        description: "List evidence files".to_string(),
        parameters: serde_json::json!({"type": "object", "properties": {}}),
    }
}

#[tokio::test]
async fn completion_sends_tools_and_parses_tool_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "deepseek",
            "tool_choice": "auto",
            "tools": [{"type": "function", "function": {"name": "list_evidence"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "deepseek",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_a",
                        "type": "function",
                        "function": {"name": "list_evidence", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = CompletionRequest::new(vec![Message::user("dispute")])
        .with_model("deepseek")
        .with_tools(vec![list_evidence_tool()]);
    let response = provider(&server).complete(request).await.unwrap();

    assert_eq!(response.id, "chatcmpl-1");
    assert!(response.text().is_none());
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].name, "list_evidence");
    assert_eq!(response.usage.total_tokens, 15);
}

#[tokio::test]
async fn completion_falls_back_to_chat_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "chat_id": "chat-77",
            "choices": [{"message": {"role": "assistant", "content": "{\"resolution\":\"Client\"}"}}]
        })))
        .mount(&server)
        .await;

    let response = provider(&server)
        .complete(CompletionRequest::new(vec![Message::user("x")]))
        .await
        .unwrap();

    assert_eq!(response.id, "chat-77");
    assert_eq!(response.text(), Some("{\"resolution\":\"Client\"}"));
    assert_eq!(response.model.as_deref(), Some("test-model"));
}

#[tokio::test]
async fn completion_tolerates_partial_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "resp-9",
            "choices": [{"message": {"role": "assistant", "content": "done"}}],
            "usage": {"prompt_tokens": 120}
        })))
        .mount(&server)
        .await;

    let response = provider(&server)
        .complete(CompletionRequest::new(vec![Message::user("x")]))
        .await
        .unwrap();

    assert_eq!(response.id, "resp-9");
    assert_eq!(response.usage.prompt_tokens, 120);
    assert_eq!(response.usage.completion_tokens, 0);
    assert_eq!(response.usage.total_tokens, 0);
}

#[tokio::test]
async fn completion_maps_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(CompletionRequest::new(vec![Message::user("x")]))
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::RateLimited { retry_after_seconds: 7 }));
}

#[tokio::test]
async fn completion_without_choices_is_invalid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "chatcmpl-2", "choices": []})),
        )
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(CompletionRequest::new(vec![Message::user("x")]))
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::InvalidResponse { .. }));
}

#[tokio::test]
async fn completion_server_error_is_request_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(CompletionRequest::new(vec![Message::user("x")]))
        .await
        .unwrap_err();

    match err {
        LLMError::RequestFailed { message } => assert!(message.contains("boom")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn signature_is_fetched_and_decoded() {
    let server = MockServer::start().await;
    let key = SigningKey::from_bytes(&[3u8; 32]);
    let text = "request-hash:response-hash";
    let signature = key.sign(text.as_bytes()).to_bytes();

    Mock::given(method("GET"))
        .and(path("/signature/chatcmpl-1"))
        .and(query_param("model", "deepseek"))
        .and(query_param("signing_algo", "ed25519"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "text": text,
            "signature": STANDARD.encode(signature),
            "signing_address": STANDARD.encode(key.verifying_key().to_bytes()),
            "signing_algo": "ed25519"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SignatureClient::new(server.uri(), "test-key", Duration::from_secs(5)).unwrap();
    let attestation = client.get_attestation("chatcmpl-1", "deepseek").await.unwrap();

    assert_eq!(attestation.signed_text, text);
    assert_eq!(attestation.signature.len(), 64);
    assert!(attestation.verify().is_ok());
}

#[tokio::test]
async fn signature_not_found_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/signature/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = SignatureClient::new(server.uri(), "test-key", Duration::from_secs(5)).unwrap();
    let err = client.get_attestation("missing", "deepseek").await.unwrap_err();

    assert!(matches!(err, AttestationError::Status { status: 404, .. }));
}

#[tokio::test]
async fn signature_with_bad_base64_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/signature/chatcmpl-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "text": "t",
            "signature": "%%%",
            "signing_address": "AAAA"
        })))
        .mount(&server)
        .await;

    let client = SignatureClient::new(server.uri(), "test-key", Duration::from_secs(5)).unwrap();
    let err = client.get_attestation("chatcmpl-9", "deepseek").await.unwrap_err();

    assert!(matches!(err, AttestationError::Encoding { field: "signature", .. }));
}
