//! NOVA proxy contract tests

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nescrowee_vault::{EvidenceVault, NovaConfig, NovaVaultClient, VaultError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> NovaVaultClient {
    NovaVaultClient::new(NovaConfig {
        proxy_url: format!("{}/api/nova-proxy", server.uri()),
        api_key: "nova-key".to_string(),
        account_id: "agent.testnet".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn retrieve_decodes_base64_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/nova-proxy"))
        .and(header("authorization", "Bearer nova-key"))
        .and(body_partial_json(serde_json::json!({
            "action": "retrieve",
            "nearAccountId": "agent.testnet",
            "contractId": "c1",
            "cid": "bafy1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": STANDARD.encode("# Delivery notes\nShipped on day 3")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let bytes = client(&server).retrieve("c1", "bafy1").await.unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), "# Delivery notes\nShipped on day 3");
}

#[tokio::test]
async fn proxy_error_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/nova-proxy"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(serde_json::json!({"error": "not a group member"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).retrieve("c1", "bafy1").await.unwrap_err();
    match err {
        VaultError::Rejected { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "not a group member");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn invalid_payload_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": "***"})))
        .mount(&server)
        .await;

    let err = client(&server).retrieve("c1", "bafy1").await.unwrap_err();
    assert!(matches!(err, VaultError::Malformed(_)));
}
