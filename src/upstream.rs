use crate::registration::UpstreamPayload;
use anyhow::{Context, Result};
use serde_json::Value;

/// What the registration API answered, relayed to the caller unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    /// The JSON body, or `{}` when the API did not answer with JSON.
    pub body: Value,
}

/// POST the whitelisted payload to the registration API.
///
/// Only transport failures (connection, timeout) are errors; every HTTP
/// status, including 4xx and 5xx, is a reply to relay.
pub async fn forward_registration(
    client: &reqwest::Client,
    url: &str,
    payload: &UpstreamPayload,
) -> Result<UpstreamReply> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .context("Failed to send request to registration API")?;

    let status = response.status().as_u16();
    let body = response
        .json::<Value>()
        .await
        .unwrap_or_else(|_| Value::Object(Default::default()));

    Ok(UpstreamReply { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::RegistrationSubmission;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn create_payload() -> UpstreamPayload {
        RegistrationSubmission::from_untrusted(&json!({
            "name": "Test User",
            "whatsapp": "08123456789",
            "password": "password123",
            "password_confirm": "password123",
            "consent_datastore": true
        }))
        .to_upstream("token-abc")
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_forward_relays_json_reply() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/register"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({
                "name": "Test User",
                "turnstile_token": "token-abc"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/api/register", mock_server.uri());
        let reply = forward_registration(&client(), &url, &create_payload())
            .await
            .expect("Should forward");

        assert_eq!(reply.status, 201);
        assert_eq!(reply.body, json!({ "id": 7 }));
    }

    #[tokio::test]
    async fn test_forward_relays_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({ "error": "Already registered" })),
            )
            .mount(&mock_server)
            .await;

        let reply = forward_registration(&client(), &mock_server.uri(), &create_payload())
            .await
            .expect("HTTP errors are replies");

        assert_eq!(reply.status, 409);
        assert_eq!(reply.body["error"], "Already registered");
    }

    #[tokio::test]
    async fn test_forward_non_json_body_becomes_empty_object() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&mock_server)
            .await;

        let reply = forward_registration(&client(), &mock_server.uri(), &create_payload())
            .await
            .expect("Should relay");

        assert_eq!(reply.status, 502);
        assert_eq!(reply.body, json!({}));
    }

    #[tokio::test]
    async fn test_forward_connection_failure_is_error() {
        // Bind then release a port so nothing is listening on it.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let url = format!("http://{}/api/register", addr);

        let result = forward_registration(&client(), &url, &create_payload()).await;

        assert!(result.is_err());
    }
}
