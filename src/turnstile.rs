use crate::config::Config;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Siteverify reply. Only `success` decides the verdict.
#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Verify a bot-verification token with Cloudflare Turnstile.
///
/// Any failure (missing secret, network error, timeout, malformed reply or a
/// negative verdict) is returned as an error; callers treat them all the same.
pub async fn verify_token(client: &reqwest::Client, config: &Config, token: &str) -> Result<()> {
    let secret = config
        .turnstile_secret_key
        .as_deref()
        .context("TURNSTILE_SECRET_KEY not configured")?;

    let response = client
        .post(&config.turnstile_verify_url)
        .form(&[("secret", secret), ("response", token)])
        .send()
        .await
        .context("Failed to send request to Turnstile siteverify")?;

    if !response.status().is_success() {
        anyhow::bail!("Turnstile siteverify error ({})", response.status());
    }

    let verdict: SiteverifyResponse = response
        .json()
        .await
        .context("Failed to parse Turnstile siteverify response")?;

    if !verdict.success {
        anyhow::bail!("Turnstile rejected token: {:?}", verdict.error_codes);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    // ==================== Helper Functions ====================

    fn create_test_config(verify_url: &str) -> Config {
        Config {
            upstream_api_url: Some("http://upstream.invalid/api/register".to_string()),
            turnstile_secret_key: Some("test-secret".to_string()),
            turnstile_site_key: Some("test-site-key".to_string()),
            turnstile_verify_url: verify_url.to_string(),
            request_timeout: Duration::from_secs(5),
            port: 3000,
        }
    }

    fn client(timeout: Duration) -> reqwest::Client {
        reqwest::Client::builder().timeout(timeout).build().unwrap()
    }

    // ==================== Verification Tests ====================

    #[tokio::test]
    async fn test_verify_token_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/siteverify"))
            .and(body_string_contains("secret=test-secret"))
            .and(body_string_contains("response=good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "error-codes": []
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = create_test_config(&format!("{}/siteverify", mock_server.uri()));
        let result = verify_token(&client(Duration::from_secs(5)), &config, "good-token").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_verify_token_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error-codes": ["invalid-input-response"]
            })))
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let result = verify_token(&client(Duration::from_secs(5)), &config, "bad-token").await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid-input-response"));
    }

    #[tokio::test]
    async fn test_verify_token_malformed_reply() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let result = verify_token(&client(Duration::from_secs(5)), &config, "token").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_verify_token_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let result = verify_token(&client(Duration::from_secs(5)), &config, "token").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_verify_token_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "success": true }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri());
        let result = verify_token(&client(Duration::from_millis(200)), &config, "token").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_verify_token_without_secret_makes_no_call() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let mut config = create_test_config(&mock_server.uri());
        config.turnstile_secret_key = None;
        let result = verify_token(&client(Duration::from_secs(5)), &config, "token").await;

        assert!(result.unwrap_err().to_string().contains("TURNSTILE_SECRET_KEY"));
    }
}
