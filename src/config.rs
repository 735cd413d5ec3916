use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_TURNSTILE_VERIFY_URL: &str =
    "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Debug, Clone)]
pub struct Config {
    // Upstream registration API. Absent means every registration fails closed.
    pub upstream_api_url: Option<String>,

    // Bot verification (Cloudflare Turnstile)
    pub turnstile_secret_key: Option<String>,
    pub turnstile_site_key: Option<String>,
    pub turnstile_verify_url: String,

    // Outbound calls
    pub request_timeout: Duration,

    // Web server
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            upstream_api_url: non_empty_var("BE_API_URL"),

            turnstile_secret_key: non_empty_var("TURNSTILE_SECRET_KEY"),
            turnstile_site_key: non_empty_var("TURNSTILE_SITE_KEY"),
            turnstile_verify_url: std::env::var("TURNSTILE_VERIFY_URL")
                .unwrap_or_else(|_| DEFAULT_TURNSTILE_VERIFY_URL.to_string()),

            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(10),
            ),

            port: std::env::var("PORT")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("PORT must be a valid port number")?
                .unwrap_or(3000),
        })
    }
}

/// Read an environment variable, treating an empty or blank value as unset.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_var_treats_blank_as_unset() {
        std::env::set_var("TENKEI_TEST_BLANK_VAR", "   ");
        assert_eq!(non_empty_var("TENKEI_TEST_BLANK_VAR"), None);

        std::env::set_var("TENKEI_TEST_SET_VAR", " https://api.example.com ");
        assert_eq!(
            non_empty_var("TENKEI_TEST_SET_VAR"),
            Some("https://api.example.com".to_string())
        );

        assert_eq!(non_empty_var("TENKEI_TEST_MISSING_VAR"), None);
    }
}
