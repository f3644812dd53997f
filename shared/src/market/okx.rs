//! HMAC-signed token metadata lookup against the OKX wallet API.
//!
//! The signing secret stays server-side; browsers reach this through the
//! api crate's proxy route instead of calling OKX directly.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

const TOKEN_DETAIL_PATH: &str = "/api/v5/wallet/token/token-detail";
// Solana, the chain the watched meme tokens live on.
const CHAIN_INDEX: &str = "501";

#[derive(Debug, Deserialize)]
struct OkxResponse<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<T>,
}

/// Token metadata as returned by the wallet API; numeric fields arrive as
/// strings and are passed through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetail {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub market_cap: String,
    #[serde(default)]
    pub volume_24h: String,
}

#[derive(Clone)]
pub struct OkxClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    secret_key: String,
    passphrase: String,
    project_id: String,
}

impl OkxClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.okx_api_url.clone(),
            api_key: config.okx_api_key.clone(),
            secret_key: config.okx_secret_key.clone(),
            passphrase: config.okx_passphrase.clone(),
            project_id: config.okx_project_id.clone(),
        }
    }

    pub async fn token_detail(&self, token_address: &str) -> Result<TokenDetail> {
        let token_address = token_address.trim();
        if token_address.is_empty() {
            return Err(Error::Validation("token address is empty".to_string()));
        }

        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let query = format!("chainIndex={}&tokenAddress={}", CHAIN_INDEX, token_address);
        let canonical = canonical_request(&timestamp, "GET", TOKEN_DETAIL_PATH, &query);
        let signature = sign(&self.secret_key, &canonical)?;

        let url = format!("{}{}?{}", self.base_url, TOKEN_DETAIL_PATH, query);
        debug!(%url, "Requesting token detail");

        let response = self
            .http
            .get(&url)
            .header("OK-ACCESS-KEY", &self.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.passphrase)
            .header("OK-ACCESS-PROJECT", &self.project_id)
            .send()
            .await?
            .error_for_status()?;

        let body: OkxResponse<TokenDetail> = response
            .json()
            .await
            .map_err(|e| Error::Format(format!("unexpected token-detail payload: {}", e)))?;
        if body.code != "0" {
            return Err(Error::Format(format!(
                "token-detail rejected: code {} ({})",
                body.code, body.msg
            )));
        }
        body.data
            .into_iter()
            .next()
            .ok_or_else(|| Error::Format("token-detail response has no data".to_string()))
    }
}

fn canonical_request(timestamp: &str, method: &str, path: &str, query: &str) -> String {
    format!("{}{}{}?{}", timestamp, method, path, query)
}

fn sign(secret: &str, canonical: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| Error::Config("invalid OKX secret key".to_string()))?;
    mac.update(canonical.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_string_is_timestamp_method_path_query() {
        let canonical = canonical_request(
            "2024-05-01T00:00:00.000Z",
            "GET",
            TOKEN_DETAIL_PATH,
            "chainIndex=501&tokenAddress=abc",
        );
        assert_eq!(
            canonical,
            "2024-05-01T00:00:00.000ZGET/api/v5/wallet/token/token-detail?chainIndex=501&tokenAddress=abc"
        );
    }

    #[test]
    fn signature_is_deterministic_base64_hmac() {
        let a = sign("secret", "payload").unwrap();
        let b = sign("secret", "payload").unwrap();
        assert_eq!(a, b);
        // 32-byte HMAC-SHA256 digest encodes to 44 base64 characters.
        assert_eq!(a.len(), 44);
        assert_ne!(a, sign("other-secret", "payload").unwrap());
        assert_ne!(a, sign("secret", "other-payload").unwrap());
    }
}
