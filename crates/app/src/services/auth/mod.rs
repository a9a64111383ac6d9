//! Embedded-app authentication.
//!
//! Requests carry a Shopify App Bridge session token (HS256 JWT signed with
//! the app secret). The shop comes from the `dest` claim. The shop's offline
//! Admin API token is loaded from the database, or obtained once through
//! token exchange and stored.
//!
//! Webhooks are authenticated separately with an HMAC over the raw body.

mod error;

pub use error::AuthError;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use sqlx::PgPool;
use tracing::instrument;

use shelfwise_core::ShopDomain;

use crate::config::ShopifyAppConfig;
use crate::db::ShopSessionRepository;

type HmacSha256 = Hmac<Sha256>;

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const SUBJECT_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:id_token";
const OFFLINE_TOKEN_TYPE: &str = "urn:shopify:params:oauth:token-type:offline-access-token";

/// Claims of an App Bridge session token.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    /// `https://{shop}/admin`
    pub iss: String,
    /// `https://{shop}`
    pub dest: String,
    /// App client ID.
    pub aud: String,
    /// Staff member ID.
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub sid: Option<String>,
}

/// Verify a session token and return the shop it was issued for.
///
/// # Errors
///
/// Returns `AuthError::InvalidToken` if the signature, audience, expiry or
/// issuer check fails, and `AuthError::InvalidShop` if `dest` is not a shop.
pub fn verify_session_token(
    token: &str,
    config: &ShopifyAppConfig,
) -> Result<(ShopDomain, SessionClaims), AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.api_key.as_str()]);
    validation.validate_nbf = true;
    validation.set_required_spec_claims(&["exp", "aud"]);

    let key = DecodingKey::from_secret(config.api_secret.expose_secret().as_bytes());
    let claims = jsonwebtoken::decode::<SessionClaims>(token, &key, &validation)?.claims;

    let dest_host = host_of(&claims.dest)
        .ok_or_else(|| AuthError::InvalidToken("dest is not a URL".to_string()))?;
    let iss_host = host_of(&claims.iss)
        .ok_or_else(|| AuthError::InvalidToken("iss is not a URL".to_string()))?;
    if dest_host != iss_host {
        return Err(AuthError::InvalidToken(
            "iss and dest name different shops".to_string(),
        ));
    }

    let shop = ShopDomain::parse(&dest_host)?;
    Ok((shop, claims))
}

fn host_of(value: &str) -> Option<String> {
    url::Url::parse(value)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Verify a webhook's `X-Shopify-Hmac-Sha256` header against the raw body.
#[must_use]
pub fn verify_webhook_hmac(secret: &SecretString, body: &[u8], signature_b64: &str) -> bool {
    let Ok(expected) = BASE64.decode(signature_b64.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Offline access token returned by token exchange.
#[derive(Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
}

impl std::fmt::Debug for TokenExchangeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchangeResponse")
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Exchange a session token for an offline Admin API access token.
///
/// `base_url` is the shop's origin, e.g. `https://example.myshopify.com`.
///
/// # Errors
///
/// Returns `AuthError::TokenExchange` if the request fails or Shopify
/// answers with an error status.
#[instrument(skip(http, config, session_token))]
pub async fn exchange_session_token(
    http: &reqwest::Client,
    base_url: &str,
    config: &ShopifyAppConfig,
    session_token: &str,
) -> Result<TokenExchangeResponse, AuthError> {
    let endpoint = format!(
        "{}/admin/oauth/access_token",
        base_url.trim_end_matches('/')
    );
    let form = [
        ("client_id", config.api_key.as_str()),
        ("client_secret", config.api_secret.expose_secret()),
        ("grant_type", GRANT_TYPE),
        ("subject_token", session_token),
        ("subject_token_type", SUBJECT_TOKEN_TYPE),
        ("requested_token_type", OFFLINE_TOKEN_TYPE),
    ];

    let response = http.post(&endpoint).form(&form).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, "Token exchange rejected");
        return Err(AuthError::TokenExchange(format!("HTTP {status}: {body}")));
    }

    Ok(response.json().await?)
}

/// Authenticates embedded-app requests against stored shop sessions.
pub struct ShopAuthService<'a> {
    sessions: ShopSessionRepository<'a>,
    http: &'a reqwest::Client,
    config: &'a ShopifyAppConfig,
}

impl<'a> ShopAuthService<'a> {
    /// Create a new shop authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, http: &'a reqwest::Client, config: &'a ShopifyAppConfig) -> Self {
        Self {
            sessions: ShopSessionRepository::new(pool),
            http,
            config,
        }
    }

    /// Verify `session_token` and return the shop with its offline token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the token is invalid, the exchange fails, or
    /// the session store is unavailable.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        session_token: &str,
    ) -> Result<(ShopDomain, SecretString), AuthError> {
        let (shop, _claims) = verify_session_token(session_token, self.config)?;

        if let Some(session) = self.sessions.get_by_shop(&shop).await? {
            return Ok((shop, session.access_token));
        }

        tracing::info!(shop = %shop, "No stored session, performing token exchange");
        let exchanged = exchange_session_token(
            self.http,
            &format!("https://{}", shop.as_str()),
            self.config,
            session_token,
        )
        .await?;

        let scopes: Vec<String> = exchanged
            .scope
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self.sessions
            .save(&shop, &exchanged.access_token, &scopes)
            .await?;

        Ok((shop, SecretString::from(exchanged.access_token)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret-value-with-enough-entropy";

    fn config() -> ShopifyAppConfig {
        ShopifyAppConfig {
            api_key: "app-key".to_string(),
            api_secret: SecretString::from(SECRET),
            api_version: "2025-10".to_string(),
        }
    }

    fn token(claims: &serde_json::Value, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(aud: &str, exp_offset: i64) -> serde_json::Value {
        let now = chrono::Utc::now().timestamp();
        json!({
            "iss": "https://example.myshopify.com/admin",
            "dest": "https://example.myshopify.com",
            "aud": aud,
            "sub": "42",
            "exp": now + exp_offset,
            "nbf": now - 10,
            "iat": now - 10,
            "jti": "abc",
            "sid": "s1",
        })
    }

    #[test]
    fn test_verify_session_token_valid() {
        let jwt = token(&claims("app-key", 60), SECRET);
        let (shop, claims) = verify_session_token(&jwt, &config()).unwrap();
        assert_eq!(shop.as_str(), "example.myshopify.com");
        assert_eq!(claims.sub.as_deref(), Some("42"));
    }

    #[test]
    fn test_verify_session_token_rejects_wrong_secret() {
        let jwt = token(&claims("app-key", 60), "another-secret-entirely-different");
        assert!(matches!(
            verify_session_token(&jwt, &config()),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_verify_session_token_rejects_wrong_audience() {
        let jwt = token(&claims("other-app", 60), SECRET);
        assert!(verify_session_token(&jwt, &config()).is_err());
    }

    #[test]
    fn test_verify_session_token_rejects_expired() {
        let jwt = token(&claims("app-key", -3600), SECRET);
        assert!(verify_session_token(&jwt, &config()).is_err());
    }

    #[test]
    fn test_verify_session_token_rejects_mismatched_issuer() {
        let mut c = claims("app-key", 60);
        c["iss"] = json!("https://attacker.myshopify.com/admin");
        let jwt = token(&c, SECRET);
        assert!(matches!(
            verify_session_token(&jwt, &config()),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_verify_webhook_hmac() {
        let secret = SecretString::from(SECRET);
        let body = br#"{"id":1}"#;
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        let signature = BASE64.encode(mac.finalize().into_bytes());

        assert!(verify_webhook_hmac(&secret, body, &signature));
        assert!(!verify_webhook_hmac(&secret, b"tampered", &signature));
        assert!(!verify_webhook_hmac(&secret, body, "not base64!"));
    }
}
