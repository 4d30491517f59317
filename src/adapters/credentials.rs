use crate::adapters::transport::{ReqwestTransport, Transport};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;

/// OAuth2 scope required by the HTTP v1 send endpoint.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("failed to read credential file: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential material is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid credential material: {0}")]
    InvalidMaterial(String),
    #[error("field \"{0}\" is missing from the credential material")]
    MissingField(&'static str),
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("token exchange failed with status {status}: {message}")]
    Exchange { status: u16, message: String },
    #[error("token exchange request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl CredentialError {
    /// True when the loaded material itself is unusable, as opposed to a failed exchange.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Json(_) | Self::InvalidMaterial(_) | Self::MissingField(_))
    }
}

/// Source of the bearer-authenticated transport and project id used by the v1 API.
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Returns a transport that authenticates every request for `scope`.
    ///
    /// # Errors
    /// Returns `CredentialError` if the material is incomplete or the token exchange fails.
    async fn authorize(&self, scope: &str) -> Result<Arc<dyn Transport>, CredentialError>;

    /// # Errors
    /// Returns `CredentialError::MissingField` if the material carries no project id.
    fn project_id(&self) -> Result<String, CredentialError>;
}

#[derive(Deserialize)]
struct ServiceAccountFile {
    #[serde(rename = "type")]
    kind: Option<String>,
    project_id: Option<String>,
    private_key: Option<String>,
    client_email: Option<String>,
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Serialize)]
struct CustomTokenClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    claims: Option<&'a Map<String, Value>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Google service-account key material.
///
/// Only `type` is checked on load; the remaining fields are required lazily by
/// the operations that need them.
#[derive(Clone)]
pub struct ServiceAccount {
    project_id: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    token_uri: String,
    http: reqwest::Client,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    /// # Errors
    /// Returns `CredentialError` if the file cannot be read or is not a service-account key.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// # Errors
    /// Returns `CredentialError` if `raw` is not JSON or its `type` is not `service_account`.
    pub fn from_json(raw: &str) -> Result<Self, CredentialError> {
        let file: ServiceAccountFile = serde_json::from_str(raw)?;
        match file.kind.as_deref() {
            Some("service_account") => {}
            Some(other) => {
                return Err(CredentialError::InvalidMaterial(format!(
                    "expected a \"service_account\" key, got \"{other}\""
                )));
            }
            None => return Err(CredentialError::MissingField("type")),
        }

        Ok(Self {
            project_id: file.project_id.filter(|v| !v.is_empty()),
            client_email: file.client_email.filter(|v| !v.is_empty()),
            private_key: file.private_key.filter(|v| !v.is_empty()),
            token_uri: file.token_uri.filter(|v| !v.is_empty()).unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            http: reqwest::Client::new(),
        })
    }

    /// Client used both for the token exchange and for the authorized transport.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// # Errors
    /// Returns `CredentialError::MissingField` if `client_email` is absent.
    pub fn client_email(&self) -> Result<&str, CredentialError> {
        self.client_email.as_deref().ok_or(CredentialError::MissingField("client_email"))
    }

    fn signing_key(&self) -> Result<EncodingKey, CredentialError> {
        let pem = self.private_key.as_deref().ok_or(CredentialError::MissingField("private_key"))?;
        EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| CredentialError::InvalidMaterial(format!("private key is not a valid RSA PEM: {e}")))
    }

    /// Signs an identity-toolkit custom token for `uid`, valid for one hour.
    ///
    /// # Errors
    /// Returns `CredentialError` if the key material is incomplete or signing fails.
    pub fn encode_custom_token(
        &self,
        uid: &str,
        claims: Option<&Map<String, Value>>,
    ) -> Result<String, CredentialError> {
        let email = self.client_email()?;
        let key = self.signing_key()?;
        let iat = OffsetDateTime::now_utc().unix_timestamp();
        let payload = CustomTokenClaims {
            iss: email,
            sub: email,
            aud: CUSTOM_TOKEN_AUDIENCE,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
            uid,
            claims: claims.filter(|c| !c.is_empty()),
        };
        Ok(encode(&Header::new(Algorithm::RS256), &payload, &key)?)
    }

    fn sign_assertion(&self, scope: &str) -> Result<String, CredentialError> {
        let email = self.client_email()?;
        let key = self.signing_key()?;
        let iat = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AssertionClaims { iss: email, scope, aud: &self.token_uri, iat, exp: iat + TOKEN_LIFETIME_SECS };
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch_access_token(&self, scope: &str) -> Result<String, CredentialError> {
        let assertion = self.sign_assertion(scope)?;
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status, error = %message, "Service account token exchange rejected");
            return Err(CredentialError::Exchange { status, message });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccount {
    async fn authorize(&self, scope: &str) -> Result<Arc<dyn Transport>, CredentialError> {
        let access_token = self.fetch_access_token(scope).await?;
        Ok(Arc::new(ReqwestTransport::from_client(self.http.clone()).with_bearer(access_token)))
    }

    fn project_id(&self) -> Result<String, CredentialError> {
        self.project_id.clone().ok_or(CredentialError::MissingField("project_id"))
    }
}

/// An access token obtained elsewhere, used as-is.
#[derive(Clone)]
pub struct StaticToken {
    project_id: String,
    access_token: String,
    http: reqwest::Client,
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken")
            .field("project_id", &self.project_id)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl StaticToken {
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self { project_id: project_id.into(), access_token: access_token.into(), http: reqwest::Client::new() }
    }

    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn authorize(&self, _scope: &str) -> Result<Arc<dyn Transport>, CredentialError> {
        Ok(Arc::new(ReqwestTransport::from_client(self.http.clone()).with_bearer(self.access_token.clone())))
    }

    fn project_id(&self) -> Result<String, CredentialError> {
        if self.project_id.is_empty() {
            return Err(CredentialError::MissingField("project_id"));
        }
        Ok(self.project_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::transport::{HttpRequest, Method};
    use jsonwebtoken::{DecodingKey, Validation, decode};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FIXTURE: &str = include_str!("../../tests/fixtures/service_account.json");
    const PUBLIC_KEY: &str = include_str!("../../tests/fixtures/service_account.pub.pem");

    fn fixture_with(overrides: &Value) -> String {
        let mut material: Value = serde_json::from_str(FIXTURE).unwrap();
        for (key, value) in overrides.as_object().unwrap() {
            if value.is_null() {
                material.as_object_mut().unwrap().remove(key);
            } else {
                material[key] = value.clone();
            }
        }
        material.to_string()
    }

    #[test]
    fn test_loads_service_account() {
        let account = ServiceAccount::from_json(FIXTURE).unwrap();
        assert_eq!(account.project_id().unwrap(), "demo-project");
        assert_eq!(account.client_email().unwrap(), "fcm-sender@demo-project.iam.gserviceaccount.com");
    }

    #[test]
    fn test_rejects_other_credential_types() {
        let err = ServiceAccount::from_json(&fixture_with(&json!({"type": "authorized_user"}))).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidMaterial(_)));
        assert!(err.is_configuration());

        let err = ServiceAccount::from_json(&fixture_with(&json!({"type": null}))).unwrap_err();
        assert!(matches!(err, CredentialError::MissingField("type")));

        assert!(matches!(ServiceAccount::from_json("not json"), Err(CredentialError::Json(_))));
    }

    #[test]
    fn test_missing_project_id_is_reported_lazily() {
        let account = ServiceAccount::from_json(&fixture_with(&json!({"project_id": null}))).unwrap();
        let err = account.project_id().unwrap_err();
        assert!(matches!(err, CredentialError::MissingField("project_id")));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let account = ServiceAccount::from_json(FIXTURE).unwrap();
        let debug = format!("{account:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn test_custom_token_is_signed_for_identity_toolkit() {
        let account = ServiceAccount::from_json(FIXTURE).unwrap();
        let mut claims = Map::new();
        claims.insert("premium".into(), json!(true));
        let token = account.encode_custom_token("user-1", Some(&claims)).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[CUSTOM_TOKEN_AUDIENCE]);
        let decoded =
            decode::<Value>(&token, &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(), &validation).unwrap();

        assert_eq!(decoded.claims["uid"], "user-1");
        assert_eq!(decoded.claims["iss"], "fcm-sender@demo-project.iam.gserviceaccount.com");
        assert_eq!(decoded.claims["claims"]["premium"], true);
        let lifetime = decoded.claims["exp"].as_i64().unwrap() - decoded.claims["iat"].as_i64().unwrap();
        assert_eq!(lifetime, TOKEN_LIFETIME_SECS);
    }

    #[test]
    fn test_custom_token_requires_private_key() {
        let account = ServiceAccount::from_json(&fixture_with(&json!({"private_key": null}))).unwrap();
        let err = account.encode_custom_token("uid", None).unwrap_err();
        assert!(matches!(err, CredentialError::MissingField("private_key")));
    }

    #[tokio::test]
    async fn test_authorize_exchanges_assertion_for_bearer_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .and(body_string_contains("assertion="))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "ya29.test", "expires_in": 3599, "token_type": "Bearer"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer ya29.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let material = fixture_with(&json!({"token_uri": format!("{}/token", server.uri())}));
        let account = ServiceAccount::from_json(&material).unwrap();
        let transport = account.authorize(FCM_SCOPE).await.unwrap();

        let reply = transport
            .request(HttpRequest {
                method: Method::Post,
                url: format!("{}/send", server.uri()),
                headers: vec![],
                body: Some(json!({})),
            })
            .await
            .unwrap();
        assert_eq!(reply.status, 200);
    }

    #[tokio::test]
    async fn test_authorize_surfaces_rejected_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let material = fixture_with(&json!({"token_uri": format!("{}/token", server.uri())}));
        let account = ServiceAccount::from_json(&material).unwrap();
        let err = account.authorize(FCM_SCOPE).await.unwrap_err();

        assert!(matches!(err, CredentialError::Exchange { status: 400, ref message } if message == "invalid_grant"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_static_token_requires_project_id() {
        assert!(StaticToken::new("", "t").project_id().is_err());
        assert_eq!(StaticToken::new("p", "t").project_id().unwrap(), "p");
    }
}
