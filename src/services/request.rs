use crate::adapters::credentials::{CredentialProvider, FCM_SCOPE};
use crate::adapters::transport::{HttpRequest, Method, RawReply, ReqwestTransport, Transport, TransportError};
use crate::domain::error_code::category;
use crate::domain::{
    ApiVersion, DeviceGroupOperation, Notification, Operation, Platform, Priority, Reason, SendOutcome,
    SubmittedTokens, Target,
};
use crate::error::{FcmError, Result};
use crate::services::payload::{Payload, PayloadBuilder};
use crate::services::response;
use opentelemetry::{KeyValue, global, metrics::Counter};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const LEGACY_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";
pub const V1_PROJECTS_URL: &str = "https://fcm.googleapis.com/v1/projects";
pub const TOPIC_SUBSCRIBE_URL: &str = "https://iid.googleapis.com/iid/v1:batchAdd";
pub const TOPIC_UNSUBSCRIBE_URL: &str = "https://iid.googleapis.com/iid/v1:batchRemove";
pub const GROUP_MANAGEMENT_URL: &str = "https://fcm.googleapis.com/fcm/notification";

#[derive(Clone, Debug)]
struct Metrics {
    requests_total: Counter<u64>,
    tokens_invalidated_total: Counter<u64>,
    tokens_retry_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("fcm-dispatch");
        Self {
            requests_total: meter
                .u64_counter("fcm_requests_total")
                .with_description("Total FCM requests by reason and outcome")
                .build(),
            tokens_invalidated_total: meter
                .u64_counter("fcm_tokens_invalidated_total")
                .with_description("Tokens FCM reported as no longer valid")
                .build(),
            tokens_retry_total: meter
                .u64_counter("fcm_tokens_retry_total")
                .with_description("Tokens FCM asked to retry later")
                .build(),
        }
    }

    fn record(&self, reason: Reason, outcome: &SendOutcome) {
        let status = if outcome.is_result_ok() { "ok" } else { "error" };
        self.requests_total.add(1, &[KeyValue::new("reason", reason.as_str()), KeyValue::new("status", status)]);
        let invalidated = outcome.tokens_to_delete().len() as u64;
        if invalidated > 0 {
            self.tokens_invalidated_total.add(invalidated, &[]);
        }
        let retry = outcome.tokens_to_retry().len() as u64;
        if retry > 0 {
            self.tokens_retry_total.add(retry, &[]);
        }
    }
}

/// Provider URLs. Defaults point at the public Google endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub legacy_send: String,
    /// Prefix of `<v1_projects>/<project id>/messages:send`.
    pub v1_projects: String,
    pub topic_subscribe: String,
    pub topic_unsubscribe: String,
    pub group_management: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            legacy_send: LEGACY_SEND_URL.into(),
            v1_projects: V1_PROJECTS_URL.into(),
            topic_subscribe: TOPIC_SUBSCRIBE_URL.into(),
            topic_unsubscribe: TOPIC_UNSUBSCRIBE_URL.into(),
            group_management: GROUP_MANAGEMENT_URL.into(),
        }
    }
}

impl Endpoints {
    /// All endpoints under one base URL, keeping the provider paths.
    #[must_use]
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            legacy_send: format!("{base}/fcm/send"),
            v1_projects: format!("{base}/v1/projects"),
            topic_subscribe: format!("{base}/iid/v1:batchAdd"),
            topic_unsubscribe: format!("{base}/iid/v1:batchRemove"),
            group_management: format!("{base}/fcm/notification"),
        }
    }

    #[must_use]
    pub fn v1_send(&self, project_id: &str) -> String {
        format!("{}/{project_id}/messages:send", self.v1_projects)
    }
}

/// What a client authenticates with; also decides the API version.
#[derive(Clone)]
pub enum ConnectionParams {
    Legacy { server_key: String, sender_id: String },
    V1 { credentials: Arc<dyn CredentialProvider> },
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy { sender_id, .. } => f
                .debug_struct("Legacy")
                .field("server_key", &"[REDACTED]")
                .field("sender_id", sender_id)
                .finish(),
            Self::V1 { credentials } => f.debug_struct("V1").field("credentials", credentials).finish(),
        }
    }
}

impl ConnectionParams {
    #[must_use]
    pub const fn api_version(&self) -> ApiVersion {
        match self {
            Self::Legacy { .. } => ApiVersion::Legacy,
            Self::V1 { .. } => ApiVersion::V1,
        }
    }
}

#[derive(Clone)]
enum RequestAuth {
    ServerKey { server_key: String, sender_id: String },
    OAuth { project_id: String },
}

impl fmt::Debug for RequestAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerKey { sender_id, .. } => {
                f.debug_struct("ServerKey").field("sender_id", sender_id).finish_non_exhaustive()
            }
            Self::OAuth { project_id } => f.debug_struct("OAuth").field("project_id", project_id).finish(),
        }
    }
}

/// Request factory: resolves the operation for a reason and hands out ready-to-configure requests.
///
/// One client may serve any number of concurrent requests; each request owns its own
/// builder and token context.
#[derive(Clone, Debug)]
pub struct FcmClient {
    params: ConnectionParams,
    endpoints: Endpoints,
    transport: Option<Arc<dyn Transport>>,
    metrics: Metrics,
}

impl FcmClient {
    /// # Errors
    /// Returns `FcmError::Configuration` if the legacy server key or sender id is empty, or
    /// the HTTP client cannot be built.
    pub fn new(params: ConnectionParams, timeout: Duration) -> Result<Self> {
        let transport: Option<Arc<dyn Transport>> = match &params {
            ConnectionParams::Legacy { server_key, sender_id } => {
                if server_key.is_empty() || sender_id.is_empty() {
                    return Err(FcmError::Configuration(
                        "the legacy api requires both a server key and a sender id".into(),
                    ));
                }
                let transport = ReqwestTransport::new(timeout)
                    .map_err(|e| FcmError::Configuration(format!("failed to build http client: {e}")))?;
                Some(Arc::new(transport))
            }
            ConnectionParams::V1 { .. } => None,
        };
        Ok(Self { params, endpoints: Endpoints::default(), transport, metrics: Metrics::new() })
    }

    /// Replaces the transport for every request. For v1 this skips the credential exchange;
    /// the project id is still read from the credentials.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub const fn api_version(&self) -> ApiVersion {
        self.params.api_version()
    }

    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Builds a request for `reason`.
    ///
    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` if the API version does not serve `reason`,
    /// `FcmError::Configuration` for incomplete credentials, or `FcmError::Credentials` if the
    /// token exchange fails.
    #[tracing::instrument(err(level = "warn"), skip(self), fields(api_version = %self.api_version()))]
    pub async fn request(&self, reason: Reason) -> Result<Request> {
        let operation = Operation::resolve(self.api_version(), reason)?;

        let (transport, auth) = match &self.params {
            ConnectionParams::Legacy { server_key, sender_id } => {
                let transport = self
                    .transport
                    .clone()
                    .ok_or_else(|| FcmError::Configuration("no transport configured".into()))?;
                (transport, RequestAuth::ServerKey { server_key: server_key.clone(), sender_id: sender_id.clone() })
            }
            ConnectionParams::V1 { credentials } => {
                let project_id = credentials.project_id()?;
                let transport = match &self.transport {
                    Some(transport) => Arc::clone(transport),
                    None => credentials.authorize(FCM_SCOPE).await?,
                };
                (transport, RequestAuth::OAuth { project_id })
            }
        };

        Ok(Request {
            operation,
            builder: PayloadBuilder::for_operation(operation),
            transport,
            auth,
            endpoints: self.endpoints.clone(),
            metrics: self.metrics.clone(),
        })
    }
}

/// One operation against FCM. Setters validate eagerly and return the request for chaining.
#[derive(Debug)]
pub struct Request {
    operation: Operation,
    builder: PayloadBuilder,
    transport: Arc<dyn Transport>,
    auth: RequestAuth,
    endpoints: Endpoints,
    metrics: Metrics,
}

impl Request {
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub const fn builder(&self) -> &PayloadBuilder {
        &self.builder
    }

    /// # Errors
    /// Returns `FcmError::InvalidTarget` if the API version cannot address `target`.
    pub fn target(mut self, target: Target) -> Result<Self> {
        self.builder.set_target(target)?;
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::InvalidOption` unless `data` is an object of string values.
    pub fn data(mut self, data: &Value) -> Result<Self> {
        self.builder.message_mut("message data")?.set_data(data)?;
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` on requests that carry no message.
    pub fn notification(mut self, title: impl Into<String>, body: impl Into<String>) -> Result<Self> {
        self.builder.message_mut("a notification")?.notification = Some(Notification::new(title, body));
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::InvalidPlatformOption` if the config is rejected.
    pub fn android_config(self, config: &Value) -> Result<Self> {
        self.platform_config(Platform::Android, config)
    }

    /// # Errors
    /// Returns `FcmError::InvalidPlatformOption` if the config is rejected.
    pub fn apns_config(self, config: &Value) -> Result<Self> {
        self.platform_config(Platform::Apns, config)
    }

    /// # Errors
    /// Returns `FcmError::InvalidPlatformOption` if the config is rejected.
    pub fn webpush_config(self, config: &Value) -> Result<Self> {
        self.platform_config(Platform::WebPush, config)
    }

    fn platform_config(mut self, platform: Platform, config: &Value) -> Result<Self> {
        self.builder.set_platform_config(platform, config)?;
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` outside legacy message requests.
    pub fn collapse_key(mut self, collapse_key: impl Into<String>) -> Result<Self> {
        self.builder.legacy_options_mut("a collapse key")?.collapse_key = Some(collapse_key.into());
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` outside legacy message requests.
    pub fn priority(mut self, priority: Priority) -> Result<Self> {
        self.builder.legacy_options_mut("a priority")?.priority = Some(priority);
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` outside legacy message requests.
    pub fn content_available(mut self, content_available: bool) -> Result<Self> {
        self.builder.legacy_options_mut("content_available")?.content_available = content_available;
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` outside legacy message requests.
    pub fn mutable_content(mut self, mutable_content: bool) -> Result<Self> {
        self.builder.legacy_options_mut("mutable_content")?.mutable_content = mutable_content;
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::InvalidOption` above four weeks, or `FcmError::UnsupportedOperation`
    /// outside legacy message requests.
    pub fn time_to_live(mut self, secs: u32) -> Result<Self> {
        self.builder.legacy_options_mut("a time to live")?.set_time_to_live(secs)?;
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` outside legacy message requests.
    pub fn restricted_package_name(mut self, package: impl Into<String>) -> Result<Self> {
        self.builder.legacy_options_mut("a restricted package name")?.restricted_package_name = Some(package.into());
        Ok(self)
    }

    /// `dry_run` on the legacy API, `validate_only` on v1.
    ///
    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` on requests that carry no message.
    pub fn validate_only(mut self, validate_only: bool) -> Result<Self> {
        self.builder.message_mut("validate_only")?.dry_run = validate_only;
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::InvalidTarget` for a malformed topic or token list.
    pub fn subscribe_to_topic(self, topic: &str, tokens: Vec<String>) -> Result<Self> {
        self.topic_subscription(topic, tokens, true)
    }

    /// # Errors
    /// Returns `FcmError::InvalidTarget` for a malformed topic or token list.
    pub fn unsubscribe_from_topic(self, topic: &str, tokens: Vec<String>) -> Result<Self> {
        self.topic_subscription(topic, tokens, false)
    }

    fn topic_subscription(mut self, topic: &str, tokens: Vec<String>, subscribe: bool) -> Result<Self> {
        self.builder.topic_subscription_mut()?.configure(topic, tokens, subscribe)?;
        Ok(self)
    }

    /// # Errors
    /// Returns `FcmError::InvalidTarget` for an invalid token list.
    pub fn create_group(self, group_name: impl Into<String>, tokens: Vec<String>) -> Result<Self> {
        self.group_operation(DeviceGroupOperation::create(group_name, tokens)?)
    }

    /// # Errors
    /// Returns `FcmError::InvalidOption` without a notification key, or
    /// `FcmError::InvalidTarget` for an invalid token list.
    pub fn add_to_group(
        self,
        group_name: impl Into<String>,
        notification_key: impl Into<String>,
        tokens: Vec<String>,
    ) -> Result<Self> {
        self.group_operation(DeviceGroupOperation::add(group_name, notification_key, tokens)?)
    }

    /// # Errors
    /// Returns `FcmError::InvalidOption` without a notification key, or
    /// `FcmError::InvalidTarget` for an invalid token list.
    pub fn remove_from_group(
        self,
        group_name: impl Into<String>,
        notification_key: impl Into<String>,
        tokens: Vec<String>,
    ) -> Result<Self> {
        self.group_operation(DeviceGroupOperation::remove(group_name, notification_key, tokens)?)
    }

    /// Prepares a lookup of the key registered under `group_name`; issue it with [`Request::send_get`].
    ///
    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` outside group management requests.
    pub fn notification_key(self, group_name: impl Into<String>) -> Result<Self> {
        self.group_operation(DeviceGroupOperation::lookup(group_name))
    }

    fn group_operation(mut self, operation: DeviceGroupOperation) -> Result<Self> {
        self.builder.group_management_mut()?.set_operation(operation);
        Ok(self)
    }

    /// URL selected by the request reason.
    ///
    /// # Errors
    /// Returns `FcmError::MissingTarget` for topic management before the direction is known.
    pub fn url(&self) -> Result<String> {
        match self.operation.reason() {
            Reason::TopicManagement => {
                match self.builder.topic_subscription().and_then(|builder| builder.subscribe()) {
                    Some(true) => Ok(self.endpoints.topic_subscribe.clone()),
                    Some(false) => Ok(self.endpoints.topic_unsubscribe.clone()),
                    None => Err(FcmError::MissingTarget),
                }
            }
            Reason::GroupManagement => Ok(self.endpoints.group_management.clone()),
            Reason::TokenSending | Reason::TopicSending | Reason::GroupSending => match &self.auth {
                RequestAuth::ServerKey { .. } => Ok(self.endpoints.legacy_send.clone()),
                RequestAuth::OAuth { project_id } => Ok(self.endpoints.v1_send(project_id)),
            },
        }
    }

    /// Headers sent with every call of this request. The v1 bearer token is added by the transport.
    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        match &self.auth {
            RequestAuth::ServerKey { server_key, sender_id } => {
                headers.push(("Authorization".into(), format!("key={server_key}")));
                headers.push(("project_id".into(), sender_id.clone()));
            }
            RequestAuth::OAuth { .. } => {
                if self.operation.reason() == Reason::TopicManagement {
                    headers.push(("access_token_auth".into(), "true".into()));
                }
            }
        }
        headers
    }

    /// Renders the body without sending it.
    ///
    /// # Errors
    /// Returns `FcmError::MissingTarget` if the request is incomplete.
    pub fn payload(&self) -> Result<Payload> {
        self.builder.build()
    }

    /// POSTs the request and classifies the reply.
    ///
    /// Error statuses are still classified, and a missing reply yields an outcome that is
    /// not ok; neither is returned as `Err`.
    ///
    /// # Errors
    /// Returns a validation error if the request is incomplete, or `FcmError::InvalidResponse`
    /// if a parsable reply is not a JSON object.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self),
        fields(api_version = %self.operation.api_version(), reason = %self.operation.reason())
    )]
    pub async fn send(&self) -> Result<SendOutcome> {
        if let Some(group) = self.builder.group_management()
            && group.operation().is_some_and(|op| op.operation.is_none())
        {
            return Err(FcmError::UnsupportedOperation("notification key lookups are sent with send_get".into()));
        }

        let Payload { body, submitted } = self.builder.build()?;
        let request = HttpRequest { method: Method::Post, url: self.url()?, headers: self.headers(), body: Some(body) };
        self.dispatch(request, &submitted).await
    }

    /// GETs the notification key of the group named by [`Request::notification_key`].
    ///
    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` outside legacy group management,
    /// `FcmError::MissingTarget` when no group name was set, or `FcmError::Configuration`
    /// when the group management endpoint is not a valid URL.
    #[tracing::instrument(err(level = "warn"), skip(self), fields(api_version = %self.operation.api_version()))]
    pub async fn send_get(&self) -> Result<SendOutcome> {
        if self.operation != Operation::LegacyGroupManagement {
            return Err(FcmError::UnsupportedOperation(
                "GET requests only serve legacy notification key lookups".into(),
            ));
        }
        let group_name = self
            .builder
            .group_management()
            .and_then(|group| group.operation())
            .and_then(|op| op.notification_key_name.as_deref())
            .ok_or(FcmError::MissingTarget)?;

        let url =
            reqwest::Url::parse_with_params(&self.endpoints.group_management, &[("notification_key_name", group_name)])
                .map_err(|e| FcmError::Configuration(format!("invalid group management url: {e}")))?;
        let request = HttpRequest { method: Method::Get, url: url.into(), headers: self.headers(), body: None };
        self.dispatch(request, &SubmittedTokens::default()).await
    }

    async fn dispatch(&self, request: HttpRequest, submitted: &SubmittedTokens) -> Result<SendOutcome> {
        let reply: Option<RawReply> = match self.transport.request(request).await {
            Ok(reply) => Some(reply),
            Err(TransportError::Client(reply)) => {
                tracing::debug!(status = reply.status, "FCM replied with an error status");
                Some(reply)
            }
            Err(TransportError::Failed(e)) => {
                tracing::error!(category = category::HTTP_CLIENT, error = %e, "Request to FCM failed");
                None
            }
        };

        let outcome = response::handle(self.operation.response_family(), reply.as_ref(), submitted)?;
        self.metrics.record(self.operation.reason(), &outcome);
        tracing::debug!(result_ok = outcome.is_result_ok(), message_id = ?outcome.message_id(), "FCM reply classified");
        Ok(outcome)
    }
}
