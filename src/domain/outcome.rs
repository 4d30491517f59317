use crate::domain::api::ResponseFamily;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

static NO_MODIFICATIONS: BTreeMap<String, String> = BTreeMap::new();

/// Tokens a send was issued against, in submission order.
///
/// Providers report per-token results by array position only, so the reply
/// parser maps result `i` back to `get(i)`. The context is produced by the
/// payload builder and handed to the parser for the same call; it is never
/// shared between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubmittedTokens(Vec<String>);

impl SubmittedTokens {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for SubmittedTokens {
    fn from(tokens: Vec<String>) -> Self {
        Self(tokens)
    }
}

/// Verdict for one element of a positional results array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "bucket", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    /// Delivered, but the provider issued a replacement token.
    Modify { canonical_token: String },
    Delete,
    Retry,
    MissingToken,
    Error { code: String },
}

impl DeliveryOutcome {
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Sent | Self::Modify { .. })
    }
}

/// Legacy multicast reply.
///
/// `outcomes` is the per-result record and always has one entry per element of `results`.
/// The token-keyed maps keep only the last entry when a token was submitted twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkSendResult {
    pub multicast_id: Option<String>,
    pub success_count: u64,
    pub failure_count: u64,
    pub modification_count: u64,
    /// One entry per element of the reply's `results`, in reply order.
    pub outcomes: Vec<DeliveryOutcome>,
    pub to_delete: Vec<String>,
    /// Old token to canonical replacement.
    pub to_modify: BTreeMap<String, String>,
    pub to_retry: Vec<String>,
    /// Token to raw provider error code.
    pub errors: BTreeMap<String, String>,
    pub has_missing_token: bool,
}

/// The `error` object of a v1 reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    pub status: Option<String>,
    pub code: Option<i64>,
    pub message: Option<String>,
    pub details: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct V1SendResult {
    /// Full `name` of the created message, `projects/<id>/messages/<message id>`.
    pub raw_message_id: Option<String>,
    pub error: Option<ApiErrorBody>,
    pub to_delete: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopicSendResult {
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupSendResult {
    pub success_count: u64,
    pub failure_count: u64,
    pub failed_tokens: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupManagementResult {
    pub notification_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenError {
    pub token: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopicSubscriptionResult {
    pub tokens_with_error: Vec<TokenError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum OutcomeDetail {
    LegacyToken(BulkSendResult),
    LegacyTopic(TopicSendResult),
    LegacyGroup(GroupSendResult),
    LegacyGroupManagement(GroupManagementResult),
    V1Token(V1SendResult),
    TopicSubscription(TopicSubscriptionResult),
}

impl OutcomeDetail {
    #[must_use]
    pub fn empty(family: ResponseFamily) -> Self {
        match family {
            ResponseFamily::LegacyToken => Self::LegacyToken(BulkSendResult::default()),
            ResponseFamily::LegacyTopic => Self::LegacyTopic(TopicSendResult::default()),
            ResponseFamily::LegacyGroup => Self::LegacyGroup(GroupSendResult::default()),
            ResponseFamily::LegacyGroupManagement => Self::LegacyGroupManagement(GroupManagementResult::default()),
            ResponseFamily::V1Token => Self::V1Token(V1SendResult::default()),
            ResponseFamily::TopicSubscription => Self::TopicSubscription(TopicSubscriptionResult::default()),
        }
    }

    #[must_use]
    pub const fn family(&self) -> ResponseFamily {
        match self {
            Self::LegacyToken(_) => ResponseFamily::LegacyToken,
            Self::LegacyTopic(_) => ResponseFamily::LegacyTopic,
            Self::LegacyGroup(_) => ResponseFamily::LegacyGroup,
            Self::LegacyGroupManagement(_) => ResponseFamily::LegacyGroupManagement,
            Self::V1Token(_) => ResponseFamily::V1Token,
            Self::TopicSubscription(_) => ResponseFamily::TopicSubscription,
        }
    }
}

/// Uniform result of one send. Ordinary delivery failures land here, never in `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub(crate) result_ok: bool,
    pub(crate) error_description: Option<String>,
    pub(crate) message_id: Option<String>,
    pub(crate) retry_after: Option<String>,
    pub(crate) detail: OutcomeDetail,
}

impl SendOutcome {
    #[must_use]
    pub fn new(family: ResponseFamily) -> Self {
        Self {
            result_ok: false,
            error_description: None,
            message_id: None,
            retry_after: None,
            detail: OutcomeDetail::empty(family),
        }
    }

    #[must_use]
    pub const fn is_result_ok(&self) -> bool {
        self.result_ok
    }

    #[must_use]
    pub fn error_description(&self) -> Option<&str> {
        self.error_description.as_deref()
    }

    /// Provider message id, or the multicast id for legacy multicast sends.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// `Retry-After` header of a rejected legacy reply.
    #[must_use]
    pub fn retry_after(&self) -> Option<&str> {
        self.retry_after.as_deref()
    }

    #[must_use]
    pub const fn detail(&self) -> &OutcomeDetail {
        &self.detail
    }

    #[must_use]
    pub const fn family(&self) -> ResponseFamily {
        self.detail.family()
    }

    #[must_use]
    pub fn tokens_to_delete(&self) -> &[String] {
        match &self.detail {
            OutcomeDetail::LegacyToken(bulk) => &bulk.to_delete,
            OutcomeDetail::V1Token(single) => &single.to_delete,
            _ => &[],
        }
    }

    #[must_use]
    pub fn tokens_to_modify(&self) -> &BTreeMap<String, String> {
        match &self.detail {
            OutcomeDetail::LegacyToken(bulk) => &bulk.to_modify,
            _ => &NO_MODIFICATIONS,
        }
    }

    #[must_use]
    pub fn tokens_to_retry(&self) -> &[String] {
        match &self.detail {
            OutcomeDetail::LegacyToken(bulk) => &bulk.to_retry,
            _ => &[],
        }
    }

    #[must_use]
    pub const fn has_missing_token(&self) -> bool {
        matches!(&self.detail, OutcomeDetail::LegacyToken(bulk) if bulk.has_missing_token)
    }

    #[must_use]
    pub const fn bulk(&self) -> Option<&BulkSendResult> {
        match &self.detail {
            OutcomeDetail::LegacyToken(bulk) => Some(bulk),
            _ => None,
        }
    }

    #[must_use]
    pub fn notification_key(&self) -> Option<&str> {
        match &self.detail {
            OutcomeDetail::LegacyGroupManagement(group) => group.notification_key.as_deref(),
            _ => None,
        }
    }
}
