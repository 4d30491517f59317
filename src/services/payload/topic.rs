use super::Payload;
use crate::domain::SubmittedTokens;
use crate::domain::target::{TOPICS_PATH, normalize_topic, validate_tokens};
use crate::error::{FcmError, Result};
use serde_json::json;

/// Body builder for the instance-id batch (un)subscription endpoints.
///
/// The body is identical for both directions; `subscribe` only picks the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSubscriptionBuilder {
    topic: Option<String>,
    tokens: Vec<String>,
    subscribe: Option<bool>,
}

impl TopicSubscriptionBuilder {
    /// # Errors
    /// Returns `FcmError::InvalidTarget` for malformed topics or token lists.
    pub fn configure(&mut self, topic: &str, tokens: Vec<String>, subscribe: bool) -> Result<()> {
        let topic = normalize_topic(topic)?;
        validate_tokens(&tokens)?;
        self.topic = Some(topic);
        self.tokens = tokens;
        self.subscribe = Some(subscribe);
        Ok(())
    }

    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// `Some(true)` to subscribe, `Some(false)` to unsubscribe, `None` until configured.
    #[must_use]
    pub const fn subscribe(&self) -> Option<bool> {
        self.subscribe
    }

    /// # Errors
    /// Returns `FcmError::MissingTarget` until a topic and its tokens were configured.
    pub fn build(&self) -> Result<Payload> {
        let topic = self.topic.as_deref().ok_or(FcmError::MissingTarget)?;
        validate_tokens(&self.tokens)?;
        Ok(Payload {
            body: json!({
                "to": format!("{TOPICS_PATH}{topic}"),
                "registration_tokens": self.tokens,
            }),
            submitted: SubmittedTokens::from(self.tokens.clone()),
        })
    }
}
