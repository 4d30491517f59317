use super::{Payload, insert_non_empty};
use crate::domain::target::TOPICS_PATH;
use crate::domain::{MessageOptions, Platform, Target};
use crate::error::{FcmError, Result};
use serde_json::{Map, Value};

/// Body builder for `POST /fcm/send` (token, token list, topic, condition and group targets).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyMessageBuilder {
    target: Option<Target>,
    options: MessageOptions,
}

impl LegacyMessageBuilder {
    pub fn set_target(&mut self, target: Target) {
        self.target = Some(target);
    }

    #[must_use]
    pub const fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    #[must_use]
    pub const fn options(&self) -> &MessageOptions {
        &self.options
    }

    pub const fn options_mut(&mut self) -> &mut MessageOptions {
        &mut self.options
    }

    /// The first non-empty of the explicit notification and the android, apns and web push
    /// overrides, in that order. Later sources are ignored entirely, not merged.
    #[must_use]
    pub fn notification(&self) -> Option<Map<String, Value>> {
        let explicit = self.options.notification.as_ref().map(|n| n.to_json()).unwrap_or_default();
        std::iter::once(explicit)
            .chain([Platform::Android, Platform::Apns, Platform::WebPush].map(|p| self.options.platform(p).clone()))
            .find(|block| !block.is_empty())
    }

    /// # Errors
    /// Returns `FcmError::MissingTarget` if no target was set.
    pub fn build(&self) -> Result<Payload> {
        let target = self.target.as_ref().ok_or(FcmError::MissingTarget)?;
        let options = &self.options;
        let mut body = Map::new();

        match target {
            Target::Token(value) | Target::Group(value) => insert_non_empty(&mut body, "to", value.as_str()),
            Target::Topic(name) => insert_non_empty(&mut body, "to", format!("{TOPICS_PATH}{name}")),
            Target::Condition(condition) => insert_non_empty(&mut body, "condition", condition.as_str()),
            Target::Tokens(tokens) => insert_non_empty(&mut body, "registration_ids", tokens.clone()),
        }

        if let Some(notification) = self.notification() {
            body.insert("notification".into(), Value::Object(notification));
        }
        let data: Map<String, Value> =
            options.data.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
        insert_non_empty(&mut body, "data", data);
        insert_non_empty(&mut body, "priority", options.priority.map(|p| p.as_str()));
        insert_non_empty(&mut body, "collapse_key", options.collapse_key.clone());
        insert_non_empty(&mut body, "content_available", options.content_available);
        insert_non_empty(&mut body, "mutable_content", options.mutable_content);
        // Zero is a meaningful TTL ("now or never") and is sent like any other value.
        insert_non_empty(&mut body, "time_to_live", options.time_to_live);
        insert_non_empty(&mut body, "restricted_package_name", options.restricted_package_name.clone());
        insert_non_empty(&mut body, "dry_run", options.dry_run);

        Ok(Payload { body: Value::Object(body), submitted: target.submitted_tokens() })
    }
}
