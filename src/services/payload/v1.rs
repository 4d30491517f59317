use super::{Payload, insert_non_empty};
use crate::domain::{ApiVersion, MessageOptions, Platform, Target};
use crate::error::{FcmError, Result};
use serde_json::{Map, Value};

/// Body builder for `POST /v1/projects/<id>/messages:send`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct V1MessageBuilder {
    target: Option<Target>,
    options: MessageOptions,
}

impl V1MessageBuilder {
    /// # Errors
    /// Returns `FcmError::InvalidTarget` for token lists and device groups.
    pub fn set_target(&mut self, target: Target) -> Result<()> {
        target.ensure_supported_by(ApiVersion::V1)?;
        self.target = Some(target);
        Ok(())
    }

    #[must_use]
    pub const fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub const fn options_mut(&mut self) -> &mut MessageOptions {
        &mut self.options
    }

    /// # Errors
    /// Returns `FcmError::MissingTarget` if no target was set.
    pub fn build(&self) -> Result<Payload> {
        let target = self.target.as_ref().ok_or(FcmError::MissingTarget)?;
        target.ensure_supported_by(ApiVersion::V1)?;
        let options = &self.options;
        let mut message = Map::new();

        match target {
            Target::Token(token) => insert_non_empty(&mut message, "token", token.as_str()),
            Target::Topic(name) => insert_non_empty(&mut message, "topic", name.as_str()),
            Target::Condition(condition) => insert_non_empty(&mut message, "condition", condition.as_str()),
            Target::Tokens(_) | Target::Group(_) => {}
        }

        let data: Map<String, Value> =
            options.data.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
        insert_non_empty(&mut message, "data", data);
        insert_non_empty(&mut message, "notification", options.notification.as_ref().map(|n| n.to_json()));
        let platforms = [("android", Platform::Android), ("apns", Platform::Apns), ("webpush", Platform::WebPush)];
        for (key, platform) in platforms {
            insert_non_empty(&mut message, key, options.platform(platform).clone());
        }

        let mut body = Map::new();
        body.insert("validate_only".into(), Value::Bool(options.dry_run));
        body.insert("message".into(), Value::Object(message));
        Ok(Payload { body: Value::Object(body), submitted: target.submitted_tokens() })
    }
}
