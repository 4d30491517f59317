//! Wire-format body assembly for every supported operation.
//!
//! A builder accumulates validated input and renders it with [`PayloadBuilder::build`],
//! which also hands back the submitted-token context the reply parser correlates against.

pub mod group;
pub mod legacy;
pub mod topic;
pub mod v1;

pub use group::GroupManagementBuilder;
pub use legacy::LegacyMessageBuilder;
pub use topic::TopicSubscriptionBuilder;
pub use v1::V1MessageBuilder;

use crate::domain::{MessageOptions, Operation, Platform, SubmittedTokens, Target};
use crate::error::{FcmError, Result};
use serde_json::{Map, Value};

/// A rendered body plus the tokens it addresses, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub body: Value,
    pub submitted: SubmittedTokens,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadBuilder {
    LegacyMessage(LegacyMessageBuilder),
    V1Message(V1MessageBuilder),
    TopicSubscription(TopicSubscriptionBuilder),
    GroupManagement(GroupManagementBuilder),
}

impl PayloadBuilder {
    #[must_use]
    pub fn for_operation(operation: Operation) -> Self {
        match operation {
            Operation::LegacyToken | Operation::LegacyTopic | Operation::LegacyGroup => {
                Self::LegacyMessage(LegacyMessageBuilder::default())
            }
            Operation::V1Token => Self::V1Message(V1MessageBuilder::default()),
            Operation::TopicSubscription(_) => Self::TopicSubscription(TopicSubscriptionBuilder::default()),
            Operation::LegacyGroupManagement => Self::GroupManagement(GroupManagementBuilder::default()),
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::LegacyMessage(_) => "legacy message",
            Self::V1Message(_) => "v1 message",
            Self::TopicSubscription(_) => "topic subscription",
            Self::GroupManagement(_) => "group management",
        }
    }

    /// # Errors
    /// Returns `FcmError::InvalidTarget` if the API version cannot address the target, or
    /// `FcmError::UnsupportedOperation` for builders that take no message target.
    pub fn set_target(&mut self, target: Target) -> Result<()> {
        let name = self.name();
        match self {
            Self::LegacyMessage(builder) => {
                builder.set_target(target);
                Ok(())
            }
            Self::V1Message(builder) => builder.set_target(target),
            Self::TopicSubscription(_) | Self::GroupManagement(_) => Err(unsupported(name, "a message target")),
        }
    }

    /// Options shared by the legacy and v1 message builders.
    ///
    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` for non-message builders.
    pub fn message_mut(&mut self, what: &str) -> Result<&mut MessageOptions> {
        let name = self.name();
        match self {
            Self::LegacyMessage(builder) => Ok(builder.options_mut()),
            Self::V1Message(builder) => Ok(builder.options_mut()),
            Self::TopicSubscription(_) | Self::GroupManagement(_) => Err(unsupported(name, what)),
        }
    }

    /// Options only the legacy protocol carries (priority, collapse key, ttl...).
    ///
    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` unless this is a legacy message builder.
    pub fn legacy_options_mut(&mut self, what: &str) -> Result<&mut MessageOptions> {
        let name = self.name();
        match self {
            Self::LegacyMessage(builder) => Ok(builder.options_mut()),
            _ => Err(unsupported(name, what)),
        }
    }

    /// Legacy overrides are checked against the platform whitelist, v1 overrides are kept verbatim.
    ///
    /// # Errors
    /// Returns `FcmError::InvalidPlatformOption` for rejected configs, or
    /// `FcmError::UnsupportedOperation` for non-message builders.
    pub fn set_platform_config(&mut self, platform: Platform, config: &Value) -> Result<()> {
        let name = self.name();
        match self {
            Self::LegacyMessage(builder) => builder.options_mut().set_legacy_platform(platform, config),
            Self::V1Message(builder) => builder.options_mut().set_v1_platform(platform, config),
            _ => Err(unsupported(name, "a platform config")),
        }
    }

    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` unless this is a topic subscription builder.
    pub fn topic_subscription_mut(&mut self) -> Result<&mut TopicSubscriptionBuilder> {
        let name = self.name();
        match self {
            Self::TopicSubscription(builder) => Ok(builder),
            _ => Err(unsupported(name, "a topic subscription")),
        }
    }

    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` unless this is a group management builder.
    pub fn group_management_mut(&mut self) -> Result<&mut GroupManagementBuilder> {
        let name = self.name();
        match self {
            Self::GroupManagement(builder) => Ok(builder),
            _ => Err(unsupported(name, "a device group operation")),
        }
    }

    #[must_use]
    pub const fn topic_subscription(&self) -> Option<&TopicSubscriptionBuilder> {
        match self {
            Self::TopicSubscription(builder) => Some(builder),
            _ => None,
        }
    }

    #[must_use]
    pub const fn group_management(&self) -> Option<&GroupManagementBuilder> {
        match self {
            Self::GroupManagement(builder) => Some(builder),
            _ => None,
        }
    }

    /// # Errors
    /// Returns `FcmError::MissingTarget` (or another validation error) if the builder is incomplete.
    pub fn build(&self) -> Result<Payload> {
        match self {
            Self::LegacyMessage(builder) => builder.build(),
            Self::V1Message(builder) => builder.build(),
            Self::TopicSubscription(builder) => builder.build(),
            Self::GroupManagement(builder) => builder.build(),
        }
    }
}

fn unsupported(builder: &str, what: &str) -> FcmError {
    FcmError::UnsupportedOperation(format!("{what} cannot be set on a {builder} request"))
}

/// Empty strings, arrays, objects, `null` and `false` are left out of wire bodies.
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(true) | Value::Number(_) => false,
    }
}

pub(crate) fn insert_non_empty(body: &mut Map<String, Value>, key: &str, value: impl Into<Value>) {
    let value = value.into();
    if !is_empty_value(&value) {
        body.insert(key.to_string(), value);
    }
}
