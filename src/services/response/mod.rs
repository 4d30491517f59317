//! Reply classification.
//!
//! [`handle`] validates the transport reply, then dispatches to the parser of the
//! operation's [`ResponseFamily`]. Parsing is a pure function of the reply body and the
//! submitted-token context, so the same input always yields the same outcome.

pub mod legacy;
pub mod topic;
pub mod v1;
mod validate;

use crate::adapters::transport::RawReply;
use crate::domain::error_code::{ErrorCode, category, error_message};
use crate::domain::{ResponseFamily, SendOutcome, SubmittedTokens};
use crate::error::{FcmError, Result};
use serde_json::{Map, Value};
use validate::Validation;

const RETRY_AFTER: &str = "Retry-After";

/// Classifies one reply. `None` stands for a total transport failure.
///
/// # Errors
/// Returns `FcmError::InvalidResponse` if a parsable reply does not carry a JSON object.
pub fn handle(family: ResponseFamily, reply: Option<&RawReply>, submitted: &SubmittedTokens) -> Result<SendOutcome> {
    let Some(reply) = reply else {
        tracing::error!(category = category::HTTP_CLIENT, family = ?family, "No reply received from FCM");
        return Ok(SendOutcome::new(family));
    };

    match validate::validate(family, reply)? {
        Validation::Parsable(body) => Ok(parse(family, &body, submitted)),
        Validation::Rejected { code, info } => {
            let mut outcome = SendOutcome::new(family);
            outcome.error_description = Some(error_message(code.as_str(), &info));
            if family.is_legacy() && code == ErrorCode::OtherStatusCodes {
                outcome.retry_after = reply.header(RETRY_AFTER).map(str::to_string);
            }
            Ok(outcome)
        }
    }
}

/// Parser factory: one function per reply family.
#[must_use]
pub fn parse(family: ResponseFamily, body: &Map<String, Value>, submitted: &SubmittedTokens) -> SendOutcome {
    match family {
        ResponseFamily::LegacyToken => legacy::parse_token_reply(body, submitted),
        ResponseFamily::LegacyTopic => legacy::parse_topic_reply(body),
        ResponseFamily::LegacyGroup => legacy::parse_group_reply(body),
        ResponseFamily::LegacyGroupManagement => legacy::parse_group_management_reply(body),
        ResponseFamily::V1Token => v1::parse_token_reply(body, submitted),
        ResponseFamily::TopicSubscription => topic::parse_subscription_reply(body, submitted),
    }
}

pub(crate) fn decode_body(reply: &RawReply) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(&reply.body) {
        Ok(Value::Object(body)) => Ok(body),
        _ => {
            let text = reply.body_text().into_owned();
            tracing::error!(
                category = category::INVALID_FCM_RESPONSE,
                status = reply.status,
                body = %text,
                "Response from FCM is not valid"
            );
            Err(FcmError::InvalidResponse { status: reply.status, body: text })
        }
    }
}

/// Strings verbatim, everything else in its JSON rendering.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reply counters; numeric strings are accepted and anything else counts as zero.
pub(crate) fn count(body: &Map<String, Value>, key: &str) -> u64 {
    match body.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}
