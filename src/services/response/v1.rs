use super::value_to_string;
use crate::domain::error_code::{ErrorCode, error_message};
use crate::domain::outcome::{ApiErrorBody, OutcomeDetail, V1SendResult};
use crate::domain::{ResponseFamily, SendOutcome, SubmittedTokens};
use serde_json::{Map, Value};

/// Reply of `messages:send`: either `{"name": ...}` or `{"error": {...}}`.
#[must_use]
pub fn parse_token_reply(body: &Map<String, Value>, submitted: &SubmittedTokens) -> SendOutcome {
    let mut outcome = SendOutcome::new(ResponseFamily::V1Token);
    let mut single = V1SendResult::default();

    if let Some(Value::Object(error)) = body.get("error") {
        let api_error = ApiErrorBody {
            status: error.get("status").map(value_to_string),
            code: error.get("code").and_then(Value::as_i64),
            message: error.get("message").map(value_to_string),
            details: error.get("details").and_then(Value::as_array).cloned().unwrap_or_default(),
        };

        let unregistered = ErrorCode::Unregistered.as_str();
        let detail_code = detail_error_code(&api_error.details);
        if api_error.status.as_deref() == Some(unregistered) || detail_code == Some(unregistered) {
            match submitted.get(0) {
                Some(token) => single.to_delete.push(token.to_string()),
                None => tracing::warn!("Unregistered reply for a send with no submitted token"),
            }
        }

        let status = api_error.status.as_deref().unwrap_or(ErrorCode::UnspecifiedError.as_str());
        outcome.error_description = Some(error_message(status, ""));
        single.error = Some(api_error);
    }

    if let Some(name) = body.get("name") {
        let raw = value_to_string(name);
        outcome.message_id = raw.rsplit('/').next().map(str::to_string);
        outcome.result_ok = true;
        single.raw_message_id = Some(raw);
    }

    outcome.detail = OutcomeDetail::V1Token(single);
    outcome
}

/// The first `errorCode` found among the error details.
fn detail_error_code(details: &[Value]) -> Option<&str> {
    details.iter().find_map(|detail| detail.get("errorCode")).and_then(Value::as_str)
}
