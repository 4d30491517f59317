use super::decode_body;
use crate::adapters::transport::RawReply;
use crate::domain::ResponseFamily;
use crate::domain::error_code::{ErrorCode, category};
use crate::error::Result;
use serde_json::{Map, Value};

const ENTITY_NOT_FOUND: &str = "Requested entity was not found.";

pub(super) enum Validation {
    Parsable(Map<String, Value>),
    Rejected { code: ErrorCode, info: String },
}

/// Status gate applied before any parsing.
pub(super) fn validate(family: ResponseFamily, reply: &RawReply) -> Result<Validation> {
    let status = reply.status;
    if status == 200 {
        return decode_body(reply).map(Validation::Parsable);
    }
    if status == 404
        && family == ResponseFamily::V1Token
        && let Some(body) = entity_not_found(reply)
    {
        return Ok(Validation::Parsable(body));
    }

    let info = reply.body_text().into_owned();
    let code = match status {
        400 => {
            tracing::error!(
                category = category::HTTP_CLIENT_ERROR,
                status,
                family = ?family,
                body = %info,
                "FCM rejected the request data, check that all data values are strings"
            );
            ErrorCode::StatusCode400
        }
        401 | 403 => {
            tracing::error!(
                category = category::HTTP_CLIENT_ERROR,
                status,
                family = ?family,
                "FCM refused the credentials, check the server key or that the FCM API is enabled for the project"
            );
            ErrorCode::StatusCode403
        }
        _ => {
            tracing::error!(
                category = category::HTTP_CLIENT_OTHER_ERRORS,
                status,
                family = ?family,
                body = %info,
                "Unexpected status from FCM"
            );
            ErrorCode::OtherStatusCodes
        }
    };
    Ok(Validation::Rejected { code, info })
}

fn entity_not_found(reply: &RawReply) -> Option<Map<String, Value>> {
    let Ok(Value::Object(body)) = serde_json::from_slice::<Value>(&reply.body) else {
        return None;
    };
    let message = body.get("error").and_then(|e| e.get("message")).and_then(Value::as_str);
    (message == Some(ENTITY_NOT_FOUND)).then_some(body)
}
