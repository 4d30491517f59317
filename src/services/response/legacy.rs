use super::{count, value_to_string};
use crate::domain::error_code::{ErrorCode, category, error_message};
use crate::domain::outcome::{
    BulkSendResult, GroupManagementResult, GroupSendResult, OutcomeDetail, TopicSendResult,
};
use crate::domain::{DeliveryOutcome, ResponseFamily, SendOutcome, SubmittedTokens};
use serde_json::{Map, Value};

const NOT_REGISTERED: &str = "NotRegistered";
const INVALID_REGISTRATION: &str = "InvalidRegistration";
const UNAVAILABLE: &str = "Unavailable";
const DEVICE_MESSAGE_RATE_EXCEEDED: &str = "DeviceMessageRateExceeded";
const INTERNAL_SERVER_ERROR: &str = "InternalServerError";
const MISSING_REGISTRATION: &str = "MissingRegistration";

/// Classifies one element of a legacy `results` array.
///
/// Checks run in a fixed order and the first match wins: sent, modify, delete, retry,
/// missing token, generic error.
#[must_use]
pub fn classify_result(result: &Value) -> DeliveryOutcome {
    let Some(result) = result.as_object() else {
        return DeliveryOutcome::Error { code: ErrorCode::UnspecifiedError.as_str().to_string() };
    };

    if result.contains_key("message_id") {
        return match result.get("registration_id") {
            None => DeliveryOutcome::Sent,
            Some(canonical) => DeliveryOutcome::Modify { canonical_token: value_to_string(canonical) },
        };
    }

    match result.get("error").map(value_to_string).as_deref() {
        Some(NOT_REGISTERED | INVALID_REGISTRATION) => DeliveryOutcome::Delete,
        Some(UNAVAILABLE | DEVICE_MESSAGE_RATE_EXCEEDED | INTERNAL_SERVER_ERROR) => DeliveryOutcome::Retry,
        Some(MISSING_REGISTRATION) => DeliveryOutcome::MissingToken,
        Some(code) => DeliveryOutcome::Error { code: code.to_string() },
        None => DeliveryOutcome::Error { code: ErrorCode::UnspecifiedError.as_str().to_string() },
    }
}

/// Multicast reply of `POST /fcm/send` for token and token-list targets.
///
/// Element `i` of `results` belongs to `submitted.get(i)`; the provider never echoes tokens.
#[must_use]
pub fn parse_token_reply(body: &Map<String, Value>, submitted: &SubmittedTokens) -> SendOutcome {
    let mut outcome = SendOutcome::new(ResponseFamily::LegacyToken);
    let mut bulk = BulkSendResult {
        multicast_id: body.get("multicast_id").map(value_to_string),
        success_count: count(body, "success"),
        failure_count: count(body, "failure"),
        modification_count: count(body, "canonical_ids"),
        ..BulkSendResult::default()
    };
    outcome.message_id.clone_from(&bulk.multicast_id);

    let results = body.get("results");
    let needs_parsing = results.is_some() && (bulk.failure_count > 0 || bulk.modification_count > 0);

    if needs_parsing {
        if let Some(results) = results.and_then(Value::as_array) {
            for (index, result) in results.iter().enumerate() {
                if let Some(code) = result.get("error") {
                    outcome.error_description = Some(error_message(&value_to_string(code), ""));
                }
                let verdict = classify_result(result);
                record(&mut bulk, index, &verdict, submitted.get(index));
                bulk.outcomes.push(verdict);
            }
            reconcile(&bulk, results.len());
            outcome.result_ok = bulk.failure_count == 0 && bulk.outcomes.iter().all(DeliveryOutcome::is_delivered);
        } else {
            let raw = Value::Object(body.clone());
            tracing::error!(
                category = category::PARSE_ERROR,
                body = %raw,
                "Legacy reply carries a non-array results field"
            );
        }
    } else {
        let delivered = results.and_then(Value::as_array).map_or(0, Vec::len);
        bulk.outcomes = vec![DeliveryOutcome::Sent; delivered];
        outcome.result_ok = bulk.failure_count == 0;
    }

    outcome.detail = OutcomeDetail::LegacyToken(bulk);
    outcome
}

fn record(bulk: &mut BulkSendResult, index: usize, verdict: &DeliveryOutcome, token: Option<&str>) {
    if *verdict == DeliveryOutcome::Sent {
        return;
    }
    if *verdict == DeliveryOutcome::MissingToken {
        bulk.has_missing_token = true;
        return;
    }
    let Some(token) = token.map(str::to_string) else {
        tracing::warn!(index, "Reply result has no submitted token at its position");
        return;
    };
    match verdict {
        DeliveryOutcome::Modify { canonical_token } => {
            bulk.to_modify.insert(token, canonical_token.clone());
        }
        DeliveryOutcome::Delete => bulk.to_delete.push(token),
        DeliveryOutcome::Retry => bulk.to_retry.push(token),
        DeliveryOutcome::Error { code } => {
            bulk.errors.insert(token, code.clone());
        }
        DeliveryOutcome::Sent | DeliveryOutcome::MissingToken => {}
    }
}

fn reconcile(bulk: &BulkSendResult, results: usize) {
    let reported = bulk.success_count.checked_add(bulk.failure_count);
    if reported != Some(results as u64) {
        tracing::warn!(
            success = bulk.success_count,
            failure = bulk.failure_count,
            results,
            "Legacy reply counters do not match the number of results"
        );
    }
}

/// Reply of `POST /fcm/send` for topic and condition targets.
#[must_use]
pub fn parse_topic_reply(body: &Map<String, Value>) -> SendOutcome {
    let mut outcome = SendOutcome::new(ResponseFamily::LegacyTopic);
    let mut topic = TopicSendResult::default();

    if let Some(message_id) = body.get("message_id") {
        outcome.message_id = Some(value_to_string(message_id));
        outcome.result_ok = true;
    }
    if let Some(error) = body.get("error") {
        let error = value_to_string(error);
        outcome.error_description = Some(error_message(&error, ""));
        topic.error_message = Some(error);
    }

    outcome.detail = OutcomeDetail::LegacyTopic(topic);
    outcome
}

/// Reply of `POST /fcm/send` for device group targets.
#[must_use]
pub fn parse_group_reply(body: &Map<String, Value>) -> SendOutcome {
    let mut outcome = SendOutcome::new(ResponseFamily::LegacyGroup);
    let mut group = GroupSendResult {
        success_count: count(body, "success"),
        failure_count: count(body, "failure"),
        ..GroupSendResult::default()
    };

    if group.failure_count > 0 {
        if let Some(failed) = body.get("failed_registration_ids").and_then(Value::as_array) {
            group.failed_tokens = failed.iter().map(value_to_string).collect();
        }
    } else {
        outcome.result_ok = true;
    }

    outcome.detail = OutcomeDetail::LegacyGroup(group);
    outcome
}

/// Reply of the device group endpoint, for lifecycle operations and key lookups alike.
#[must_use]
pub fn parse_group_management_reply(body: &Map<String, Value>) -> SendOutcome {
    let mut outcome = SendOutcome::new(ResponseFamily::LegacyGroupManagement);
    let mut group = GroupManagementResult::default();

    if let Some(key) = body.get("notification_key") {
        group.notification_key = Some(value_to_string(key));
        outcome.result_ok = true;
    } else if let Some(error) = body.get("error") {
        outcome.error_description = Some(error_message(&value_to_string(error), ""));
    }

    outcome.detail = OutcomeDetail::LegacyGroupManagement(group);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn submitted(tokens: &[&str]) -> SubmittedTokens {
        SubmittedTokens::from(tokens.iter().map(ToString::to_string).collect::<Vec<_>>())
    }

    fn bucket_total(bulk: &BulkSendResult) -> usize {
        bulk.outcomes.len()
    }

    #[test]
    fn test_single_failure_queues_deletion() {
        let body = object(json!({
            "success": 1,
            "failure": 1,
            "results": [{"message_id": "1"}, {"error": "NotRegistered"}]
        }));
        let outcome = parse_token_reply(&body, &submitted(&["tokA", "tokB"]));

        assert_eq!(outcome.tokens_to_delete(), ["tokB"]);
        assert_eq!(outcome.bulk().unwrap().success_count, 1);
        assert!(!outcome.is_result_ok());
        assert_eq!(
            outcome.error_description(),
            Some("FcmError[NotRegistered]: ")
        );
    }

    #[test]
    fn test_every_bucket_is_reachable() {
        let body = object(json!({
            "multicast_id": 216,
            "success": 2,
            "failure": 5,
            "canonical_ids": 1,
            "results": [
                {"message_id": "m1"},
                {"message_id": "m2", "registration_id": "tok1-new"},
                {"error": "InvalidRegistration"},
                {"error": "DeviceMessageRateExceeded"},
                {"error": "MissingRegistration"},
                {"error": "MismatchSenderId"},
                {"error": "InternalServerError"}
            ]
        }));
        let tokens = submitted(&["t0", "t1", "t2", "t3", "", "t5", "t6"]);
        let outcome = parse_token_reply(&body, &tokens);
        let bulk = outcome.bulk().unwrap();

        assert_eq!(outcome.message_id(), Some("216"));
        assert_eq!(bulk.to_modify.get("t1").map(String::as_str), Some("tok1-new"));
        assert_eq!(bulk.to_delete, ["t2"]);
        assert_eq!(bulk.to_retry, ["t3", "t6"]);
        assert!(bulk.has_missing_token);
        assert_eq!(bulk.errors.get("t5").map(String::as_str), Some("MismatchSenderId"));
        assert_eq!(bucket_total(bulk), 7);
        assert!(!outcome.is_result_ok());
    }

    #[test]
    fn test_bucket_count_matches_results_length() {
        let results: Vec<Value> = (0..50)
            .map(|i| match i % 6 {
                0 => json!({"message_id": format!("m{i}")}),
                1 => json!({"message_id": "m", "registration_id": format!("new{i}")}),
                2 => json!({"error": "NotRegistered"}),
                3 => json!({"error": "Unavailable"}),
                4 => json!({"error": "MissingRegistration"}),
                _ => json!({"error": "InvalidTtl"}),
            })
            .collect();
        let tokens: Vec<String> = (0..50).map(|i| format!("tok{i}")).collect();
        let body = object(json!({"success": 17, "failure": 33, "canonical_ids": 8, "results": results}));

        let outcome = parse_token_reply(&body, &SubmittedTokens::from(tokens));
        let bulk = outcome.bulk().unwrap();
        let sent = bulk.outcomes.iter().filter(|o| **o == DeliveryOutcome::Sent).count();
        let missing = bulk.outcomes.iter().filter(|o| **o == DeliveryOutcome::MissingToken).count();

        assert_eq!(
            sent + bulk.to_modify.len() + bulk.to_delete.len() + bulk.to_retry.len() + missing + bulk.errors.len(),
            50
        );
    }

    #[test]
    fn test_priority_order_prefers_modify_over_error() {
        let verdict = classify_result(&json!({"message_id": "m", "registration_id": "new", "error": "NotRegistered"}));
        assert_eq!(verdict, DeliveryOutcome::Modify { canonical_token: "new".into() });

        let verdict = classify_result(&json!({"message_id": "m", "error": "Unavailable"}));
        assert_eq!(verdict, DeliveryOutcome::Sent);
    }

    #[test]
    fn test_malformed_result_elements_are_generic_errors() {
        assert_eq!(classify_result(&json!("x")), DeliveryOutcome::Error { code: "UNSPECIFIED_ERROR".into() });
        assert_eq!(classify_result(&json!({})), DeliveryOutcome::Error { code: "UNSPECIFIED_ERROR".into() });
    }

    #[test]
    fn test_no_failures_skips_iteration() {
        let body = object(json!({
            "multicast_id": "99",
            "success": 2,
            "failure": 0,
            "canonical_ids": 0,
            "results": [{"message_id": "1"}, {"message_id": "2"}]
        }));
        let outcome = parse_token_reply(&body, &submitted(&["a", "b"]));
        assert!(outcome.is_result_ok());
        assert_eq!(outcome.bulk().unwrap().outcomes, vec![DeliveryOutcome::Sent; 2]);
        assert!(outcome.tokens_to_delete().is_empty());
    }

    #[test]
    fn test_canonical_ids_alone_still_delivers() {
        let body = object(json!({
            "success": 1,
            "failure": 0,
            "canonical_ids": 1,
            "results": [{"message_id": "1", "registration_id": "fresh"}]
        }));
        let outcome = parse_token_reply(&body, &submitted(&["stale"]));
        assert!(outcome.is_result_ok());
        assert_eq!(outcome.tokens_to_modify().get("stale").map(String::as_str), Some("fresh"));
    }

    #[test]
    fn test_result_without_submitted_token_is_counted_not_recorded() {
        let body = object(json!({
            "success": 0,
            "failure": 2,
            "results": [{"error": "NotRegistered"}, {"error": "NotRegistered"}]
        }));
        let outcome = parse_token_reply(&body, &submitted(&["only"]));
        assert_eq!(outcome.tokens_to_delete(), ["only"]);
        assert_eq!(outcome.bulk().unwrap().outcomes.len(), 2);
    }

    #[test]
    fn test_failures_without_results_are_not_ok() {
        let outcome = parse_token_reply(&object(json!({"success": 0, "failure": 1})), &submitted(&["a"]));
        assert!(!outcome.is_result_ok());
    }

    #[test]
    fn test_non_array_results_is_not_ok() {
        let body = object(json!({"success": 0, "failure": 1, "results": "NotRegistered"}));
        let outcome = parse_token_reply(&body, &submitted(&["a"]));
        assert!(!outcome.is_result_ok());
        assert!(outcome.tokens_to_delete().is_empty());
        assert!(outcome.bulk().unwrap().outcomes.is_empty());
    }

    #[test]
    fn test_overflowing_counters_do_not_panic() {
        let body = object(json!({
            "success": u64::MAX,
            "failure": 1,
            "results": [{"error": "NotRegistered"}]
        }));
        let outcome = parse_token_reply(&body, &submitted(&["a"]));
        assert_eq!(outcome.tokens_to_delete(), ["a"]);
        assert_eq!(outcome.bulk().unwrap().success_count, u64::MAX);
        assert!(!outcome.is_result_ok());
    }

    #[test]
    fn test_duplicate_tokens_keep_one_outcome_per_result() {
        let body = object(json!({
            "success": 0,
            "failure": 2,
            "results": [{"error": "InvalidTtl"}, {"error": "MismatchSenderId"}]
        }));
        let outcome = parse_token_reply(&body, &submitted(&["a", "a"]));
        let bulk = outcome.bulk().unwrap();

        assert_eq!(
            bulk.outcomes,
            vec![
                DeliveryOutcome::Error { code: "InvalidTtl".into() },
                DeliveryOutcome::Error { code: "MismatchSenderId".into() }
            ]
        );
        assert_eq!(bulk.errors.len(), 1);
        assert_eq!(bulk.errors.get("a").map(String::as_str), Some("MismatchSenderId"));
    }

    #[test]
    fn test_topic_reply() {
        let ok = parse_topic_reply(&object(json!({"message_id": 5_843_290_480_329_123_i64})));
        assert!(ok.is_result_ok());
        assert_eq!(ok.message_id(), Some("5843290480329123"));

        let failed = parse_topic_reply(&object(json!({"error": "TopicsMessageRateExceeded"})));
        assert!(!failed.is_result_ok());
        assert_eq!(failed.error_description(), Some("FcmError[TopicsMessageRateExceeded]: "));
        assert!(matches!(
            failed.detail(),
            OutcomeDetail::LegacyTopic(TopicSendResult { error_message: Some(e) }) if e == "TopicsMessageRateExceeded"
        ));
    }

    #[test]
    fn test_group_reply_success() {
        let outcome = parse_group_reply(&object(json!({"success": 2, "failure": 0})));
        assert!(outcome.is_result_ok());
        let OutcomeDetail::LegacyGroup(group) = outcome.detail() else { panic!("wrong family") };
        assert!(group.failed_tokens.is_empty());
        assert_eq!(group.success_count, 2);
    }

    #[test]
    fn test_group_reply_partial_failure() {
        let outcome = parse_group_reply(&object(json!({
            "success": 1,
            "failure": 2,
            "failed_registration_ids": ["r1", "r2"]
        })));
        assert!(!outcome.is_result_ok());
        let OutcomeDetail::LegacyGroup(group) = outcome.detail() else { panic!("wrong family") };
        assert_eq!(group.failed_tokens, ["r1", "r2"]);
    }

    #[test]
    fn test_group_management_reply() {
        let outcome = parse_group_management_reply(&object(json!({"notification_key": "APA91bGHXQBB"})));
        assert!(outcome.is_result_ok());
        assert_eq!(outcome.notification_key(), Some("APA91bGHXQBB"));

        let outcome = parse_group_management_reply(&object(json!({"error": "notification_key not found"})));
        assert!(!outcome.is_result_ok());
        assert_eq!(outcome.notification_key(), None);
    }
}
