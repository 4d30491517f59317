mod common;

use common::{SENDER_ID, SERVER_KEY, TestFcm};
use fcm_dispatch::domain::outcome::OutcomeDetail;
use fcm_dispatch::domain::{DeliveryOutcome, Priority};
use fcm_dispatch::{Reason, Target};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_single_token_send() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(header("authorization", format!("key={SERVER_KEY}").as_str()))
        .and(header("project_id", SENDER_ID))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "to": "tokA",
            "notification": {"title": "Hi", "body": "There"},
            "data": {"k": "v"},
            "priority": "high",
            "time_to_live": 60
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "multicast_id": 108,
            "success": 1,
            "failure": 0,
            "canonical_ids": 0,
            "results": [{"message_id": "0:1"}]
        })))
        .expect(1)
        .mount(&fcm.server)
        .await;

    let outcome = fcm
        .legacy_client()
        .request(Reason::TokenSending)
        .await
        .unwrap()
        .target(Target::token("tokA"))
        .unwrap()
        .notification("Hi", "There")
        .unwrap()
        .data(&json!({"k": "v"}))
        .unwrap()
        .priority(Priority::High)
        .unwrap()
        .time_to_live(60)
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(outcome.is_result_ok());
    assert_eq!(outcome.message_id(), Some("108"));
    assert_eq!(outcome.bulk().unwrap().outcomes, vec![DeliveryOutcome::Sent]);
}

#[tokio::test]
async fn test_bulk_send_classifies_each_token() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(body_json(json!({"registration_ids": ["tokA", "tokB"], "data": {"k": "v"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": 1,
            "failure": 1,
            "results": [{"message_id": "1"}, {"error": "NotRegistered"}]
        })))
        .mount(&fcm.server)
        .await;

    let outcome = fcm
        .legacy_client()
        .request(Reason::TokenSending)
        .await
        .unwrap()
        .target(Target::tokens(["tokA", "tokB"]).unwrap())
        .unwrap()
        .data(&json!({"k": "v"}))
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(!outcome.is_result_ok());
    assert_eq!(outcome.tokens_to_delete(), ["tokB"]);
    assert_eq!(outcome.bulk().unwrap().success_count, 1);
    assert_eq!(outcome.error_description().unwrap(), "FcmError[NotRegistered]: ");
}

#[tokio::test]
async fn test_bulk_send_mixed_buckets() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "multicast_id": 5,
            "success": 2,
            "failure": 2,
            "canonical_ids": 1,
            "results": [
                {"message_id": "1"},
                {"message_id": "2", "registration_id": "tokB-new"},
                {"error": "Unavailable"},
                {"error": "MissingRegistration"}
            ]
        })))
        .mount(&fcm.server)
        .await;

    let outcome = fcm
        .legacy_client()
        .request(Reason::TokenSending)
        .await
        .unwrap()
        .target(Target::tokens(["a", "b", "c", "d"]).unwrap())
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(!outcome.is_result_ok());
    assert_eq!(outcome.tokens_to_modify().get("b").map(String::as_str), Some("tokB-new"));
    assert_eq!(outcome.tokens_to_retry(), ["c"]);
    assert!(outcome.has_missing_token());
    assert_eq!(outcome.bulk().unwrap().outcomes.len(), 4);
}

#[tokio::test]
async fn test_topic_send() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(body_json(json!({"to": "/topics/news", "collapse_key": "digest"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message_id": 7_001})))
        .mount(&fcm.server)
        .await;

    let outcome = fcm
        .legacy_client()
        .request(Reason::TopicSending)
        .await
        .unwrap()
        .target(Target::topic("/topics/news").unwrap())
        .unwrap()
        .collapse_key("digest")
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(outcome.is_result_ok());
    assert_eq!(outcome.message_id(), Some("7001"));
}

#[tokio::test]
async fn test_condition_send_error() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(body_json(json!({"condition": "'a' in topics"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "TopicsMessageRateExceeded"})))
        .mount(&fcm.server)
        .await;

    let outcome = fcm
        .legacy_client()
        .request(Reason::TopicSending)
        .await
        .unwrap()
        .target(Target::condition("'a' in topics").unwrap())
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(!outcome.is_result_ok());
    let OutcomeDetail::LegacyTopic(topic) = outcome.detail() else { panic!("wrong family") };
    assert_eq!(topic.error_message.as_deref(), Some("TopicsMessageRateExceeded"));
}

#[tokio::test]
async fn test_group_send_partial_failure() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(body_json(json!({"to": "nk-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": 1,
            "failure": 2,
            "failed_registration_ids": ["x", "y"]
        })))
        .mount(&fcm.server)
        .await;

    let outcome = fcm
        .legacy_client()
        .request(Reason::GroupSending)
        .await
        .unwrap()
        .target(Target::group("nk-1"))
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(!outcome.is_result_ok());
    let OutcomeDetail::LegacyGroup(group) = outcome.detail() else { panic!("wrong family") };
    assert_eq!(group.failed_tokens, vec!["x".to_string(), "y".to_string()]);
}

#[tokio::test]
async fn test_bad_request_status() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Field \"data\" must be a JSON array"))
        .mount(&fcm.server)
        .await;

    let outcome = fcm
        .legacy_client()
        .request(Reason::TokenSending)
        .await
        .unwrap()
        .target(Target::token("tokA"))
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(!outcome.is_result_ok());
    let description = outcome.error_description().unwrap();
    assert!(description.starts_with("FcmError[status_code_400]: Something in the request data was wrong"));
    assert!(description.ends_with(". Additional info: Field \"data\" must be a JSON array"));
    assert!(outcome.retry_after().is_none());
}

#[tokio::test]
async fn test_unauthorized_status() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&fcm.server)
        .await;

    let outcome = fcm
        .legacy_client()
        .request(Reason::TokenSending)
        .await
        .unwrap()
        .target(Target::token("tokA"))
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(outcome.error_description().unwrap().starts_with("FcmError[status_code_403]"));
}

#[tokio::test]
async fn test_unavailable_exposes_retry_after() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "120"))
        .mount(&fcm.server)
        .await;

    let outcome = fcm
        .legacy_client()
        .request(Reason::TokenSending)
        .await
        .unwrap()
        .target(Target::tokens(["a", "b"]).unwrap())
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(!outcome.is_result_ok());
    assert_eq!(outcome.retry_after(), Some("120"));
    assert!(outcome.error_description().unwrap().starts_with("FcmError[other_status_codes]"));
}

#[tokio::test]
async fn test_non_json_success_body_is_an_error() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&fcm.server)
        .await;

    let result = fcm
        .legacy_client()
        .request(Reason::TokenSending)
        .await
        .unwrap()
        .target(Target::token("tokA"))
        .unwrap()
        .send()
        .await;

    assert!(matches!(result, Err(fcm_dispatch::FcmError::InvalidResponse { status: 200, .. })));
}

#[tokio::test]
async fn test_unreachable_server_yields_failed_outcome() {
    let fcm = TestFcm::spawn().await;
    let client = fcm.legacy_client().with_endpoints(fcm_dispatch::Endpoints::with_base("http://127.0.0.1:9"));

    let outcome = client
        .request(Reason::TokenSending)
        .await
        .unwrap()
        .target(Target::token("tokA"))
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(!outcome.is_result_ok());
    assert!(outcome.error_description().is_none());
    assert!(outcome.tokens_to_delete().is_empty());
}

#[tokio::test]
async fn test_invalid_input_never_reaches_network() {
    let fcm = TestFcm::spawn().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&fcm.server).await;

    let request = fcm.legacy_client().request(Reason::TokenSending).await.unwrap();
    assert!(request.data(&json!({"n": 1})).is_err());

    let request = fcm.legacy_client().request(Reason::TokenSending).await.unwrap();
    assert!(request.android_config(&json!({"not_allowed": "x"})).is_err());

    let request = fcm.legacy_client().request(Reason::TokenSending).await.unwrap();
    assert!(request.send().await.is_err());
}
