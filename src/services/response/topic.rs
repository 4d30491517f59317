use super::value_to_string;
use crate::domain::outcome::{OutcomeDetail, TokenError, TopicSubscriptionResult};
use crate::domain::{ResponseFamily, SendOutcome, SubmittedTokens};
use serde_json::{Map, Value};

/// Reply of `iid/v1:batchAdd` / `:batchRemove`. Successful entries are empty objects.
#[must_use]
pub fn parse_subscription_reply(body: &Map<String, Value>, submitted: &SubmittedTokens) -> SendOutcome {
    let mut outcome = SendOutcome::new(ResponseFamily::TopicSubscription);
    let mut subscription = TopicSubscriptionResult::default();

    if let Some(results) = body.get("results").and_then(Value::as_array) {
        for (index, result) in results.iter().enumerate() {
            if let Some(error) = result.get("error")
                && let Some(token) = submitted.get(index)
            {
                subscription
                    .tokens_with_error
                    .push(TokenError { token: token.to_string(), error: value_to_string(error) });
            }
        }
    }

    outcome.result_ok = subscription.tokens_with_error.is_empty();
    outcome.detail = OutcomeDetail::TopicSubscription(subscription);
    outcome
}
