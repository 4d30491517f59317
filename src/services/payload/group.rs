use super::{Payload, insert_non_empty};
use crate::domain::{DeviceGroupOperation, SubmittedTokens};
use crate::error::{FcmError, Result};
use serde_json::{Map, Value};

/// Body builder for `POST /fcm/notification`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupManagementBuilder {
    operation: Option<DeviceGroupOperation>,
}

impl GroupManagementBuilder {
    pub fn set_operation(&mut self, operation: DeviceGroupOperation) {
        self.operation = Some(operation);
    }

    #[must_use]
    pub const fn operation(&self) -> Option<&DeviceGroupOperation> {
        self.operation.as_ref()
    }

    /// # Errors
    /// Returns `FcmError::MissingTarget` if no group operation was set.
    pub fn build(&self) -> Result<Payload> {
        let operation = self.operation.as_ref().ok_or(FcmError::MissingTarget)?;
        let mut body = Map::new();
        insert_non_empty(&mut body, "operation", operation.operation.map(|kind| kind.as_str()));
        insert_non_empty(&mut body, "notification_key_name", operation.notification_key_name.clone());
        insert_non_empty(&mut body, "notification_key", operation.notification_key.clone());
        insert_non_empty(&mut body, "registration_ids", operation.tokens.clone());

        Ok(Payload { body: Value::Object(body), submitted: SubmittedTokens::from(operation.tokens.clone()) })
    }
}
