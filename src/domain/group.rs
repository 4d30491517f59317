use crate::domain::target::validate_tokens;
use crate::error::{FcmError, Result};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOperationKind {
    Create,
    Add,
    Remove,
}

impl GroupOperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl FromStr for GroupOperationKind {
    type Err = FcmError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(Self::Create),
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            other => Err(FcmError::InvalidOption(format!(
                "group operation \"{other}\" is not valid, expected one of [create, add, remove]"
            ))),
        }
    }
}

/// A device group lifecycle action, or a bare lookup when `operation` is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceGroupOperation {
    pub operation: Option<GroupOperationKind>,
    pub notification_key_name: Option<String>,
    pub notification_key: Option<String>,
    pub tokens: Vec<String>,
}

impl DeviceGroupOperation {
    /// # Errors
    /// Returns `FcmError::InvalidTarget` if `tokens` is empty or has more than 1000 entries.
    pub fn create(group_name: impl Into<String>, tokens: Vec<String>) -> Result<Self> {
        validate_tokens(&tokens)?;
        Ok(Self {
            operation: Some(GroupOperationKind::Create),
            notification_key_name: Some(group_name.into()),
            notification_key: None,
            tokens,
        })
    }

    /// # Errors
    /// Returns `FcmError::InvalidTarget` if `tokens` is empty or has more than 1000 entries.
    pub fn add(
        group_name: impl Into<String>,
        notification_key: impl Into<String>,
        tokens: Vec<String>,
    ) -> Result<Self> {
        Self::membership(GroupOperationKind::Add, group_name.into(), notification_key.into(), tokens)
    }

    /// # Errors
    /// Returns `FcmError::InvalidTarget` if `tokens` is empty or has more than 1000 entries.
    pub fn remove(
        group_name: impl Into<String>,
        notification_key: impl Into<String>,
        tokens: Vec<String>,
    ) -> Result<Self> {
        Self::membership(GroupOperationKind::Remove, group_name.into(), notification_key.into(), tokens)
    }

    /// Lookup of the notification key registered under `group_name`.
    pub fn lookup(group_name: impl Into<String>) -> Self {
        Self { notification_key_name: Some(group_name.into()), ..Self::default() }
    }

    fn membership(
        operation: GroupOperationKind,
        group_name: String,
        notification_key: String,
        tokens: Vec<String>,
    ) -> Result<Self> {
        if notification_key.is_empty() {
            return Err(FcmError::InvalidOption(format!(
                "a notification key is required to {} group members",
                operation.as_str()
            )));
        }
        validate_tokens(&tokens)?;
        Ok(Self {
            operation: Some(operation),
            notification_key_name: Some(group_name).filter(|name| !name.is_empty()),
            notification_key: Some(notification_key),
            tokens,
        })
    }
}
