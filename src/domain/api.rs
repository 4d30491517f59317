use crate::error::{FcmError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// FCM wire protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiVersion {
    Legacy,
    V1,
}

impl ApiVersion {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::V1 => "v1",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = FcmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "legacy_api" => Ok(Self::Legacy),
            "v1" | "api_v1" => Ok(Self::V1),
            other => Err(FcmError::Configuration(format!(
                "api version must be one of [legacy, v1], got \"{other}\""
            ))),
        }
    }
}

/// What a request is for. Drives builder, URL and parser selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    TokenSending,
    TopicSending,
    GroupSending,
    TopicManagement,
    GroupManagement,
}

impl Reason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TokenSending => "for_token_sending",
            Self::TopicSending => "for_topic_sending",
            Self::GroupSending => "for_group_sending",
            Self::TopicManagement => "for_topic_management",
            Self::GroupManagement => "for_group_management",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply shape a parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFamily {
    LegacyToken,
    LegacyTopic,
    LegacyGroup,
    LegacyGroupManagement,
    V1Token,
    TopicSubscription,
}

impl ResponseFamily {
    /// Families served by the legacy endpoints, which may carry a `Retry-After` header.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::LegacyToken | Self::LegacyTopic | Self::LegacyGroup | Self::LegacyGroupManagement)
    }
}

/// Every supported {api version x reason} pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    LegacyToken,
    LegacyTopic,
    LegacyGroup,
    LegacyGroupManagement,
    TopicSubscription(ApiVersion),
    V1Token,
}

impl Operation {
    /// Resolves the operation served for `version` and `reason`.
    ///
    /// # Errors
    /// Returns `FcmError::UnsupportedOperation` when the API version does not serve the reason.
    pub fn resolve(version: ApiVersion, reason: Reason) -> Result<Self> {
        match (version, reason) {
            (_, Reason::TopicManagement) => Ok(Self::TopicSubscription(version)),
            (ApiVersion::Legacy, Reason::TokenSending) => Ok(Self::LegacyToken),
            (ApiVersion::Legacy, Reason::TopicSending) => Ok(Self::LegacyTopic),
            (ApiVersion::Legacy, Reason::GroupSending) => Ok(Self::LegacyGroup),
            (ApiVersion::Legacy, Reason::GroupManagement) => Ok(Self::LegacyGroupManagement),
            (ApiVersion::V1, Reason::TokenSending) => Ok(Self::V1Token),
            (ApiVersion::V1, other) => Err(FcmError::UnsupportedOperation(format!(
                "reason \"{other}\" is not available for the v1 api, use \"{}\" or \"{}\"",
                Reason::TokenSending,
                Reason::TopicManagement
            ))),
        }
    }

    #[must_use]
    pub const fn api_version(self) -> ApiVersion {
        match self {
            Self::LegacyToken | Self::LegacyTopic | Self::LegacyGroup | Self::LegacyGroupManagement => {
                ApiVersion::Legacy
            }
            Self::TopicSubscription(version) => version,
            Self::V1Token => ApiVersion::V1,
        }
    }

    #[must_use]
    pub const fn reason(self) -> Reason {
        match self {
            Self::LegacyToken | Self::V1Token => Reason::TokenSending,
            Self::LegacyTopic => Reason::TopicSending,
            Self::LegacyGroup => Reason::GroupSending,
            Self::LegacyGroupManagement => Reason::GroupManagement,
            Self::TopicSubscription(_) => Reason::TopicManagement,
        }
    }

    /// Parser family selected for replies to this operation.
    #[must_use]
    pub const fn response_family(self) -> ResponseFamily {
        match self {
            Self::LegacyToken => ResponseFamily::LegacyToken,
            Self::LegacyTopic => ResponseFamily::LegacyTopic,
            Self::LegacyGroup => ResponseFamily::LegacyGroup,
            Self::LegacyGroupManagement => ResponseFamily::LegacyGroupManagement,
            Self::TopicSubscription(_) => ResponseFamily::TopicSubscription,
            Self::V1Token => ResponseFamily::V1Token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_legacy_reasons() {
        assert_eq!(Operation::resolve(ApiVersion::Legacy, Reason::TokenSending).unwrap(), Operation::LegacyToken);
        assert_eq!(Operation::resolve(ApiVersion::Legacy, Reason::TopicSending).unwrap(), Operation::LegacyTopic);
        assert_eq!(Operation::resolve(ApiVersion::Legacy, Reason::GroupSending).unwrap(), Operation::LegacyGroup);
        assert_eq!(
            Operation::resolve(ApiVersion::Legacy, Reason::GroupManagement).unwrap(),
            Operation::LegacyGroupManagement
        );
        assert_eq!(
            Operation::resolve(ApiVersion::Legacy, Reason::TopicManagement).unwrap(),
            Operation::TopicSubscription(ApiVersion::Legacy)
        );
    }

    #[test]
    fn test_resolve_v1_reasons() {
        assert_eq!(Operation::resolve(ApiVersion::V1, Reason::TokenSending).unwrap(), Operation::V1Token);
        assert_eq!(
            Operation::resolve(ApiVersion::V1, Reason::TopicManagement).unwrap(),
            Operation::TopicSubscription(ApiVersion::V1)
        );
        for reason in [Reason::TopicSending, Reason::GroupSending, Reason::GroupManagement] {
            let err = Operation::resolve(ApiVersion::V1, reason).unwrap_err();
            assert!(matches!(err, FcmError::UnsupportedOperation(_)), "{reason} should be rejected");
        }
    }

    #[test]
    fn test_operation_round_trips_version_and_reason() {
        for version in [ApiVersion::Legacy, ApiVersion::V1] {
            for reason in [
                Reason::TokenSending,
                Reason::TopicSending,
                Reason::GroupSending,
                Reason::TopicManagement,
                Reason::GroupManagement,
            ] {
                if let Ok(op) = Operation::resolve(version, reason) {
                    assert_eq!(op.api_version(), version);
                    assert_eq!(op.reason(), reason);
                }
            }
        }
    }

    #[test]
    fn test_api_version_from_str() {
        assert_eq!("legacy".parse::<ApiVersion>().unwrap(), ApiVersion::Legacy);
        assert_eq!("API_V1".parse::<ApiVersion>().unwrap(), ApiVersion::V1);
        assert!("v2".parse::<ApiVersion>().is_err());
    }
}
