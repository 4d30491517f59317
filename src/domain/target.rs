use crate::domain::api::ApiVersion;
use crate::domain::outcome::SubmittedTokens;
use crate::error::{FcmError, Result};
use serde::Serialize;
use std::fmt;

/// Upper bound on registration tokens in a single request.
pub const MAX_TOKENS_PER_REQUEST: usize = 1000;

/// Path segment topics are addressed under on the wire.
pub const TOPICS_PATH: &str = "/topics/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Token,
    Tokens,
    Topic,
    Condition,
    Group,
}

impl TargetKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Tokens => "tokens",
            Self::Topic => "topic",
            Self::Condition => "condition",
            Self::Group => "group",
        }
    }

    #[must_use]
    pub const fn is_supported_by(self, version: ApiVersion) -> bool {
        match version {
            ApiVersion::Legacy => true,
            ApiVersion::V1 => matches!(self, Self::Token | Self::Topic | Self::Condition),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addressing of a send operation. Values are validated on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Token(String),
    Tokens(Vec<String>),
    /// Topic name without the `/topics/` prefix.
    Topic(String),
    Condition(String),
    /// Device group notification key.
    Group(String),
}

impl Target {
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }

    /// Builds a multicast target, keeping the caller's order.
    ///
    /// # Errors
    /// Returns `FcmError::InvalidTarget` if the list is empty or longer than 1000 tokens.
    pub fn tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        validate_tokens(&tokens)?;
        Ok(Self::Tokens(tokens))
    }

    /// # Errors
    /// Returns `FcmError::InvalidTarget` if the name is not a valid topic.
    pub fn topic(topic: &str) -> Result<Self> {
        normalize_topic(topic).map(Self::Topic)
    }

    /// # Errors
    /// Returns `FcmError::InvalidTarget` if the expression has unbalanced quotes.
    pub fn condition(condition: impl Into<String>) -> Result<Self> {
        let condition = condition.into();
        validate_condition(&condition)?;
        Ok(Self::Condition(condition))
    }

    pub fn group(notification_key: impl Into<String>) -> Self {
        Self::Group(notification_key.into())
    }

    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        match self {
            Self::Token(_) => TargetKind::Token,
            Self::Tokens(_) => TargetKind::Tokens,
            Self::Topic(_) => TargetKind::Topic,
            Self::Condition(_) => TargetKind::Condition,
            Self::Group(_) => TargetKind::Group,
        }
    }

    /// Tokens a reply to this target is correlated against, in submission order.
    #[must_use]
    pub fn submitted_tokens(&self) -> SubmittedTokens {
        match self {
            Self::Token(token) => SubmittedTokens::from(vec![token.clone()]),
            Self::Tokens(tokens) => SubmittedTokens::from(tokens.clone()),
            Self::Topic(_) | Self::Condition(_) | Self::Group(_) => SubmittedTokens::default(),
        }
    }

    /// # Errors
    /// Returns `FcmError::InvalidTarget` if `version` cannot address this kind of target.
    pub fn ensure_supported_by(&self, version: ApiVersion) -> Result<()> {
        let kind = self.kind();
        if kind.is_supported_by(version) {
            return Ok(());
        }
        Err(FcmError::InvalidTarget(format!(
            "target type \"{kind}\" is not supported by the {version} api"
        )))
    }
}

/// # Errors
/// Returns `FcmError::InvalidTarget` if the list is empty or exceeds [`MAX_TOKENS_PER_REQUEST`].
pub fn validate_tokens(tokens: &[String]) -> Result<()> {
    if tokens.is_empty() {
        return Err(FcmError::InvalidTarget("an empty list of tokens given".into()));
    }
    if tokens.len() > MAX_TOKENS_PER_REQUEST {
        return Err(FcmError::InvalidTarget(format!(
            "only {MAX_TOKENS_PER_REQUEST} devices can be addressed in a single request, got {}",
            tokens.len()
        )));
    }
    Ok(())
}

/// Strips a leading `/topics/` and surrounding slashes, then checks `[a-zA-Z0-9-_.~%]+`.
///
/// # Errors
/// Returns `FcmError::InvalidTarget` if the remaining name is empty or has other characters.
pub fn normalize_topic(topic: &str) -> Result<String> {
    let name = topic.strip_prefix(TOPICS_PATH).unwrap_or(topic).trim_matches('/');
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%'));
    if !valid {
        return Err(FcmError::InvalidTarget(format!("malformed topic name \"{name}\"")));
    }
    Ok(name.to_string())
}

/// Double quotes count as single quotes; the total must be even.
///
/// # Errors
/// Returns `FcmError::InvalidTarget` if the condition contains an uneven amount of quotes.
pub fn validate_condition(condition: &str) -> Result<()> {
    let quotes = condition.chars().filter(|c| matches!(c, '\'' | '"')).count();
    if quotes % 2 != 0 {
        return Err(FcmError::InvalidTarget(format!(
            "the condition \"{condition}\" contains an uneven amount of quotes"
        )));
    }
    Ok(())
}
