use crate::adapters::credentials::CredentialError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FcmError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
    #[error("Invalid {platform} option: {message}")]
    InvalidPlatformOption { platform: &'static str, message: String },
    #[error("Invalid option: {0}")]
    InvalidOption(String),
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("No target was set for this request")]
    MissingTarget,
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Credential error: {0}")]
    Credentials(#[source] CredentialError),
    #[error("Response from FCM is not valid (status {status})")]
    InvalidResponse { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, FcmError>;

impl From<CredentialError> for FcmError {
    fn from(err: CredentialError) -> Self {
        if err.is_configuration() {
            return Self::Configuration(err.to_string());
        }
        Self::Credentials(err)
    }
}

impl FcmError {
    /// Returns true for errors raised before any network call was attempted.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget(_)
                | Self::InvalidPlatformOption { .. }
                | Self::InvalidOption(_)
                | Self::UnsupportedOperation(_)
                | Self::MissingTarget
        )
    }
}
