use serde::Serialize;
use std::fmt;

/// Canonical provider error codes plus the status-keyed entries used when a
/// reply cannot be parsed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    UnspecifiedError,
    InvalidArgument,
    Unregistered,
    NotFound,
    SenderIdMismatch,
    QuotaExceeded,
    ApnsAuthError,
    Unavailable,
    Internal,
    StatusCode400,
    StatusCode403,
    OtherStatusCodes,
}

impl ErrorCode {
    pub const ALL: [Self; 12] = [
        Self::UnspecifiedError,
        Self::InvalidArgument,
        Self::Unregistered,
        Self::NotFound,
        Self::SenderIdMismatch,
        Self::QuotaExceeded,
        Self::ApnsAuthError,
        Self::Unavailable,
        Self::Internal,
        Self::StatusCode400,
        Self::StatusCode403,
        Self::OtherStatusCodes,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnspecifiedError => "UNSPECIFIED_ERROR",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::Unregistered => "UNREGISTERED",
            Self::NotFound => "NOT_FOUND",
            Self::SenderIdMismatch => "SENDER_ID_MISMATCH",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::ApnsAuthError => "APNS_AUTH_ERROR",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal => "INTERNAL",
            Self::StatusCode400 => "status_code_400",
            Self::StatusCode403 => "status_code_403",
            Self::OtherStatusCodes => "other_status_codes",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnspecifiedError => "No more information is available about this error.",
            Self::InvalidArgument => concat!(
                "Request parameters were invalid. ",
                "An extension of type google.rpc.BadRequest is returned to specify which field was invalid."
            ),
            Self::Unregistered | Self::NotFound => concat!(
                "App instance was unregistered from FCM. ",
                "This usually means that the token used is no longer valid and a new one must be used."
            ),
            Self::SenderIdMismatch => {
                "The authenticated sender ID is different from the sender ID for the registration token."
            }
            Self::QuotaExceeded => concat!(
                "Sending limit exceeded for the message target. ",
                "An extension of type google.rpc.QuotaFailure is returned to specify which quota got exceeded."
            ),
            Self::ApnsAuthError => "APNs certificate or auth key was invalid or missing.",
            Self::Unavailable => "The server is overloaded.",
            Self::Internal => "An unknown internal error occurred.",
            Self::StatusCode400 => concat!(
                "Something in the request data was wrong: ",
                "check if all data{...}values are converted to strings and look through logs"
            ),
            Self::StatusCode403 => concat!(
                "To use the new FCM HTTP v1 API, you need to enable FCM API on your Google API dashboard first - ",
                "https://console.developers.google.com/apis/library/fcm.googleapis.com/."
            ),
            Self::OtherStatusCodes => "Something happened with request to FCM. Check logs for more information.",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description for a raw code; empty for codes outside the table.
#[must_use]
pub fn describe(code: &str) -> &'static str {
    ErrorCode::from_code(code).map_or("", ErrorCode::description)
}

/// Renders `FcmError[<code>]: <description>` with optional additional info.
#[must_use]
pub fn error_message(code: &str, additional_info: &str) -> String {
    let mut message = format!("FcmError[{code}]: {}", describe(code));
    if !additional_info.is_empty() {
        message.push_str(". Additional info: ");
        message.push_str(additional_info);
    }
    message
}

/// Log categories attached to error events as the `category` field.
pub mod category {
    pub const INVALID_FCM_RESPONSE: &str = "invalid_fcm_response";
    pub const PARSE_ERROR: &str = "parse_error";
    pub const HTTP_CLIENT: &str = "http_client";
    pub const HTTP_CLIENT_ERROR: &str = "http_client_error";
    pub const HTTP_CLIENT_OTHER_ERRORS: &str = "http_client_other_errors";
}
