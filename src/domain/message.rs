use crate::error::{FcmError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Longest time-to-live FCM accepts, in seconds (four weeks).
pub const MAX_TIME_TO_LIVE_SECS: u32 = 2_419_200;

pub const LEGACY_ANDROID_OPTIONS: &[&str] = &[
    "title",
    "body",
    "android_channel_id",
    "icon",
    "sound",
    "tag",
    "color",
    "click_action",
    "body_loc_key",
    "body_loc_args",
    "title_loc_key",
    "title_loc_args",
];

pub const LEGACY_APNS_OPTIONS: &[&str] = &[
    "title",
    "body",
    "sound",
    "badge",
    "click_action",
    "subtitle",
    "body_loc_key",
    "body_loc_args",
    "title_loc_key",
    "title_loc_args",
];

pub const LEGACY_WEB_PUSH_OPTIONS: &[&str] = &["title", "body", "icon", "click_action"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    Apns,
    WebPush,
}

impl Platform {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Apns => "apns",
            Self::WebPush => "web_push",
        }
    }

    /// Notification keys the legacy API documents for this platform.
    #[must_use]
    pub const fn legacy_whitelist(self) -> &'static [&'static str] {
        match self {
            Self::Android => LEGACY_ANDROID_OPTIONS,
            Self::Apns => LEGACY_APNS_OPTIONS,
            Self::WebPush => LEGACY_WEB_PUSH_OPTIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = FcmError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(FcmError::InvalidOption(format!(
                "priority \"{other}\" is not valid, expected one of [high, normal]"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into() }
    }

    pub(crate) fn to_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("title".into(), Value::String(self.title.clone()));
        map.insert("body".into(), Value::String(self.body.clone()));
        map
    }
}

/// Notification and data payload plus per-platform overrides for one outgoing message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageOptions {
    pub notification: Option<Notification>,
    pub data: BTreeMap<String, String>,
    pub android: Map<String, Value>,
    pub apns: Map<String, Value>,
    pub webpush: Map<String, Value>,
    pub priority: Option<Priority>,
    pub collapse_key: Option<String>,
    pub time_to_live: Option<u32>,
    pub restricted_package_name: Option<String>,
    pub content_available: bool,
    pub mutable_content: bool,
    pub dry_run: bool,
}

impl MessageOptions {
    /// # Errors
    /// Returns `FcmError::InvalidOption` if `data` is not an object of string values.
    pub fn set_data(&mut self, data: &Value) -> Result<()> {
        self.data = validate_data(data)?;
        Ok(())
    }

    /// # Errors
    /// Returns `FcmError::InvalidOption` if `secs` exceeds [`MAX_TIME_TO_LIVE_SECS`].
    pub fn set_time_to_live(&mut self, secs: u32) -> Result<()> {
        if secs > MAX_TIME_TO_LIVE_SECS {
            return Err(FcmError::InvalidOption(format!(
                "time to live must be between 0 and {MAX_TIME_TO_LIVE_SECS}, current value is: {secs}"
            )));
        }
        self.time_to_live = Some(secs);
        Ok(())
    }

    /// Stores a legacy platform override after checking it against the platform whitelist.
    ///
    /// # Errors
    /// Returns `FcmError::InvalidPlatformOption` for unknown keys or non-string values.
    pub fn set_legacy_platform(&mut self, platform: Platform, config: &Value) -> Result<()> {
        let config = validate_legacy_platform_config(platform, config)?;
        *self.platform_mut(platform) = config;
        Ok(())
    }

    /// Stores a v1 platform override verbatim.
    ///
    /// # Errors
    /// Returns `FcmError::InvalidPlatformOption` if `config` is not a JSON object.
    pub fn set_v1_platform(&mut self, platform: Platform, config: &Value) -> Result<()> {
        let Value::Object(map) = config else {
            return Err(FcmError::InvalidPlatformOption {
                platform: platform.as_str(),
                message: "config must be a JSON object".into(),
            });
        };
        *self.platform_mut(platform) = map.clone();
        Ok(())
    }

    #[must_use]
    pub const fn platform(&self, platform: Platform) -> &Map<String, Value> {
        match platform {
            Platform::Android => &self.android,
            Platform::Apns => &self.apns,
            Platform::WebPush => &self.webpush,
        }
    }

    const fn platform_mut(&mut self, platform: Platform) -> &mut Map<String, Value> {
        match platform {
            Platform::Android => &mut self.android,
            Platform::Apns => &mut self.apns,
            Platform::WebPush => &mut self.webpush,
        }
    }
}

/// # Errors
/// Returns `FcmError::InvalidOption` unless `data` is an object whose values are all strings.
pub fn validate_data(data: &Value) -> Result<BTreeMap<String, String>> {
    let Value::Object(map) = data else {
        return Err(FcmError::InvalidOption("message data must be a JSON object".into()));
    };
    map.iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key.clone(), s.clone())),
            _ => Err(FcmError::InvalidOption(format!(
                "the keys and values in message data must be all strings, \"{key}\" is not"
            ))),
        })
        .collect()
}

/// # Errors
/// Returns `FcmError::InvalidPlatformOption` for non-object input, non-string values
/// or keys absent from the platform whitelist.
pub fn validate_legacy_platform_config(platform: Platform, config: &Value) -> Result<Map<String, Value>> {
    let invalid = |message: String| FcmError::InvalidPlatformOption { platform: platform.as_str(), message };
    let Value::Object(map) = config else {
        return Err(invalid("notification options must be a JSON object".into()));
    };
    let whitelist = platform.legacy_whitelist();
    for (key, value) in map {
        if !value.is_string() {
            return Err(invalid(format!("value for \"{key}\" must be a string")));
        }
        if !whitelist.contains(&key.as_str()) {
            return Err(invalid(format!("key \"{key}\" is not a documented notification option")));
        }
    }
    Ok(map.clone())
}
