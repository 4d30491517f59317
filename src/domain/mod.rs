pub mod api;
pub mod error_code;
pub mod group;
pub mod message;
pub mod outcome;
pub mod target;

pub use api::{ApiVersion, Operation, Reason, ResponseFamily};
pub use error_code::ErrorCode;
pub use group::{DeviceGroupOperation, GroupOperationKind};
pub use message::{MessageOptions, Notification, Platform, Priority};
pub use outcome::{DeliveryOutcome, OutcomeDetail, SendOutcome, SubmittedTokens};
pub use target::{Target, TargetKind};
