#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

//! Request shaping and reply classification for Firebase Cloud Messaging.
//!
//! An [`FcmClient`] hands out one [`Request`] per operation. The request validates its
//! target and options eagerly, renders the body for the active API version, and turns the
//! provider's reply into a [`SendOutcome`] whose buckets tell the caller which tokens to
//! delete, remap or retry.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;

pub use domain::{ApiVersion, Reason, SendOutcome, Target};
pub use error::{FcmError, Result};
pub use services::{ConnectionParams, Endpoints, FcmClient, Request};
