pub mod payload;
pub mod request;
pub mod response;

pub use payload::{Payload, PayloadBuilder};
pub use request::{ConnectionParams, Endpoints, FcmClient, Request};
