pub mod credentials;
pub mod transport;
