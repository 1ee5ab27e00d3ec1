//! Common types, protocol definitions, and errors shared across `snappass` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
pub use protocol::TimeToLive;
