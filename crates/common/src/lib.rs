//! Common types and errors shared across `statedb-enc` crates.

pub mod error;
pub mod protocol;

pub use error::StateDbError;
pub use protocol::{Height, VersionAndMetadata};
