//! # Contracts
//!
//! Frozen interface contracts shared by every upload-relay crate.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Stream model
//! - An upload is a single named byte stream
//! - A destination consumes one `ByteStream` per save and never retains it

mod blueprint;
mod destination;
mod error;
mod events;

pub use blueprint::*;
pub use destination::*;
pub use error::*;
pub use events::*;
