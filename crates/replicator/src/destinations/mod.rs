//! Destination implementations
//!
//! Contains FileDestination and LogDestination.

mod file;
mod log;

pub use self::file::{FileDestination, FileDestinationConfig};
pub use self::log::LogDestination;
