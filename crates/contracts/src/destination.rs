//! Destination trait - replicator output interface
//!
//! Defines the abstract interface for storage backends.

use std::pin::Pin;

use tokio::io::AsyncRead;

use crate::ContractError;

/// Readable byte stream handed to a destination for one save.
///
/// Dropping the stream closes it.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Storage backend trait
///
/// All destination implementations must implement this trait.
#[trait_variant::make(Destination: Send)]
pub trait LocalDestination {
    /// Destination name (used for logging/metrics and failure tagging)
    fn name(&self) -> &str;

    /// Persist `stream` under `name`, returning the number of bytes stored.
    ///
    /// The stream must be read to its end or rejected with an error. It must
    /// not be kept after the call returns.
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn save(&self, name: &str, stream: ByteStream) -> Result<u64, ContractError>;
}
