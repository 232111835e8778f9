//! LogDestination - drains uploads and logs a summary via tracing

use std::time::Instant;

use contracts::{ByteStream, ContractError, Destination};
use tracing::{info, instrument};

/// Destination that reads the whole upload and only logs it
#[derive(Debug)]
pub struct LogDestination {
    name: String,
}

impl LogDestination {
    /// Create a new LogDestination with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Destination for LogDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_destination_save",
        skip(self, stream),
        fields(destination = %self.name)
    )]
    async fn save(&self, name: &str, mut stream: ByteStream) -> Result<u64, ContractError> {
        let started = Instant::now();
        let bytes = tokio::io::copy(&mut stream, &mut tokio::io::sink())
            .await
            .map_err(|e| ContractError::destination_write(&self.name, e.to_string()))?;

        info!(
            destination = %self.name,
            upload = %name,
            bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upload received"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_destination_counts_bytes() {
        let destination = LogDestination::new("audit");
        let stream: ByteStream = Box::pin(&b"HELLO"[..]);

        let bytes = destination.save("book.epub", stream).await.unwrap();
        assert_eq!(bytes, 5);
    }

    #[tokio::test]
    async fn test_log_destination_name() {
        let destination = LogDestination::new("my_logger");
        assert_eq!(destination.name(), "my_logger");
    }
}
